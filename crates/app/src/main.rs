use eframe::egui;
use session::presenter::{present, ToolSummary};
use session::{AuthState, ListenState};
use shared::notify::{Notice, Severity, NOTICE_TTL};
use shared::settings::ClientSettings;
use shared::transcript::Turn;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod state;
mod types;

use state::AppState;
use types::AppScreen;

const INPUT_ID: &str = "message_input";

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (settings, settings_path) = match ClientSettings::config_path() {
        Ok(path) => (ClientSettings::load_or_default(&path), Some(path)),
        Err(e) => {
            tracing::warn!("{e}; settings will not be saved");
            let mut settings = ClientSettings::default();
            settings.apply_env_override(std::env::var(shared::settings::BASE_URL_ENV).ok());
            (settings, None)
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 760.0])
            .with_min_inner_size([480.0, 480.0]),
        vsync: true,
        ..Default::default()
    };
    eframe::run_native(
        "AgentSync",
        options,
        Box::new(move |cc| {
            match AppState::new(settings, settings_path, cc.egui_ctx.clone()) {
                Ok(state) => Box::new(AgentSyncApp { state }) as Box<dyn eframe::App>,
                Err(e) => {
                    tracing::error!("startup failed: {:#}", e);
                    Box::new(StartupError {
                        message: format!("{:#}", e),
                    }) as Box<dyn eframe::App>
                }
            }
        }),
    )
}

struct AgentSyncApp {
    state: AppState,
}

impl eframe::App for AgentSyncApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let s = &mut self.state;
        s.poll();

        let dark = s.settings.dark_mode;
        ctx.set_visuals(if dark {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        });

        match s.screen() {
            AppScreen::Login => render_login_screen(s, ctx),
            AppScreen::Loading => render_loading_screen(ctx),
            AppScreen::Chat => render_chat_screen(s, ctx, dark),
        }

        render_notices(ctx, &s.notices.active(NOTICE_TTL));
        if !s.notices.is_empty() {
            // wake up again to expire toasts
            ctx.request_repaint_after(Duration::from_millis(500));
        }
    }
}

/// Shown instead of the chat when the app cannot start (bad base URL etc.)
struct StartupError {
    message: String,
}

impl eframe::App for StartupError {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(80.0);
                ui.heading("AgentSync could not start");
                ui.add_space(12.0);
                ui.label(egui::RichText::new(&self.message).monospace());
            });
        });
    }
}

fn accent() -> egui::Color32 {
    egui::Color32::from_rgb(130, 100, 220)
}

fn render_login_screen(s: &mut AppState, ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(120.0);
            ui.heading(egui::RichText::new("AgentSync").size(32.0).color(accent()));
            ui.label("Your smart sync-up assistant");
            ui.add_space(24.0);

            let signing_in = s.auth.state() == AuthState::SigningIn;
            let button = egui::Button::new(if signing_in {
                "Connecting..."
            } else {
                "Sign in with Google"
            })
            .min_size(egui::vec2(220.0, 40.0));
            if ui.add_enabled(!signing_in, button).clicked() {
                s.sign_in();
            }
            if signing_in {
                ui.add_space(8.0);
                ui.spinner();
            }
        });
    });
}

fn render_loading_screen(ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(200.0);
            ui.spinner();
            ui.add_space(8.0);
            ui.label(egui::RichText::new("Loading conversation...").weak());
        });
    });
}

fn render_chat_screen(s: &mut AppState, ctx: &egui::Context, dark: bool) {
    egui::TopBottomPanel::top("chat_header").show(ctx, |ui| {
        ui.add_space(6.0);
        ui.horizontal(|ui| {
            ui.heading(egui::RichText::new("AgentSync").color(accent()));
            ui.label(egui::RichText::new("Your smart sync-up assistant").weak());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Sign out").clicked() {
                    s.sign_out();
                }
                let resetting = s
                    .chat
                    .as_ref()
                    .is_some_and(|c| c.controller.is_resetting());
                if ui
                    .add_enabled(!resetting, egui::Button::new("⟳ Restart"))
                    .on_hover_text("Start a new conversation")
                    .clicked()
                {
                    s.reset_chat();
                }
                let mut dark_mode = s.settings.dark_mode;
                if ui.checkbox(&mut dark_mode, "Dark").changed() {
                    s.set_dark_mode(dark_mode);
                }
            });
        });
        ui.add_space(6.0);
    });

    // the header may have signed us out
    if s.chat.is_none() {
        return;
    }

    let mut send_requested = false;
    let mut voice_requested = false;

    egui::TopBottomPanel::bottom("chat_input").show(ctx, |ui| {
        let Some(chat) = s.chat.as_mut() else { return };
        let busy = chat.controller.is_pending();
        let listening = chat.speech.state() == ListenState::Active;
        let mic_hint = if chat.speech.is_supported() {
            "Voice input"
        } else {
            "Voice input is not configured"
        };

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            let mic = if listening {
                egui::Button::new("🎙 Stop").fill(egui::Color32::from_rgb(180, 70, 70))
            } else {
                egui::Button::new("🎙")
            };
            if ui
                .add_enabled(!busy, mic.min_size(egui::vec2(44.0, 44.0)))
                .on_hover_text(mic_hint)
                .clicked()
            {
                voice_requested = true;
            }

            // Enter sends; Shift+Enter falls through to the editor as a newline
            let input_id = egui::Id::new(INPUT_ID);
            let focused = ui.memory(|m| m.has_focus(input_id));
            if focused
                && ui.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::Enter))
            {
                send_requested = true;
            }

            let hint = if busy {
                "Waiting for response..."
            } else {
                "Type your message..."
            };
            ui.add_sized(
                [ui.available_width() - 60.0, 44.0],
                egui::TextEdit::multiline(&mut chat.input_text)
                    .id(input_id)
                    .hint_text(hint)
                    .desired_rows(1)
                    .interactive(!busy),
            );

            let can_send = !busy && !chat.input_text.trim().is_empty();
            if ui
                .add_enabled(can_send, egui::Button::new("Send").min_size(egui::vec2(52.0, 44.0)))
                .clicked()
            {
                send_requested = true;
            }
        });
        ui.label(
            egui::RichText::new("Press Enter to send, Shift + Enter for new line")
                .size(11.0)
                .weak(),
        );
        ui.add_space(4.0);
    });

    egui::CentralPanel::default().show(ctx, |ui| {
        let Some(chat) = s.chat.as_ref() else { return };
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for (index, turn) in chat.controller.transcript().iter().enumerate() {
                    ui.add_space(6.0);
                    render_turn(ui, index, turn, dark);
                    ui.add_space(6.0);
                }
                if chat.controller.is_pending() {
                    render_thinking(ui, dark);
                    ctx.request_repaint();
                }
            });
    });

    if voice_requested {
        s.toggle_voice();
    }
    if send_requested {
        s.send_input();
    }
}

fn bubble_fill(dark: bool) -> egui::Color32 {
    if dark {
        egui::Color32::from_rgb(50, 50, 58)
    } else {
        egui::Color32::from_rgb(245, 245, 248)
    }
}

fn render_turn(ui: &mut egui::Ui, index: usize, turn: &Turn, dark: bool) {
    if turn.is_user() {
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Min), |ui| {
            ui.add_space(8.0);
            egui::Frame::none()
                .fill(accent())
                .rounding(egui::Rounding::same(12.0))
                .inner_margin(egui::Margin::same(12.0))
                .show(ui, |ui| {
                    ui.set_max_width(500.0);
                    ui.label(
                        egui::RichText::new(&turn.text)
                            .color(egui::Color32::WHITE)
                            .size(15.0),
                    );
                });
        });
        return;
    }

    egui::Frame::none()
        .fill(bubble_fill(dark))
        .rounding(egui::Rounding::same(12.0))
        .inner_margin(egui::Margin::same(12.0))
        .show(ui, |ui| {
            ui.set_max_width(600.0);
            ui.label(egui::RichText::new(&turn.text).size(15.0));

            if let Some(summary) = present(&turn.tool_invocations) {
                ui.add_space(8.0);
                render_tool_summary(ui, index, &summary);
            }
        });
}

fn render_tool_summary(ui: &mut egui::Ui, index: usize, summary: &ToolSummary) {
    egui::CollapsingHeader::new(egui::RichText::new(format!("🔧 {}", summary.label)).size(12.0))
        .id_source(("tool_calls", index))
        .default_open(false)
        .show(ui, |ui| {
            for call in &summary.calls {
                ui.group(|ui| {
                    ui.label(egui::RichText::new(&call.name).monospace().strong());
                    if call.parameters.is_empty() {
                        return;
                    }
                    ui.label(egui::RichText::new("Parameters:").size(11.0).weak());
                    for param in &call.parameters {
                        ui.horizontal_wrapped(|ui| {
                            ui.label(
                                egui::RichText::new(format!("{}:", param.key))
                                    .monospace()
                                    .color(accent()),
                            );
                            ui.label(egui::RichText::new(&param.value).monospace().size(12.0));
                        });
                    }
                });
            }
        });
}

fn render_thinking(ui: &mut egui::Ui, dark: bool) {
    ui.add_space(6.0);
    egui::Frame::none()
        .fill(bubble_fill(dark))
        .rounding(egui::Rounding::same(12.0))
        .inner_margin(egui::Margin::same(12.0))
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(egui::RichText::new("Thinking...").italics().weak());
            });
        });
}

fn render_notices(ctx: &egui::Context, notices: &[Notice]) {
    if notices.is_empty() {
        return;
    }
    egui::Area::new(egui::Id::new("notices"))
        .anchor(egui::Align2::RIGHT_BOTTOM, [-16.0, -90.0])
        .order(egui::Order::Foreground)
        .show(ctx, |ui| {
            for notice in notices {
                let stroke = match notice.severity {
                    Severity::Error => egui::Color32::from_rgb(200, 80, 80),
                    Severity::Info => accent(),
                };
                egui::Frame::popup(ui.style())
                    .stroke(egui::Stroke::new(1.0, stroke))
                    .show(ui, |ui| {
                        ui.set_max_width(320.0);
                        ui.label(egui::RichText::new(&notice.title).strong());
                        ui.label(&notice.description);
                    });
                ui.add_space(6.0);
            }
        });
}

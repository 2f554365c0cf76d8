//! State management for the AgentSync app
//!
//! `AppState` owns the auth context and, while signed in, one `ChatSession`.
//! Remote calls run on the app's tokio runtime and come back as
//! [`Envelope`]s that `poll` drains once per frame.

use crate::types::{AppScreen, Envelope, RemoteEvent};
use anyhow::{Context as _, Result};
use eframe::egui;
use providers::{AgentSyncClient, CommandRecognizer};
use session::controller::bounded;
use session::{
    AuthSession, SendOutcome, SendTicket, SessionController, SignInAttempt, SpeechChannel,
};
use shared::agent_api::RemoteService;
use shared::notify::NoticeBoard;
use shared::settings::ClientSettings;
use shared::speech::{SignalSink, SpeechSignal};
use std::future::Future;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

/// Runs remote calls off the UI thread and posts the results back.
pub struct RemoteWorker {
    runtime: Runtime,
    remote: Arc<dyn RemoteService>,
    tx: Sender<Envelope>,
    ctx: egui::Context,
    deadline: Duration,
}

impl RemoteWorker {
    fn dispatch<F>(&self, chat: u64, call: F)
    where
        F: Future<Output = RemoteEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        let ctx = self.ctx.clone();
        self.runtime.spawn(async move {
            let event = call.await;
            let _ = tx.send(Envelope { chat, event });
            ctx.request_repaint();
        });
    }

    pub fn login(&self, attempt: SignInAttempt) {
        let remote = self.remote.clone();
        let deadline = self.deadline;
        self.dispatch(0, async move {
            RemoteEvent::Login(attempt, bounded(deadline, remote.trigger_login()).await)
        });
    }

    pub fn history(&self, chat: u64) {
        let remote = self.remote.clone();
        let deadline = self.deadline;
        self.dispatch(chat, async move {
            RemoteEvent::History(bounded(deadline, remote.history()).await)
        });
    }

    pub fn query(&self, chat: u64, ticket: SendTicket) {
        let remote = self.remote.clone();
        let deadline = self.deadline;
        self.dispatch(chat, async move {
            let result = bounded(deadline, remote.query(ticket.text())).await;
            RemoteEvent::Query(ticket, result)
        });
    }

    pub fn reset(&self, chat: u64) {
        let remote = self.remote.clone();
        let deadline = self.deadline;
        self.dispatch(chat, async move {
            RemoteEvent::Reset(bounded(deadline, remote.reset()).await)
        });
    }

    fn handle(&self) -> tokio::runtime::Handle {
        self.runtime.handle().clone()
    }
}

/// One mounted chat view: transcript controller, voice input and draft text
pub struct ChatSession {
    pub id: u64,
    pub controller: SessionController,
    pub speech: SpeechChannel,
    speech_rx: Receiver<SpeechSignal>,
    pub input_text: String,
}

pub struct AppState {
    pub settings: ClientSettings,
    settings_path: Option<PathBuf>,
    pub notices: Arc<NoticeBoard>,
    pub auth: AuthSession,
    pub chat: Option<ChatSession>,
    worker: RemoteWorker,
    events_rx: Receiver<Envelope>,
    next_chat_id: u64,
}

impl AppState {
    pub fn new(
        settings: ClientSettings,
        settings_path: Option<PathBuf>,
        ctx: egui::Context,
    ) -> Result<Self> {
        let client = AgentSyncClient::from_settings(&settings)?;
        tracing::info!(base = %client.base_url(), "using assistant backend");
        Self::with_remote(settings, settings_path, ctx, Arc::new(client))
    }

    pub fn with_remote(
        settings: ClientSettings,
        settings_path: Option<PathBuf>,
        ctx: egui::Context,
        remote: Arc<dyn RemoteService>,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .context("failed to start async runtime")?;

        let (tx, events_rx) = channel();
        let notices = Arc::new(NoticeBoard::new());
        let worker = RemoteWorker {
            runtime,
            remote,
            tx,
            ctx,
            deadline: settings.request_timeout(),
        };

        Ok(Self {
            auth: AuthSession::new(notices.clone()),
            settings,
            settings_path,
            notices,
            chat: None,
            worker,
            events_rx,
            next_chat_id: 1,
        })
    }

    pub fn screen(&self) -> AppScreen {
        match &self.chat {
            Some(chat) if chat.controller.is_bootstrapped() => AppScreen::Chat,
            Some(_) => AppScreen::Loading,
            None => AppScreen::Login,
        }
    }

    pub fn sign_in(&mut self) {
        if let Some(attempt) = self.auth.begin_sign_in() {
            self.worker.login(attempt);
        }
    }

    pub fn sign_out(&mut self) {
        self.auth.sign_out();
        // dropping the chat stops any running recognizer
        self.chat = None;
    }

    fn open_chat(&mut self) {
        let id = self.next_chat_id;
        self.next_chat_id += 1;

        let ctx = self.worker.ctx.clone();
        let (sink, speech_rx) = SignalSink::channel();
        let sink = sink.with_waker(Arc::new(move || ctx.request_repaint()));
        let capability = CommandRecognizer::capability(&self.settings.speech, self.worker.handle());

        self.chat = Some(ChatSession {
            id,
            controller: SessionController::new(self.notices.clone())
                .with_deadline(self.settings.request_timeout()),
            speech: SpeechChannel::new(capability, sink, self.notices.clone()),
            speech_rx,
            input_text: String::new(),
        });
        self.worker.history(id);
    }

    /// Route typed or spoken text into the session's single send path.
    pub fn send(&mut self, text: &str) -> bool {
        let Some(chat) = self.chat.as_mut() else {
            return false;
        };
        match chat.controller.begin_send(text) {
            Some(ticket) => {
                self.worker.query(chat.id, ticket);
                true
            }
            None => false,
        }
    }

    pub fn send_input(&mut self) {
        let Some(chat) = self.chat.as_mut() else {
            return;
        };
        let text = chat.input_text.clone();
        if self.send(&text) {
            if let Some(chat) = self.chat.as_mut() {
                chat.input_text.clear();
            }
        }
    }

    pub fn reset_chat(&mut self) {
        if let Some(chat) = self.chat.as_mut() {
            if chat.controller.begin_reset() {
                self.worker.reset(chat.id);
            }
        }
    }

    pub fn toggle_voice(&mut self) {
        if let Some(chat) = self.chat.as_mut() {
            chat.speech.toggle();
        }
    }

    pub fn set_dark_mode(&mut self, dark: bool) {
        if self.settings.dark_mode == dark {
            return;
        }
        self.settings.dark_mode = dark;
        if let Some(path) = &self.settings_path {
            if let Err(e) = self.settings.save_to(path) {
                tracing::warn!("could not save settings: {}", e);
            }
        }
    }

    /// Drain background results and recognizer signals (non-blocking).
    pub fn poll(&mut self) {
        while let Ok(envelope) = self.events_rx.try_recv() {
            self.apply(envelope);
        }

        let mut transcripts = Vec::new();
        if let Some(chat) = self.chat.as_mut() {
            while let Ok(signal) = chat.speech_rx.try_recv() {
                if let Some(text) = chat.speech.handle(signal) {
                    transcripts.push(text);
                }
            }
        }
        for text in transcripts {
            // a transcript landing while a send is pending is dropped by the controller
            if !self.send(&text) {
                tracing::debug!("voice transcript not sent");
            }
        }
    }

    fn apply(&mut self, envelope: Envelope) {
        if let RemoteEvent::Login(attempt, result) = envelope.event {
            if self.auth.finish_sign_in(attempt, result) && self.chat.is_none() {
                self.open_chat();
            }
            return;
        }

        let Some(chat) = self.chat.as_mut().filter(|c| c.id == envelope.chat) else {
            tracing::debug!(chat = envelope.chat, "dropping result for a closed chat");
            return;
        };
        match envelope.event {
            RemoteEvent::History(result) => chat.controller.finish_bootstrap(result),
            RemoteEvent::Query(ticket, result) => {
                if chat.controller.finish_send(ticket, result) == SendOutcome::Discarded {
                    tracing::debug!("reply arrived after a reset");
                }
            }
            RemoteEvent::Reset(result) => {
                chat.controller.finish_reset(result);
            }
            RemoteEvent::Login(..) => {}
        }
    }
}

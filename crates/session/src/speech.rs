//! Speech input channel
//!
//! A toggle over a [`SpeechCapability`]. While `Active`, the first final
//! result of the current listening session is handed back to the caller and
//! the session ends. Everything else the recognizer reports is either mapped
//! to a notification or dropped.

use shared::notify::{Notice, Notifier};
use shared::speech::{
    ListenSessionId, RecognitionEvent, SignalSink, SpeechCapability, SpeechSignal,
};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenState {
    Idle,
    Active,
    /// The last session failed; cleared by the recognizer's end signal or the
    /// next toggle
    Error,
}

pub struct SpeechChannel {
    capability: SpeechCapability,
    state: ListenState,
    /// Id of the current (or most recent) listening session
    session: ListenSessionId,
    sink: SignalSink,
    notifier: Arc<dyn Notifier>,
}

impl SpeechChannel {
    /// `sink` is handed to the recognizer on every start; its receiving half
    /// belongs to the host, which feeds signals back through [`Self::handle`].
    pub fn new(capability: SpeechCapability, sink: SignalSink, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            capability,
            state: ListenState::Idle,
            session: 0,
            sink,
            notifier,
        }
    }

    pub fn state(&self) -> ListenState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == ListenState::Active
    }

    pub fn is_supported(&self) -> bool {
        self.capability.is_available()
    }

    /// Start when idle (or after an error), stop when listening.
    pub fn toggle(&mut self) {
        match self.state {
            ListenState::Active => self.stop(),
            ListenState::Idle | ListenState::Error => self.start(),
        }
    }

    pub fn start(&mut self) {
        if self.state == ListenState::Active {
            return;
        }
        let recognizer = match &mut self.capability {
            SpeechCapability::Available(recognizer) => recognizer,
            SpeechCapability::Unavailable => {
                self.notifier.notify(Notice::error(
                    "Not Supported",
                    "Voice input is not supported on this system. Configure a speech recognizer in settings.",
                ));
                return;
            }
        };

        self.session += 1;
        match recognizer.start(self.session, self.sink.clone()) {
            Ok(()) => {
                self.state = ListenState::Active;
                self.notifier.notify(Notice::info("Listening...", "Speak now"));
            }
            Err(e) => {
                tracing::error!("error starting recognition: {}", e);
                self.state = ListenState::Idle;
            }
        }
    }

    /// Cancel the current listening session without emitting anything.
    pub fn stop(&mut self) {
        if self.state != ListenState::Active {
            return;
        }
        self.halt_recognizer();
        self.state = ListenState::Idle;
    }

    fn halt_recognizer(&mut self) {
        if let SpeechCapability::Available(recognizer) = &mut self.capability {
            recognizer.stop();
        }
    }

    /// Feed one recognizer signal. Returns the finalized transcript, at most
    /// once per listening session.
    pub fn handle(&mut self, signal: SpeechSignal) -> Option<String> {
        if signal.session != self.session {
            tracing::debug!(
                signal = signal.session,
                current = self.session,
                "dropping signal from an old listening session"
            );
            return None;
        }

        match signal.event {
            RecognitionEvent::Interim(_) => None,
            RecognitionEvent::Final(text) => {
                if self.state != ListenState::Active {
                    return None;
                }
                self.halt_recognizer();
                self.state = ListenState::Idle;
                let text = text.trim();
                if text.is_empty() {
                    None
                } else {
                    Some(text.to_string())
                }
            }
            RecognitionEvent::Error(kind) => {
                if self.state != ListenState::Active {
                    return None;
                }
                tracing::warn!(?kind, "speech recognition error");
                self.halt_recognizer();
                self.state = ListenState::Error;
                self.notifier
                    .notify(Notice::error("Voice Input Error", kind.message()));
                None
            }
            RecognitionEvent::End => {
                self.state = ListenState::Idle;
                None
            }
        }
    }
}

impl Drop for SpeechChannel {
    fn drop(&mut self) {
        if self.state == ListenState::Active {
            self.halt_recognizer();
        }
    }
}

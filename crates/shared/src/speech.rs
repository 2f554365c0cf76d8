//! Speech-to-text capability abstraction.
//!
//! A [`Recognizer`] is started for one listening session at a time and reports
//! what it hears as [`RecognitionEvent`]s through a [`SignalSink`]. Every event
//! is tagged with the session it belongs to.

use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

/// Identifies one listening session
pub type ListenSessionId = u64;

/// Platform error categories reported by a recognizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechErrorKind {
    NoSpeech,
    AudioCapture,
    NotAllowed,
    Network,
    /// Anything the taxonomy doesn't cover, with the raw code
    Other(String),
}

impl SpeechErrorKind {
    /// Classify a platform error code such as `no-speech` or `not-allowed`.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "no-speech" => SpeechErrorKind::NoSpeech,
            "audio-capture" => SpeechErrorKind::AudioCapture,
            "not-allowed" => SpeechErrorKind::NotAllowed,
            "network" => SpeechErrorKind::Network,
            other => SpeechErrorKind::Other(other.to_string()),
        }
    }

    /// Human-readable message for the notification channel
    pub fn message(&self) -> &'static str {
        match self {
            SpeechErrorKind::NoSpeech => "No speech detected. Please try again.",
            SpeechErrorKind::AudioCapture => {
                "No microphone found. Please check your audio settings."
            }
            SpeechErrorKind::NotAllowed => {
                "Microphone access denied. Please enable microphone permissions."
            }
            SpeechErrorKind::Network => "Network error occurred during voice recognition.",
            SpeechErrorKind::Other(_) => "Voice input failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Partial hypothesis; never forwarded
    Interim(String),
    Final(String),
    Error(SpeechErrorKind),
    /// The recognizer finished the session, for whatever reason
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechSignal {
    pub session: ListenSessionId,
    pub event: RecognitionEvent,
}

/// Sending half handed to a recognizer for the duration of a session.
///
/// The optional waker lets an event-driven host redraw when a signal lands.
#[derive(Clone)]
pub struct SignalSink {
    tx: Sender<SpeechSignal>,
    waker: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl SignalSink {
    pub fn new(tx: Sender<SpeechSignal>) -> Self {
        Self { tx, waker: None }
    }

    pub fn with_waker(mut self, waker: Arc<dyn Fn() + Send + Sync>) -> Self {
        self.waker = Some(waker);
        self
    }

    /// Create a sink together with the receiver the host drains.
    pub fn channel() -> (Self, Receiver<SpeechSignal>) {
        let (tx, rx) = std::sync::mpsc::channel();
        (Self::new(tx), rx)
    }

    /// Returns false once the host side has gone away.
    pub fn emit(&self, session: ListenSessionId, event: RecognitionEvent) -> bool {
        let delivered = self.tx.send(SpeechSignal { session, event }).is_ok();
        if let Some(wake) = &self.waker {
            wake();
        }
        delivered
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecognizerError {
    #[error("failed to start recognizer: {0}")]
    Start(String),

    #[error("recognizer is already running")]
    Busy,
}

/// A stateful speech recognition engine.
pub trait Recognizer: Send {
    /// Begin capturing. Events for this session must be tagged with `session`.
    fn start(&mut self, session: ListenSessionId, sink: SignalSink) -> Result<(), RecognizerError>;

    /// Stop capturing. Safe to call when not running.
    fn stop(&mut self);
}

/// Whether the host platform can do speech recognition at all
pub enum SpeechCapability {
    Available(Box<dyn Recognizer>),
    Unavailable,
}

impl SpeechCapability {
    pub fn is_available(&self) -> bool {
        matches!(self, SpeechCapability::Available(_))
    }
}

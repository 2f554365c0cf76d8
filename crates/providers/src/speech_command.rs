//! Speech recognition backed by an external program.
//!
//! The program is started once per listening session and reports on stdout,
//! one line at a time:
//!
//! ```text
//! partial: what's the          (interim, ignored by the channel)
//! final: what's the weather    (the transcript)
//! error: no-speech             (platform error code)
//! ```
//!
//! Any other non-empty line counts as a final result. The process exiting ends
//! the session. The requested language is passed in `AGENTSYNC_SPEECH_LANG`.

use shared::settings::SpeechSettings;
use shared::speech::{
    ListenSessionId, RecognitionEvent, Recognizer, RecognizerError, SignalSink,
    SpeechCapability, SpeechErrorKind,
};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

pub const LANGUAGE_ENV: &str = "AGENTSYNC_SPEECH_LANG";

struct Running {
    session: ListenSessionId,
    stop_tx: oneshot::Sender<()>,
}

pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
    language: String,
    runtime: Handle,
    running: Option<Running>,
}

impl CommandRecognizer {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        language: impl Into<String>,
        runtime: Handle,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            language: language.into(),
            runtime,
            running: None,
        }
    }

    /// `None` when no recognizer program is configured
    pub fn from_settings(settings: &SpeechSettings, runtime: Handle) -> Option<Self> {
        let (program, args) = settings.command.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        Some(Self::new(
            program.clone(),
            args.to_vec(),
            settings.language.clone(),
            runtime,
        ))
    }

    /// Wrap the configured recognizer, if any, as a speech capability.
    pub fn capability(settings: &SpeechSettings, runtime: Handle) -> SpeechCapability {
        match Self::from_settings(settings, runtime) {
            Some(recognizer) => SpeechCapability::Available(Box::new(recognizer)),
            None => SpeechCapability::Unavailable,
        }
    }

    fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.stop_tx.is_closed())
    }
}

/// Parse one stdout line of the recognizer protocol.
pub fn parse_line(line: &str) -> Option<RecognitionEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(rest) = line.strip_prefix("partial:") {
        return Some(RecognitionEvent::Interim(rest.trim().to_string()));
    }
    if let Some(rest) = line.strip_prefix("error:") {
        return Some(RecognitionEvent::Error(SpeechErrorKind::from_code(rest)));
    }
    let text = line.strip_prefix("final:").unwrap_or(line).trim();
    if text.is_empty() {
        None
    } else {
        Some(RecognitionEvent::Final(text.to_string()))
    }
}

impl Recognizer for CommandRecognizer {
    fn start(&mut self, session: ListenSessionId, sink: SignalSink) -> Result<(), RecognizerError> {
        if self.is_running() {
            return Err(RecognizerError::Busy);
        }

        // tokio::process needs the runtime's reactor to spawn
        let _guard = self.runtime.enter();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(LANGUAGE_ENV, &self.language)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RecognizerError::Start(format!("{}: {}", self.program, e)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RecognizerError::Start("recognizer stdout unavailable".into()))?;

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let program = self.program.clone();

        self.runtime.spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut reported = false;
            let mut stopped = false;

            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        stopped = true;
                        let _ = child.start_kill();
                        break;
                    }
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            let Some(event) = parse_line(&line) else { continue };
                            if !matches!(event, RecognitionEvent::Interim(_)) {
                                reported = true;
                            }
                            if !sink.emit(session, event) {
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            tracing::warn!(%program, "reading recognizer output failed: {}", e);
                            reported = true;
                            sink.emit(
                                session,
                                RecognitionEvent::Error(SpeechErrorKind::Other("io".into())),
                            );
                            break;
                        }
                    }
                }
            }

            match child.wait().await {
                Ok(status) if !status.success() && !reported && !stopped => {
                    tracing::warn!(%program, %status, "recognizer exited without a result");
                    sink.emit(
                        session,
                        RecognitionEvent::Error(SpeechErrorKind::Other(status.to_string())),
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(%program, "waiting for recognizer failed: {}", e),
            }
            sink.emit(session, RecognitionEvent::End);
        });

        tracing::info!(program = %self.program, session, "recognizer started");
        self.running = Some(Running { session, stop_tx });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            tracing::debug!(session = running.session, "stopping recognizer");
            let _ = running.stop_tx.send(());
        }
    }
}

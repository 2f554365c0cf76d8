//! Transient user-facing notifications (toasts).

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// How a notice should be styled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    /// Failure the user should notice
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Info,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Error,
        }
    }
}

/// Sink for notices. Implementations must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Default time a notice stays visible
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

/// In-memory notice store shared between the UI and background callbacks
#[derive(Default)]
pub struct NoticeBoard {
    entries: Mutex<Vec<(Notice, Instant)>>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices younger than `ttl`, oldest first. Expired ones are dropped.
    pub fn active(&self, ttl: Duration) -> Vec<Notice> {
        let mut entries = self.entries.lock();
        entries.retain(|(_, at)| at.elapsed() < ttl);
        entries.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Every notice still held, regardless of age
    pub fn snapshot(&self) -> Vec<Notice> {
        self.entries.lock().iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for NoticeBoard {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            Severity::Error => tracing::warn!(title = %notice.title, "{}", notice.description),
            Severity::Info => tracing::info!(title = %notice.title, "{}", notice.description),
        }
        self.entries.lock().push((notice, Instant::now()));
    }
}

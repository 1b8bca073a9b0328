//! User-visible notifications
//!
//! Every user action produces exactly one transient notice. The client
//! pushes them onto a channel; the view drains and renders them.

use serde::Serialize;
use tokio::sync::mpsc;

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A one-shot, dismissable notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

/// Sending half used by the client
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl Notifier {
    /// Create a notifier and the receiver views drain
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit a notice
    ///
    /// Dropped silently once the view has gone away.
    pub fn notify(&self, notice: Notice) {
        let _ = self.tx.send(notice);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(Notice::success(message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(Notice::error(message));
    }
}

/// Drain every notice currently queued
pub fn drain(rx: &mut mpsc::UnboundedReceiver<Notice>) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        notices.push(notice);
    }
    notices
}

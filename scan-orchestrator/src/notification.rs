//! User-facing notifications
//!
//! Every user action ends in a short notification (title plus one line of
//! detail), the way a dashboard shows a toast. Notifications are logged and
//! forwarded over a channel; nothing blocks if nobody listens.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(severity: Severity, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
            timestamp: Utc::now(),
        }
    }

    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Severity::Info, title, description)
    }

    pub fn warning(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Severity::Warning, title, description)
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Severity::Error, title, description)
    }
}

/// Sending half for notifications
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    tx: Option<mpsc::UnboundedSender<Notification>>,
}

impl Notifier {
    pub fn new(tx: mpsc::UnboundedSender<Notification>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A notifier that only logs
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Create a notifier and the receiver its notifications arrive on
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Info => {
                tracing::info!("{}: {}", notification.title, notification.description)
            }
            Severity::Warning => {
                tracing::warn!("{}: {}", notification.title, notification.description)
            }
            Severity::Error => {
                tracing::error!("{}: {}", notification.title, notification.description)
            }
        }

        if let Some(tx) = &self.tx {
            // Receiver gone means nobody is displaying notifications
            let _ = tx.send(notification);
        }
    }
}

//! Host-page ports: notifications, navigation, and DOM signals

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use violations::BrowserSignal;

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Toast or banner shown to the candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// The exam page hosting the session
pub trait HostPage: Send + Sync {
    fn notify(&self, notice: Notice);

    /// Navigate back to the pre-exam instructions for `exam_id`
    fn redirect_to_instructions(&self, exam_id: &str);
}

/// Source of window/document events.
///
/// Attached when monitoring starts and detached on every terminal
/// transition. After `detach` the source must drop the sender.
pub trait SignalSource: Send + Sync {
    fn attach(&self, sender: mpsc::UnboundedSender<BrowserSignal>);
    fn detach(&self);
}

/// Signal source for hosts that forward no DOM events
pub struct NoSignals;

impl SignalSource for NoSignals {
    fn attach(&self, _sender: mpsc::UnboundedSender<BrowserSignal>) {}
    fn detach(&self) {}
}

//! Session state and terminal signals

use chrono::{DateTime, Utc};
use detection::DetectionError;
use media_capture::{DeviceKind, MediaError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sub-state while initializing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitPhase {
    AcquiringMedia,
    LoadingModels,
}

/// Category of a fatal initialization failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitFailureKind {
    PermissionDenied,
    NoDevice,
    DeviceBusy,
    UnsupportedBrowser,
    ModelLoadFailure,
    VideoReadyTimeout,
}

/// Fatal initialization failure with the message shown to the candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitFailure {
    pub kind: InitFailureKind,
    /// User-facing message
    pub message: String,
    /// Technical detail for logs
    pub detail: String,
}

impl fmt::Display for InitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.detail)
    }
}

impl From<&MediaError> for InitFailure {
    fn from(err: &MediaError) -> Self {
        let (kind, message) = match err {
            MediaError::PermissionDenied(device) => (
                InitFailureKind::PermissionDenied,
                format!("Please allow {} access to continue the exam.", device),
            ),
            MediaError::NoDevice(device) => (
                InitFailureKind::NoDevice,
                format!("No {} was found. Connect one to continue the exam.", device),
            ),
            MediaError::DeviceBusy(DeviceKind::Camera) => (
                InitFailureKind::DeviceBusy,
                "Your camera is in use by another application. Close it and try again.".to_string(),
            ),
            MediaError::DeviceBusy(DeviceKind::Microphone) => (
                InitFailureKind::DeviceBusy,
                "Your microphone is in use by another application. Close it and try again."
                    .to_string(),
            ),
            MediaError::Unsupported(_) => (
                InitFailureKind::UnsupportedBrowser,
                "This browser cannot share your camera. Please switch to a supported browser."
                    .to_string(),
            ),
            MediaError::VideoReadyTimeout(_) | MediaError::Playback(_) => (
                InitFailureKind::VideoReadyTimeout,
                "The camera did not start in time. Check your camera and try again.".to_string(),
            ),
        };
        Self {
            kind,
            message,
            detail: err.to_string(),
        }
    }
}

impl From<&DetectionError> for InitFailure {
    fn from(err: &DetectionError) -> Self {
        Self {
            kind: InitFailureKind::ModelLoadFailure,
            message: "Proctoring could not start. Please reload the page and try again."
                .to_string(),
            detail: err.to_string(),
        }
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Termination {
    pub reason: String,
    /// True when the warning threshold ended the exam
    pub auto_submitted: bool,
}

/// Proctoring session state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Proctoring turned off for this exam; nothing was acquired
    Disabled,
    Initializing(InitPhase),
    /// Media and models ready, monitoring not started yet
    Ready,
    Monitoring,
    Terminated(Termination),
    Failed(InitFailure),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Disabled => "disabled",
            SessionState::Initializing(_) => "initializing",
            SessionState::Ready => "ready",
            SessionState::Monitoring => "monitoring",
            SessionState::Terminated(_) => "terminated",
            SessionState::Failed(_) => "failed",
        }
    }

    /// No further transitions happen from a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Disabled | SessionState::Terminated(_) | SessionState::Failed(_)
        )
    }
}

/// Terminal signal telling the exam page to submit and leave
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoSubmit {
    pub reason: String,
    pub warnings: u32,
    pub terminated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_media_errors_map_to_kinds() {
        let cases = [
            (MediaError::PermissionDenied(DeviceKind::Camera), InitFailureKind::PermissionDenied),
            (MediaError::NoDevice(DeviceKind::Camera), InitFailureKind::NoDevice),
            (MediaError::DeviceBusy(DeviceKind::Camera), InitFailureKind::DeviceBusy),
            (
                MediaError::Unsupported("no mediaDevices".into()),
                InitFailureKind::UnsupportedBrowser,
            ),
            (
                MediaError::VideoReadyTimeout(Duration::from_secs(5)),
                InitFailureKind::VideoReadyTimeout,
            ),
        ];
        for (err, kind) in cases {
            assert_eq!(InitFailure::from(&err).kind, kind);
        }
    }

    #[test]
    fn test_permission_message_names_device() {
        let failure = InitFailure::from(&MediaError::PermissionDenied(DeviceKind::Camera));
        assert_eq!(failure.message, "Please allow camera access to continue the exam.");
    }

    #[test]
    fn test_terminal_states() {
        assert!(!SessionState::Monitoring.is_terminal());
        assert!(!SessionState::Initializing(InitPhase::LoadingModels).is_terminal());
        assert!(SessionState::Disabled.is_terminal());
        assert!(SessionState::Terminated(Termination {
            reason: "stopped".into(),
            auto_submitted: false
        })
        .is_terminal());
    }
}

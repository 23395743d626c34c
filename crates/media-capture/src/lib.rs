//! Media Capture for Exam Proctoring
//!
//! Acquires the candidate's camera (and optionally microphone) from the
//! host device and owns the resulting streams until they are released.
//! Supports:
//! - Camera streams with facing-mode and resolution constraints
//! - Optional microphone stream with an audio analysis graph
//! - Bounded wait for the video surface to become playable
//! - Idempotent release on every teardown path

pub mod device;
pub mod frame;
pub mod session;

pub use device::{
    AudioAnalyser, MediaDevices, MediaStream, MediaTrack, ReadyState, StreamRequest, TrackKind,
    VideoSurface,
};
pub use frame::VideoFrame;
pub use session::{MediaAcquirer, MediaSession};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Media error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("Permission to use the {0} was denied")]
    PermissionDenied(DeviceKind),

    #[error("No {0} was found")]
    NoDevice(DeviceKind),

    #[error("The {0} is in use by another application")]
    DeviceBusy(DeviceKind),

    #[error("Media capture is not supported: {0}")]
    Unsupported(String),

    #[error("Video did not become ready within {0:?}")]
    VideoReadyTimeout(Duration),

    #[error("Video playback failed: {0}")]
    Playback(String),
}

/// Capture device kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    Camera,
    Microphone,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Camera => write!(f, "camera"),
            DeviceKind::Microphone => write!(f, "microphone"),
        }
    }
}

/// Which way the requested camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera, pointed at the candidate
    #[default]
    User,
    /// Rear camera
    Environment,
}

/// Video constraints passed to the host device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoConstraints {
    pub width: u32,
    pub height: u32,
    pub facing_mode: FacingMode,
}

/// Media configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Requested capture width
    pub width: u32,

    /// Requested capture height
    pub height: u32,

    /// Camera facing mode
    pub facing_mode: FacingMode,

    /// Also acquire the microphone and build an audio analyser
    pub capture_audio: bool,

    /// Maximum wait for the video surface to report playable metadata (ms)
    pub video_ready_timeout_ms: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            facing_mode: FacingMode::User,
            capture_audio: false,
            video_ready_timeout_ms: 5000,
        }
    }
}

impl MediaConfig {
    /// Video constraints derived from this configuration
    pub fn video_constraints(&self) -> VideoConstraints {
        VideoConstraints {
            width: self.width,
            height: self.height,
            facing_mode: self.facing_mode,
        }
    }

    /// Timeout applied while waiting for the video surface
    pub fn video_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.video_ready_timeout_ms)
    }
}

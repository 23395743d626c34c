//! Host device ports: media devices, streams, tracks, and the video surface
//!
//! The browser (or any other host) implements these traits; the proctoring
//! core never reaches for ambient globals.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::frame::VideoFrame;
use crate::{MediaError, VideoConstraints};

/// Track kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

/// A single live media track owned by a stream
pub trait MediaTrack: Send + Sync {
    /// Track identifier
    fn id(&self) -> &str;

    /// Whether this is a video or audio track
    fn kind(&self) -> TrackKind;

    /// Stop the track. Stopping an already stopped track is a no-op.
    fn stop(&self);

    /// Whether the track is still delivering media
    fn is_live(&self) -> bool;
}

/// A set of tracks returned by one device request
#[derive(Clone, Default)]
pub struct MediaStream {
    tracks: Vec<Arc<dyn MediaTrack>>,
}

impl MediaStream {
    pub fn new(tracks: Vec<Arc<dyn MediaTrack>>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[Arc<dyn MediaTrack>] {
        &self.tracks
    }

    /// Stop every track on this stream
    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }

    /// Number of tracks still live
    pub fn live_track_count(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_live()).count()
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("tracks", &self.tracks.iter().map(|t| t.id()).collect::<Vec<_>>())
            .finish()
    }
}

/// A request for one stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamRequest {
    /// Camera only
    Video(VideoConstraints),
    /// Microphone only
    Audio,
}

/// Host media devices (getUserMedia and the audio graph factory)
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Request a stream. Suspends until the user grants or denies access.
    async fn get_user_media(&self, request: &StreamRequest) -> Result<MediaStream, MediaError>;

    /// Build an audio analysis graph fed by a microphone stream
    fn create_analyser(&self, stream: &MediaStream) -> Result<Box<dyn AudioAnalyser>, MediaError>;
}

/// Audio analysis graph over a microphone stream
pub trait AudioAnalyser: Send + Sync {
    /// Most recent window of time-domain samples, normalized to -1.0..=1.0
    fn time_domain_data(&self) -> Vec<f32>;

    /// Disconnect the graph. Must be safe to call more than once.
    fn close(&self);
}

/// Media readiness of the video surface, ordered like HTMLMediaElement.readyState
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

/// Render target the camera stream is attached to (visible or off-screen)
#[async_trait]
pub trait VideoSurface: Send + Sync {
    /// Attach a stream as the surface's source
    fn attach(&self, stream: &MediaStream);

    /// Remove the current source, if any
    fn detach(&self);

    /// Start playback. Resolves once metadata is available and playback began.
    async fn play(&self) -> Result<(), MediaError>;

    /// Current readiness
    fn ready_state(&self) -> ReadyState;

    /// Grab the frame currently displayed
    fn capture_frame(&self) -> Option<VideoFrame>;
}

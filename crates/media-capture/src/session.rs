//! Media acquisition and stream lifecycle

use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::device::{
    AudioAnalyser, MediaDevices, MediaStream, ReadyState, StreamRequest, VideoSurface,
};
use crate::frame::VideoFrame;
use crate::{MediaConfig, MediaError};

/// Acquires camera and microphone streams according to a [`MediaConfig`]
pub struct MediaAcquirer {
    devices: Arc<dyn MediaDevices>,
    surface: Arc<dyn VideoSurface>,
    config: MediaConfig,
}

impl MediaAcquirer {
    pub fn new(
        devices: Arc<dyn MediaDevices>,
        surface: Arc<dyn VideoSurface>,
        config: MediaConfig,
    ) -> Self {
        Self {
            devices,
            surface,
            config,
        }
    }

    /// Acquire the camera (and microphone if configured) and wait for the
    /// surface to start playing.
    ///
    /// Anything acquired before a failure is released before returning.
    pub async fn acquire(&self) -> Result<MediaSession, MediaError> {
        let request = StreamRequest::Video(self.config.video_constraints());
        info!(
            "Requesting camera {}x{} ({:?})",
            self.config.width, self.config.height, self.config.facing_mode
        );
        let camera = self.devices.get_user_media(&request).await?;

        let mut session = MediaSession {
            surface: Arc::clone(&self.surface),
            camera: Some(camera),
            microphone: None,
            analyser: None,
            released: false,
        };

        if let Some(camera) = &session.camera {
            self.surface.attach(camera);
        }

        let ready_timeout = self.config.video_ready_timeout();
        match timeout(ready_timeout, self.surface.play()).await {
            Ok(Ok(())) => debug!("Video surface playing"),
            Ok(Err(e)) => {
                warn!("Video playback failed: {}", e);
                session.release();
                return Err(e);
            }
            Err(_) => {
                warn!("Video surface not ready after {:?}", ready_timeout);
                session.release();
                return Err(MediaError::VideoReadyTimeout(ready_timeout));
            }
        }

        if self.config.capture_audio {
            info!("Requesting microphone");
            let microphone = match self.devices.get_user_media(&StreamRequest::Audio).await {
                Ok(stream) => stream,
                Err(e) => {
                    session.release();
                    return Err(e);
                }
            };
            let analyser = self.devices.create_analyser(&microphone);
            session.microphone = Some(microphone);
            match analyser {
                Ok(analyser) => session.analyser = Some(analyser),
                Err(e) => {
                    session.release();
                    return Err(e);
                }
            }
        }

        info!("Media session acquired ({} live tracks)", session.live_track_count());
        Ok(session)
    }

    /// Check that a device can be opened, then stop it straight away
    pub async fn probe(&self, request: &StreamRequest) -> Result<(), MediaError> {
        let stream = self.devices.get_user_media(request).await?;
        stream.stop_all();
        Ok(())
    }
}

/// Streams and the audio graph owned by one proctoring session
pub struct MediaSession {
    surface: Arc<dyn VideoSurface>,
    camera: Option<MediaStream>,
    microphone: Option<MediaStream>,
    analyser: Option<Box<dyn AudioAnalyser>>,
    released: bool,
}

impl MediaSession {
    /// Stop every track and detach the surface. Safe to call repeatedly.
    pub fn release(&mut self) {
        if self.released {
            debug!("Media session already released");
            return;
        }
        self.released = true;

        if let Some(analyser) = self.analyser.take() {
            analyser.close();
        }
        if let Some(microphone) = self.microphone.take() {
            microphone.stop_all();
        }
        if let Some(camera) = self.camera.take() {
            camera.stop_all();
        }
        self.surface.detach();
        info!("Media session released");
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Live tracks across the camera and microphone streams
    pub fn live_track_count(&self) -> usize {
        self.camera.iter().chain(self.microphone.iter()).map(|s| s.live_track_count()).sum()
    }

    /// Grab the current frame, or `None` when the surface has no decoded data yet
    pub fn capture_frame(&self) -> Option<VideoFrame> {
        if self.released || self.surface.ready_state() < ReadyState::HaveCurrentData {
            return None;
        }
        self.surface.capture_frame()
    }

    /// Audio analyser, when the microphone was acquired
    pub fn analyser(&self) -> Option<&dyn AudioAnalyser> {
        if self.released {
            return None;
        }
        self.analyser.as_deref()
    }

    pub fn surface(&self) -> &Arc<dyn VideoSurface> {
        &self.surface
    }
}

impl Drop for MediaSession {
    fn drop(&mut self) {
        self.release();
    }
}

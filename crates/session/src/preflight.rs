//! Pre-exam compatibility check: camera, microphone, and network

use async_trait::async_trait;
use media_capture::{MediaAcquirer, MediaDevices, StreamRequest, VideoSurface};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::{ProctorConfig, SessionConfig};
use crate::SessionError;

/// Result of one check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Failed(String),
}

impl CheckStatus {
    pub fn passed(&self) -> bool {
        matches!(self, CheckStatus::Passed)
    }
}

/// Outcome of the compatibility check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityReport {
    pub camera: CheckStatus,
    pub microphone: CheckStatus,
    pub network: CheckStatus,
    /// Measured round trip, when the probe completed
    pub latency_ms: Option<u64>,
}

impl CompatibilityReport {
    pub fn all_passed(&self) -> bool {
        self.camera.passed() && self.microphone.passed() && self.network.passed()
    }
}

/// Measures a network round trip
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    async fn round_trip(&self) -> Result<Duration, String>;
}

/// Probe timing a GET request
pub struct HttpNetworkProbe {
    client: Client,
    url: String,
}

impl HttpNetworkProbe {
    pub fn new(config: &SessionConfig) -> Result<Self, SessionError> {
        // Give up well after the latency limit so slow links still report a figure
        let client = Client::builder()
            .timeout(config.max_network_latency() * 5)
            .build()
            .map_err(|e| SessionError::Preflight(e.to_string()))?;
        Ok(Self {
            client,
            url: config.network_probe_url.clone(),
        })
    }
}

#[async_trait]
impl NetworkProbe for HttpNetworkProbe {
    async fn round_trip(&self) -> Result<Duration, String> {
        let started = Instant::now();
        self.client
            .get(&self.url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| e.to_string())?;
        Ok(started.elapsed())
    }
}

/// Probe each device by opening and immediately stopping a stream, then
/// time one network round trip.
pub async fn check_compatibility(
    devices: Arc<dyn MediaDevices>,
    surface: Arc<dyn VideoSurface>,
    network: &dyn NetworkProbe,
    config: &ProctorConfig,
) -> CompatibilityReport {
    let acquirer = MediaAcquirer::new(devices, surface, config.media.clone());

    let camera_request = StreamRequest::Video(config.media.video_constraints());
    let camera = match acquirer.probe(&camera_request).await {
        Ok(()) => CheckStatus::Passed,
        Err(e) => CheckStatus::Failed(e.to_string()),
    };
    let microphone = match acquirer.probe(&StreamRequest::Audio).await {
        Ok(()) => CheckStatus::Passed,
        Err(e) => CheckStatus::Failed(e.to_string()),
    };

    let limit = config.session.max_network_latency();
    let (network, latency_ms) = match network.round_trip().await {
        Ok(latency) if latency <= limit => (CheckStatus::Passed, Some(latency.as_millis() as u64)),
        Ok(latency) => (
            CheckStatus::Failed(format!(
                "latency {} ms exceeds {} ms",
                latency.as_millis(),
                limit.as_millis()
            )),
            Some(latency.as_millis() as u64),
        ),
        Err(e) => (CheckStatus::Failed(e), None),
    };

    let report = CompatibilityReport {
        camera,
        microphone,
        network,
        latency_ms,
    };
    if report.all_passed() {
        info!("Compatibility check passed");
    } else {
        warn!("Compatibility check failed: {:?}", report);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_capture::{
        AudioAnalyser, DeviceKind, MediaError, MediaStream, MediaTrack, ReadyState, TrackKind,
        VideoFrame,
    };
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    struct Track {
        kind: TrackKind,
        live: AtomicBool,
    }

    impl MediaTrack for Track {
        fn id(&self) -> &str {
            "track"
        }
        fn kind(&self) -> TrackKind {
            self.kind
        }
        fn stop(&self) {
            self.live.store(false, Ordering::SeqCst);
        }
        fn is_live(&self) -> bool {
            self.live.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct Devices {
        no_microphone: bool,
        tracks: Mutex<Vec<Arc<Track>>>,
    }

    #[async_trait]
    impl MediaDevices for Devices {
        async fn get_user_media(&self, request: &StreamRequest) -> Result<MediaStream, MediaError> {
            let kind = match request {
                StreamRequest::Video(_) => TrackKind::Video,
                StreamRequest::Audio if self.no_microphone => {
                    return Err(MediaError::NoDevice(DeviceKind::Microphone))
                }
                StreamRequest::Audio => TrackKind::Audio,
            };
            let track = Arc::new(Track {
                kind,
                live: AtomicBool::new(true),
            });
            self.tracks.lock().unwrap().push(Arc::clone(&track));
            Ok(MediaStream::new(vec![track]))
        }

        fn create_analyser(
            &self,
            _stream: &MediaStream,
        ) -> Result<Box<dyn AudioAnalyser>, MediaError> {
            Err(MediaError::Unsupported("no audio graph".into()))
        }
    }

    struct Surface;

    #[async_trait]
    impl VideoSurface for Surface {
        fn attach(&self, _stream: &MediaStream) {}
        fn detach(&self) {}
        async fn play(&self) -> Result<(), MediaError> {
            Ok(())
        }
        fn ready_state(&self) -> ReadyState {
            ReadyState::HaveNothing
        }
        fn capture_frame(&self) -> Option<VideoFrame> {
            None
        }
    }

    struct FixedLatency(Result<Duration, String>);

    #[async_trait]
    impl NetworkProbe for FixedLatency {
        async fn round_trip(&self) -> Result<Duration, String> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_all_checks_pass() {
        let devices = Arc::new(Devices::default());
        let report = check_compatibility(
            devices.clone(),
            Arc::new(Surface),
            &FixedLatency(Ok(Duration::from_millis(120))),
            &ProctorConfig::default(),
        )
        .await;

        assert!(report.all_passed());
        assert_eq!(report.latency_ms, Some(120));
        // Probes must not leave devices open
        assert!(devices.tracks.lock().unwrap().iter().all(|t| !t.is_live()));
    }

    #[tokio::test]
    async fn test_missing_microphone_and_slow_network() {
        let devices = Arc::new(Devices {
            no_microphone: true,
            ..Default::default()
        });
        let report = check_compatibility(
            devices,
            Arc::new(Surface),
            &FixedLatency(Ok(Duration::from_millis(1500))),
            &ProctorConfig::default(),
        )
        .await;

        assert!(report.camera.passed());
        assert!(!report.microphone.passed());
        assert!(!report.network.passed());
        assert_eq!(report.latency_ms, Some(1500));
        assert!(!report.all_passed());
    }

    #[tokio::test]
    async fn test_unreachable_network() {
        let report = check_compatibility(
            Arc::new(Devices::default()),
            Arc::new(Surface),
            &FixedLatency(Err("connection refused".into())),
            &ProctorConfig::default(),
        )
        .await;

        assert_eq!(report.network, CheckStatus::Failed("connection refused".into()));
        assert_eq!(report.latency_ms, None);
    }
}

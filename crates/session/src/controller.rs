//! Session lifecycle driver
//!
//! Initializing -> Ready -> Monitoring -> Terminated, or Failed from any
//! init step. One spawned task owns the media session, the detectors, and
//! the escalation state; the handle talks to it through watch channels and
//! a cancellation token.

use chrono::Utc;
use detection::{FaceDetector, ObjectDetector};
use media_capture::{MediaAcquirer, MediaDevices, VideoSurface};
use reporting::EventReporter;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::ProctorConfig;
use crate::handle::SessionHandle;
use crate::host::{HostPage, Notice, SignalSource};
use crate::monitor::{self, LoopExit, Monitor};
use crate::state::{AutoSubmit, InitFailure, InitPhase, SessionState, Termination};
use crate::telemetry;

/// Reason recorded when the host stops the session
pub const STOPPED_REASON: &str = "Proctoring stopped";

/// Collaborators injected into a session
pub struct SessionPorts {
    pub devices: Arc<dyn MediaDevices>,
    pub surface: Arc<dyn VideoSurface>,
    pub face_detector: Box<dyn FaceDetector>,
    pub object_detector: Box<dyn ObjectDetector>,
    pub signals: Arc<dyn SignalSource>,
    pub reporter: Arc<dyn EventReporter>,
    pub host: Arc<dyn HostPage>,
}

/// Host-controlled start flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartOptions {
    /// When false nothing is acquired and the session stays `Disabled`
    pub enabled: bool,
    /// When false the session waits at `Ready` for `start_monitoring`
    pub auto_start_monitoring: bool,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_start_monitoring: true,
        }
    }
}

/// Entry point for proctoring sessions
pub struct ProctorSession;

impl ProctorSession {
    /// Start a session for `exam_id`. Must be called within a Tokio runtime.
    pub fn start(
        exam_id: impl Into<String>,
        options: StartOptions,
        config: ProctorConfig,
        ports: SessionPorts,
    ) -> SessionHandle {
        let exam_id = exam_id.into();
        let session_id = Uuid::new_v4();
        let surface = Arc::clone(&ports.surface);

        if !options.enabled {
            info!("Proctoring disabled for exam {}", exam_id);
            return SessionHandle::disabled(session_id, exam_id, surface);
        }

        let (state_tx, state_rx) =
            watch::channel(SessionState::Initializing(InitPhase::AcquiringMedia));
        let (warnings_tx, warnings_rx) = watch::channel(0u32);
        let (start_tx, start_rx) = watch::channel(options.auto_start_monitoring);
        let (auto_submit_tx, auto_submit_rx) = oneshot::channel();
        let cancel = CancellationToken::new();

        let driver = Driver {
            exam_id: exam_id.clone(),
            config,
            ports,
            state_tx,
            warnings_tx,
            start_rx,
            auto_submit_tx,
            cancel: cancel.clone(),
        };

        let span = info_span!("proctor_session", session = %session_id, exam = %exam_id);
        let task = tokio::spawn(driver.run().instrument(span));

        SessionHandle {
            session_id,
            exam_id,
            surface,
            state_rx,
            warnings_rx,
            start_tx: Some(start_tx),
            auto_submit_rx: Some(auto_submit_rx),
            cancel,
            task: Some(task),
        }
    }
}

struct Driver {
    exam_id: String,
    config: ProctorConfig,
    ports: SessionPorts,
    state_tx: watch::Sender<SessionState>,
    warnings_tx: watch::Sender<u32>,
    start_rx: watch::Receiver<bool>,
    auto_submit_tx: oneshot::Sender<AutoSubmit>,
    cancel: CancellationToken,
}

impl Driver {
    async fn run(self) {
        let Driver {
            exam_id,
            config,
            ports,
            state_tx,
            warnings_tx,
            mut start_rx,
            auto_submit_tx,
            cancel,
        } = self;
        let SessionPorts {
            devices,
            surface,
            mut face_detector,
            mut object_detector,
            signals,
            reporter,
            host,
        } = ports;

        info!("Initializing proctoring");
        let acquirer = MediaAcquirer::new(devices, surface, config.media.clone());
        let mut media = match until_cancelled(&cancel, acquirer.acquire()).await {
            None => return stopped(&state_tx),
            Some(Err(e)) => {
                let failure = InitFailure::from(&e);
                return fail(failure, &exam_id, host.as_ref(), &state_tx, &cancel, &config).await;
            }
            Some(Ok(media)) => media,
        };

        set_state(&state_tx, SessionState::Initializing(InitPhase::LoadingModels));
        let loaded = until_cancelled(&cancel, async {
            tokio::try_join!(face_detector.load(), object_detector.load())
        })
        .await;
        match loaded {
            None => {
                media.release();
                return stopped(&state_tx);
            }
            Some(Err(e)) => {
                media.release();
                let failure = InitFailure::from(&e);
                return fail(failure, &exam_id, host.as_ref(), &state_tx, &cancel, &config).await;
            }
            Some(Ok(_)) => info!(
                "Models loaded ({}, {})",
                face_detector.name(),
                object_detector.name()
            ),
        }

        set_state(&state_tx, SessionState::Ready);
        if !*start_rx.borrow() {
            info!("Proctoring ready, waiting for monitoring start");
        }
        let started = until_cancelled(&cancel, async {
            start_rx.wait_for(|start| *start).await.is_ok()
        })
        .await;
        if started != Some(true) {
            media.release();
            return stopped(&state_tx);
        }

        set_state(&state_tx, SessionState::Monitoring);
        let (signal_tx, mut signal_rx) = mpsc::unbounded_channel();
        signals.attach(signal_tx);

        let mut monitor = Monitor::new(
            exam_id,
            &config,
            face_detector,
            object_detector,
            reporter,
            Arc::clone(&host),
            warnings_tx,
        );
        let exit = monitor::run(&mut monitor, &media, &mut signal_rx, &cancel, &config).await;

        signals.detach();
        signal_rx.close();
        media.release();

        match exit {
            LoopExit::Cancelled => stopped(&state_tx),
            LoopExit::Threshold(reason) => {
                let warnings = monitor.warnings();
                host.notify(Notice::error(reason.clone()));
                set_state(
                    &state_tx,
                    SessionState::Terminated(Termination {
                        reason: reason.clone(),
                        auto_submitted: true,
                    }),
                );
                telemetry::record_termination("threshold");

                let signal = AutoSubmit {
                    reason,
                    warnings,
                    terminated_at: Utc::now(),
                };
                if auto_submit_tx.send(signal).is_err() {
                    warn!("Auto-submit signal had no receiver");
                }
            }
        }
    }
}

/// Run `fut` unless `cancel` fires first
async fn until_cancelled<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = fut => Some(output),
    }
}

fn set_state(state_tx: &watch::Sender<SessionState>, state: SessionState) {
    debug!("Session state -> {}", state.name());
    state_tx.send_replace(state);
}

fn stopped(state_tx: &watch::Sender<SessionState>) {
    info!("{}", STOPPED_REASON);
    set_state(
        state_tx,
        SessionState::Terminated(Termination {
            reason: STOPPED_REASON.to_string(),
            auto_submitted: false,
        }),
    );
    telemetry::record_termination("stopped");
}

/// Surface an init failure, then send the candidate back to the
/// instructions page unless the session is stopped first.
async fn fail(
    failure: InitFailure,
    exam_id: &str,
    host: &dyn HostPage,
    state_tx: &watch::Sender<SessionState>,
    cancel: &CancellationToken,
    config: &ProctorConfig,
) {
    error!("Proctoring initialization failed: {}", failure);
    host.notify(Notice::error(failure.message.clone()));
    set_state(state_tx, SessionState::Failed(failure));
    telemetry::record_termination("init_failure");

    if until_cancelled(cancel, sleep(config.session.redirect_delay())).await.is_some() {
        info!("Redirecting to instructions for exam {}", exam_id);
        host.redirect_to_instructions(exam_id);
    }
}

//! Monitoring loop: detection ticks, audio samples, and DOM signals

use audio_level::AudioLevelMonitor;
use detection::{FaceDetector, ObjectDetector};
use escalation::{AcceptedWarning, EscalationOutcome, EscalationStateMachine};
use media_capture::MediaSession;
use reporting::{spawn_report, EventReporter, ProctorEventReport};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use violations::{
    evaluate_audio, evaluate_frame, evaluate_signal, BrowserSignal, EvaluatorConfig, Finding,
    FrameObservation,
    SignalVerdict,
};

use crate::config::ProctorConfig;
use crate::host::{HostPage, Notice};
use crate::telemetry;

/// Why the loop returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LoopExit {
    Cancelled,
    /// Warning threshold reached, with the termination reason
    Threshold(String),
}

/// Per-session evaluation state driven by the loop
pub(crate) struct Monitor {
    exam_id: String,
    evaluator: EvaluatorConfig,
    escalation: EscalationStateMachine,
    audio: AudioLevelMonitor,
    face_detector: Box<dyn FaceDetector>,
    object_detector: Box<dyn ObjectDetector>,
    reporter: Arc<dyn EventReporter>,
    host: Arc<dyn HostPage>,
    warnings_tx: watch::Sender<u32>,
}

impl Monitor {
    pub(crate) fn new(
        exam_id: String,
        config: &ProctorConfig,
        face_detector: Box<dyn FaceDetector>,
        object_detector: Box<dyn ObjectDetector>,
        reporter: Arc<dyn EventReporter>,
        host: Arc<dyn HostPage>,
        warnings_tx: watch::Sender<u32>,
    ) -> Self {
        Self {
            exam_id,
            evaluator: config.evaluator.clone(),
            escalation: EscalationStateMachine::new(config.escalation.clone()),
            audio: AudioLevelMonitor::new(config.audio.clone()),
            face_detector,
            object_detector,
            reporter,
            host,
            warnings_tx,
        }
    }

    pub(crate) fn warnings(&self) -> u32 {
        self.escalation.warnings()
    }

    /// Run both detectors on the current frame and escalate what they find.
    ///
    /// A frame that is not ready or a face inference error skips the tick.
    /// An object inference error only drops the object rule for this tick.
    pub(crate) async fn poll_frame(&mut self, media: &MediaSession) -> Option<String> {
        let Some(frame) = media.capture_frame() else {
            debug!("Video not ready, skipping tick");
            telemetry::record_skipped_tick();
            return None;
        };

        let faces = match self.face_detector.detect_faces(&frame).await {
            Ok(faces) => faces,
            Err(e) => {
                warn!("Face detection failed on frame {}: {}", frame.sequence, e);
                telemetry::record_inference_error();
                return None;
            }
        };

        let objects = match self.object_detector.detect_objects(&frame).await {
            Ok(objects) => Some(objects),
            Err(e) => {
                warn!("Object detection failed on frame {}: {}", frame.sequence, e);
                telemetry::record_inference_error();
                None
            }
        };

        let observation = FrameObservation {
            frame_width: frame.width,
            faces: &faces,
            objects: objects.as_deref(),
        };
        let findings = evaluate_frame(&observation, &self.evaluator);
        debug!(
            "Frame {}: {} faces, {} findings",
            frame.sequence,
            faces.len(),
            findings.len()
        );

        findings.into_iter().find_map(|finding| self.escalate(finding))
    }

    /// Sample the microphone once
    pub(crate) fn poll_audio(&mut self, media: &MediaSession) -> Option<String> {
        let samples = media.analyser()?.time_domain_data();
        let event = self.audio.observe_samples(&samples)?;
        self.escalate(evaluate_audio(&event))
    }

    pub(crate) fn handle_signal(&mut self, signal: &BrowserSignal) -> Option<String> {
        match evaluate_signal(signal, &self.evaluator) {
            SignalVerdict::Violation(finding) => self.escalate(finding),
            SignalVerdict::Notice(message) => {
                self.host.notify(Notice::info(message));
                None
            }
            SignalVerdict::Ignored => None,
        }
    }

    /// Submit one finding; returns the termination reason when it ends the session
    fn escalate(&mut self, finding: Finding) -> Option<String> {
        telemetry::record_violation(finding.violation);

        match self.escalation.on_violation(finding.violation, Instant::now().into_std()) {
            EscalationOutcome::Debounced | EscalationOutcome::Inactive => None,
            EscalationOutcome::Warned(warning) => {
                self.accept(&finding, &warning);
                None
            }
            EscalationOutcome::Terminated { warning, reason } => {
                self.accept(&finding, &warning);
                Some(reason)
            }
        }
    }

    fn accept(&self, finding: &Finding, warning: &AcceptedWarning) {
        spawn_report(
            Arc::clone(&self.reporter),
            ProctorEventReport::new(self.exam_id.clone(), warning),
        );
        self.host.notify(Notice::warning(format!(
            "{} (Warning {}/{})",
            finding.message,
            warning.warnings,
            self.escalation.config().warning_threshold
        )));
        self.warnings_tx.send_replace(warning.warnings);
        telemetry::record_accepted(warning);
    }
}

/// Drive the monitor until cancelled or terminated.
///
/// Each branch runs to completion before the next is polled, so detection
/// ticks never overlap. Late ticks are skipped rather than queued.
pub(crate) async fn run(
    monitor: &mut Monitor,
    media: &MediaSession,
    signals: &mut mpsc::UnboundedReceiver<BrowserSignal>,
    cancel: &CancellationToken,
    config: &ProctorConfig,
) -> LoopExit {
    let poll_interval = config.session.poll_interval();
    let mut poll = interval(poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut audio_tick = interval(config.audio.sample_interval());
    audio_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let audio_enabled = config.session.monitor_audio && media.analyser().is_some();

    loop {
        let termination = tokio::select! {
            biased;

            _ = cancel.cancelled() => return LoopExit::Cancelled,

            Some(signal) = signals.recv() => monitor.handle_signal(&signal),

            _ = poll.tick() => {
                let started = Instant::now();
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return LoopExit::Cancelled,
                    result = monitor.poll_frame(media) => result,
                };
                if started.elapsed() > poll_interval {
                    warn!("Detection tick took {:?}, next tick skipped", started.elapsed());
                    telemetry::record_skipped_tick();
                }
                result
            }

            _ = audio_tick.tick(), if audio_enabled => monitor.poll_audio(media),
        };

        if let Some(reason) = termination {
            return LoopExit::Threshold(reason);
        }
    }
}

#![allow(dead_code)]

use async_trait::async_trait;
use detection::{
    BoundingBox, DetectedObject, DetectionError, Face, FaceDetector, ObjectDetector, Point,
};
use media_capture::{
    AudioAnalyser, MediaDevices, MediaError, MediaStream, MediaTrack, ReadyState, StreamRequest,
    TrackKind, VideoFrame, VideoSurface,
};
use reporting::{EventReporter, ProctorEventReport, ReportError};
use session::{HostPage, Notice, SessionHandle, SessionPorts, SessionState, SignalSource};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use violations::BrowserSignal;

pub const FRAME_WIDTH: u32 = 640;
pub const FRAME_HEIGHT: u32 = 480;

/// A single, centered, well-sized face looking at the screen
pub fn centered_face() -> Face {
    Face::new(BoundingBox::new(220.0, 100.0, 200.0, 200.0), 0.95).with_landmarks(vec![
        Point::new(290.0, 160.0),
        Point::new(350.0, 160.0),
        Point::new(320.0, 200.0),
    ])
}

pub fn object(label: &str, confidence: f32) -> DetectedObject {
    DetectedObject {
        label: label.to_string(),
        confidence,
        bbox: BoundingBox::new(10.0, 10.0, 50.0, 80.0),
    }
}

// --- media ---

pub struct FakeTrack {
    kind: TrackKind,
    live: AtomicBool,
}

impl MediaTrack for FakeTrack {
    fn id(&self) -> &str {
        "fake-track"
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

struct ConstantAnalyser {
    amplitude: f32,
}

impl AudioAnalyser for ConstantAnalyser {
    fn time_domain_data(&self) -> Vec<f32> {
        vec![self.amplitude; 256]
    }
    fn close(&self) {}
}

#[derive(Default)]
pub struct FakeDevices {
    pub camera_error: Mutex<Option<MediaError>>,
    pub amplitude: Mutex<f32>,
    tracks: Mutex<Vec<Arc<FakeTrack>>>,
}

impl FakeDevices {
    pub fn requested(&self) -> usize {
        self.tracks.lock().unwrap().len()
    }

    pub fn live(&self) -> usize {
        self.tracks.lock().unwrap().iter().filter(|t| t.is_live()).count()
    }
}

#[async_trait]
impl MediaDevices for FakeDevices {
    async fn get_user_media(&self, request: &StreamRequest) -> Result<MediaStream, MediaError> {
        let kind = match request {
            StreamRequest::Video(_) => {
                if let Some(err) = self.camera_error.lock().unwrap().clone() {
                    return Err(err);
                }
                TrackKind::Video
            }
            StreamRequest::Audio => TrackKind::Audio,
        };
        let track = Arc::new(FakeTrack {
            kind,
            live: AtomicBool::new(true),
        });
        self.tracks.lock().unwrap().push(Arc::clone(&track));
        Ok(MediaStream::new(vec![track]))
    }

    fn create_analyser(&self, _stream: &MediaStream) -> Result<Box<dyn AudioAnalyser>, MediaError> {
        Ok(Box::new(ConstantAnalyser {
            amplitude: *self.amplitude.lock().unwrap(),
        }))
    }
}

pub struct FakeSurface {
    pub ready: AtomicBool,
    pub attached: AtomicBool,
    sequence: AtomicU32,
}

impl Default for FakeSurface {
    fn default() -> Self {
        Self {
            ready: AtomicBool::new(true),
            attached: AtomicBool::new(false),
            sequence: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl VideoSurface for FakeSurface {
    fn attach(&self, _stream: &MediaStream) {
        self.attached.store(true, Ordering::SeqCst);
    }
    fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }
    async fn play(&self) -> Result<(), MediaError> {
        Ok(())
    }
    fn ready_state(&self) -> ReadyState {
        if self.ready.load(Ordering::SeqCst) {
            ReadyState::HaveEnoughData
        } else {
            ReadyState::HaveMetadata
        }
    }
    fn capture_frame(&self) -> Option<VideoFrame> {
        let mut frame = VideoFrame::filled(FRAME_WIDTH, FRAME_HEIGHT, [90, 90, 90]);
        frame.sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        Some(frame)
    }
}

// --- detection ---

/// What the detectors "see"
pub struct Scene {
    pub faces: Mutex<Vec<Face>>,
    pub objects: Mutex<Vec<DetectedObject>>,
    pub fail_face_load: AtomicBool,
    pub face_failures_left: AtomicU32,
    pub face_calls: AtomicUsize,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            faces: Mutex::new(vec![centered_face()]),
            objects: Mutex::new(Vec::new()),
            fail_face_load: AtomicBool::new(false),
            face_failures_left: AtomicU32::new(0),
            face_calls: AtomicUsize::new(0),
        }
    }
}

impl Scene {
    pub fn set_faces(&self, faces: Vec<Face>) {
        *self.faces.lock().unwrap() = faces;
    }

    pub fn set_objects(&self, objects: Vec<DetectedObject>) {
        *self.objects.lock().unwrap() = objects;
    }
}

struct SceneFaceDetector {
    scene: Arc<Scene>,
    loaded: bool,
}

#[async_trait]
impl FaceDetector for SceneFaceDetector {
    fn name(&self) -> &str {
        "scene-face"
    }
    async fn load(&mut self) -> Result<(), DetectionError> {
        if self.scene.fail_face_load.load(Ordering::SeqCst) {
            return Err(DetectionError::ModelLoad("weights not found".into()));
        }
        self.loaded = true;
        Ok(())
    }
    fn is_loaded(&self) -> bool {
        self.loaded
    }
    async fn detect_faces(&self, _frame: &VideoFrame) -> Result<Vec<Face>, DetectionError> {
        self.scene.face_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .scene
            .face_failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DetectionError::Inference("backend lost".into()));
        }
        Ok(self.scene.faces.lock().unwrap().clone())
    }
}

struct SceneObjectDetector {
    scene: Arc<Scene>,
    loaded: bool,
}

#[async_trait]
impl ObjectDetector for SceneObjectDetector {
    fn name(&self) -> &str {
        "scene-object"
    }
    async fn load(&mut self) -> Result<(), DetectionError> {
        self.loaded = true;
        Ok(())
    }
    fn is_loaded(&self) -> bool {
        self.loaded
    }
    async fn detect_objects(
        &self,
        _frame: &VideoFrame,
    ) -> Result<Vec<DetectedObject>, DetectionError> {
        Ok(self.scene.objects.lock().unwrap().clone())
    }
}

// --- host ---

#[derive(Default)]
pub struct FakeSignals {
    sender: Mutex<Option<mpsc::UnboundedSender<BrowserSignal>>>,
}

impl FakeSignals {
    pub fn is_attached(&self) -> bool {
        self.sender.lock().unwrap().is_some()
    }

    /// Deliver a signal; false when no listener is attached
    pub fn emit(&self, signal: BrowserSignal) -> bool {
        match self.sender.lock().unwrap().as_ref() {
            Some(sender) => sender.send(signal).is_ok(),
            None => false,
        }
    }
}

impl SignalSource for FakeSignals {
    fn attach(&self, sender: mpsc::UnboundedSender<BrowserSignal>) {
        *self.sender.lock().unwrap() = Some(sender);
    }
    fn detach(&self) {
        self.sender.lock().unwrap().take();
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    pub fail: AtomicBool,
    pub reports: Mutex<Vec<ProctorEventReport>>,
}

impl RecordingReporter {
    pub fn types(&self) -> Vec<&'static str> {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.proctor_event.kind.as_str())
            .collect()
    }
}

#[async_trait]
impl EventReporter for RecordingReporter {
    async fn report(&self, report: &ProctorEventReport) -> Result<(), ReportError> {
        self.reports.lock().unwrap().push(report.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(ReportError::Status(503));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingHost {
    pub notices: Mutex<Vec<Notice>>,
    pub redirects: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn messages(&self) -> Vec<String> {
        self.notices.lock().unwrap().iter().map(|n| n.message.clone()).collect()
    }
}

impl HostPage for RecordingHost {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
    fn redirect_to_instructions(&self, exam_id: &str) {
        self.redirects.lock().unwrap().push(exam_id.to_string());
    }
}

// --- fixture ---

#[derive(Default)]
pub struct Fixture {
    pub devices: Arc<FakeDevices>,
    pub surface: Arc<FakeSurface>,
    pub scene: Arc<Scene>,
    pub signals: Arc<FakeSignals>,
    pub reporter: Arc<RecordingReporter>,
    pub host: Arc<RecordingHost>,
}

impl Fixture {
    pub fn ports(&self) -> SessionPorts {
        SessionPorts {
            devices: self.devices.clone(),
            surface: self.surface.clone(),
            face_detector: Box::new(SceneFaceDetector {
                scene: Arc::clone(&self.scene),
                loaded: false,
            }),
            object_detector: Box::new(SceneObjectDetector {
                scene: Arc::clone(&self.scene),
                loaded: false,
            }),
            signals: self.signals.clone(),
            reporter: self.reporter.clone(),
            host: self.host.clone(),
        }
    }
}

/// Wait until the session state satisfies `pred`
pub async fn wait_for_state(
    handle: &SessionHandle,
    pred: impl FnMut(&SessionState) -> bool,
) -> SessionState {
    let mut state_rx = handle.subscribe_state();
    let state = state_rx.wait_for(pred).await.map(|s| s.clone());
    state.unwrap_or_else(|_| handle.state())
}

/// Let spawned report tasks run
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

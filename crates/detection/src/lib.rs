//! Inference Engines for Exam Proctoring
//!
//! Two independent capabilities behind a uniform shape:
//! - Face detection with optional landmarks
//! - General object detection with class labels
//!
//! Callers depend only on [`FaceDetector`] and [`ObjectDetector`], so an
//! alternate backend can be swapped in without touching violation rules.

pub mod config;
pub mod face;
pub mod labels;
pub mod nms;
pub mod object;
pub mod onnx;
pub mod types;

pub use config::{ConfigError, DetectionConfig, ModelSpec, Normalization};
pub use face::OnnxFaceDetector;
pub use object::OnnxObjectDetector;
pub use types::{BoundingBox, DetectedObject, Face, Point};

use async_trait::async_trait;
use media_capture::VideoFrame;
use thiserror::Error;

/// Detection error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Model not loaded")]
    NotLoaded,

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),
}

/// Face detection capability
#[async_trait]
pub trait FaceDetector: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Load the model. Loading twice is a no-op.
    async fn load(&mut self) -> Result<(), DetectionError>;

    fn is_loaded(&self) -> bool;

    /// Detect faces in a frame
    async fn detect_faces(&self, frame: &VideoFrame) -> Result<Vec<Face>, DetectionError>;
}

/// Object detection capability
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Load the model. Loading twice is a no-op.
    async fn load(&mut self) -> Result<(), DetectionError>;

    fn is_loaded(&self) -> bool;

    /// Detect labelled objects in a frame
    async fn detect_objects(
        &self,
        frame: &VideoFrame,
    ) -> Result<Vec<DetectedObject>, DetectionError>;
}

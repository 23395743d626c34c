//! Detection configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Detection configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be within [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f32 },

    #[error("max_faces must be at least 2 so multiple faces can be seen, got {0}")]
    FaceLimitTooLow(usize),

    #[error("max_objects must be at least 1")]
    NoObjectLimit,

    #[error("{0} input_size must be > 0")]
    EmptyInput(&'static str),
}

/// Pixel normalization applied before inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// 0..255 → 0.0..1.0
    ZeroToOne,
    /// 0..255 → -1.0..1.0 (BlazeFace)
    MinusOneToOne,
}

impl Normalization {
    pub fn apply(&self, value: u8) -> f32 {
        match self {
            Normalization::ZeroToOne => value as f32 / 255.0,
            Normalization::MinusOneToOne => (value as f32 / 127.5) - 1.0,
        }
    }
}

/// One ONNX model and its input expectations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Path to the .onnx file
    pub path: Option<String>,
    /// Square input side in pixels (NCHW, 3 channels)
    pub input_size: u32,
    pub normalization: Normalization,
}

/// Detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Face model (BlazeFace-style outputs)
    pub face_model: ModelSpec,

    /// Object model (SSD-style outputs, COCO classes)
    pub object_model: ModelSpec,

    /// Minimum face score kept after decoding
    pub face_confidence: f32,

    /// Minimum object score kept after decoding
    pub object_confidence: f32,

    /// IoU above which overlapping detections are suppressed
    pub nms_iou_threshold: f32,

    /// Upper bound on faces returned per frame
    pub max_faces: usize,

    /// Upper bound on objects returned per frame
    pub max_objects: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            face_model: ModelSpec {
                path: None,
                input_size: 128,
                normalization: Normalization::MinusOneToOne,
            },
            object_model: ModelSpec {
                path: None,
                input_size: 300,
                normalization: Normalization::ZeroToOne,
            },
            face_confidence: 0.75,
            object_confidence: 0.3,
            nms_iou_threshold: 0.3,
            max_faces: 10,
            max_objects: 20,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("face_confidence", self.face_confidence),
            ("object_confidence", self.object_confidence),
            ("nms_iou_threshold", self.nms_iou_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange { field, value });
            }
        }
        if self.max_faces < 2 {
            return Err(ConfigError::FaceLimitTooLow(self.max_faces));
        }
        if self.max_objects == 0 {
            return Err(ConfigError::NoObjectLimit);
        }
        if self.face_model.input_size == 0 {
            return Err(ConfigError::EmptyInput("face_model"));
        }
        if self.object_model.input_size == 0 {
            return Err(ConfigError::EmptyInput("object_model"));
        }
        Ok(())
    }
}

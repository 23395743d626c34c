//! ONNX face detector (BlazeFace-style outputs)
//!
//! Expected outputs, all coordinates normalized to 0..1:
//! 0. boxes `[1, N, 4]` as (x1, y1, x2, y2)
//! 1. scores `[1, N]` or `[1, N, 1]`, already passed through a sigmoid
//! 2. optional landmarks `[1, N, 2K]` as interleaved (x, y)

use async_trait::async_trait;
use media_capture::VideoFrame;
use tracing::{debug, info, warn};

use crate::config::{DetectionConfig, ModelSpec};
use crate::nms::{non_max_suppression, Candidate};
use crate::onnx::{ModelOutput, OnnxModel};
use crate::types::{BoundingBox, Face, Point};
use crate::{DetectionError, FaceDetector};

/// Face detector backed by an ONNX model
pub struct OnnxFaceDetector {
    spec: ModelSpec,
    confidence_threshold: f32,
    iou_threshold: f32,
    max_faces: usize,
    model: Option<OnnxModel>,
}

impl OnnxFaceDetector {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            spec: config.face_model.clone(),
            confidence_threshold: config.face_confidence,
            iou_threshold: config.nms_iou_threshold,
            max_faces: config.max_faces,
            model: None,
        }
    }

    /// Turn raw model outputs into faces in frame pixel coordinates
    pub fn decode(
        &self,
        outputs: &[ModelOutput],
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Vec<Face>, DetectionError> {
        let (boxes, scores) = match outputs {
            [boxes, scores, ..] => (boxes, scores),
            _ => {
                return Err(DetectionError::Inference(format!(
                    "face model returned {} outputs, expected at least 2",
                    outputs.len()
                )))
            }
        };
        let landmarks = outputs.get(2);
        let (w, h) = (frame_width as f32, frame_height as f32);

        let mut candidates = Vec::new();
        for i in 0..boxes.rows() {
            let score = match scores.row(i).and_then(|r| r.first()) {
                Some(&s) => s,
                None => break,
            };
            if score < self.confidence_threshold {
                continue;
            }
            let Some(&[x1, y1, x2, y2, ..]) = boxes.row(i) else {
                continue;
            };

            let points = landmarks
                .and_then(|l| l.row(i))
                .map(|row| row.chunks_exact(2).map(|p| Point::new(p[0] * w, p[1] * h)).collect())
                .unwrap_or_default();

            candidates.push(Candidate {
                bbox: BoundingBox::from_corners(x1 * w, y1 * h, x2 * w, y2 * h),
                score,
                payload: points,
            });
        }

        Ok(non_max_suppression(candidates, self.iou_threshold, self.max_faces)
            .into_iter()
            .map(|c| Face::new(c.bbox, c.score).with_landmarks(c.payload))
            .collect())
    }
}

#[async_trait]
impl FaceDetector for OnnxFaceDetector {
    fn name(&self) -> &str {
        "onnx-face"
    }

    async fn load(&mut self) -> Result<(), DetectionError> {
        if self.model.is_some() {
            debug!("Face model already loaded");
            return Ok(());
        }
        match OnnxModel::load(&self.spec).await {
            Ok(model) => {
                info!("Face model loaded");
                self.model = Some(model);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load face model: {}", e);
                Err(e)
            }
        }
    }

    fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    async fn detect_faces(&self, frame: &VideoFrame) -> Result<Vec<Face>, DetectionError> {
        let model = self.model.as_ref().ok_or(DetectionError::NotLoaded)?;
        let outputs = model.run(frame).await?;
        self.decode(&outputs, frame.width, frame.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> OnnxFaceDetector {
        OnnxFaceDetector::new(&DetectionConfig::default())
    }

    #[test]
    fn test_decode_scales_and_filters() {
        let boxes = ModelOutput::new(
            vec![1, 3, 4],
            vec![
                0.25, 0.25, 0.75, 0.75, // strong face
                0.26, 0.26, 0.74, 0.74, // duplicate of the first
                0.0, 0.0, 0.1, 0.1, // weak
            ],
        );
        let scores = ModelOutput::new(vec![1, 3], vec![0.95, 0.9, 0.2]);
        let landmarks = ModelOutput::new(
            vec![1, 3, 6],
            vec![
                0.4, 0.4, 0.6, 0.4, 0.5, 0.5, //
                0.4, 0.4, 0.6, 0.4, 0.5, 0.5, //
                0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            ],
        );

        let faces = detector().decode(&[boxes, scores, landmarks], 640, 480).unwrap();
        assert_eq!(faces.len(), 1);
        let face = &faces[0];
        assert_eq!(face.bbox, BoundingBox::new(160.0, 120.0, 320.0, 240.0));
        assert_eq!(face.nose(), Some(Point::new(320.0, 240.0)));
    }

    #[test]
    fn test_decode_without_landmarks() {
        let boxes = ModelOutput::new(vec![1, 1, 4], vec![0.0, 0.0, 0.5, 0.5]);
        let scores = ModelOutput::new(vec![1, 1, 1], vec![0.99]);
        let faces = detector().decode(&[boxes, scores], 100, 100).unwrap();
        assert_eq!(faces.len(), 1);
        assert!(faces[0].landmarks.is_empty());
    }

    #[test]
    fn test_decode_rejects_missing_outputs() {
        let boxes = ModelOutput::new(vec![1, 1, 4], vec![0.0; 4]);
        assert!(detector().decode(&[boxes], 100, 100).is_err());
    }

    #[tokio::test]
    async fn test_detect_before_load() {
        let det = detector();
        let frame = VideoFrame::filled(8, 8, [0, 0, 0]);
        assert_eq!(det.detect_faces(&frame).await, Err(DetectionError::NotLoaded));
    }
}

//! ONNX object detector (SSD-style outputs, COCO classes)
//!
//! Expected outputs:
//! 0. boxes `[1, N, 4]` normalized as (ymin, xmin, ymax, xmax)
//! 1. class indices `[1, N]` into [`COCO_LABELS`](crate::labels::COCO_LABELS)
//! 2. scores `[1, N]`

use async_trait::async_trait;
use media_capture::VideoFrame;
use tracing::{debug, info, warn};

use crate::config::{DetectionConfig, ModelSpec};
use crate::labels::coco_label;
use crate::nms::{non_max_suppression, Candidate};
use crate::onnx::{ModelOutput, OnnxModel};
use crate::types::{BoundingBox, DetectedObject};
use crate::{DetectionError, ObjectDetector};

/// Object detector backed by an ONNX model
pub struct OnnxObjectDetector {
    spec: ModelSpec,
    confidence_threshold: f32,
    iou_threshold: f32,
    max_objects: usize,
    model: Option<OnnxModel>,
}

impl OnnxObjectDetector {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            spec: config.object_model.clone(),
            confidence_threshold: config.object_confidence,
            iou_threshold: config.nms_iou_threshold,
            max_objects: config.max_objects,
            model: None,
        }
    }

    /// Turn raw model outputs into labelled objects in frame pixel coordinates.
    /// Suppression runs per class so a phone lying on a book is kept.
    pub fn decode(
        &self,
        outputs: &[ModelOutput],
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Vec<DetectedObject>, DetectionError> {
        let [boxes, classes, scores, ..] = outputs else {
            return Err(DetectionError::Inference(format!(
                "object model returned {} outputs, expected 3",
                outputs.len()
            )));
        };
        let (w, h) = (frame_width as f32, frame_height as f32);

        let mut candidates = Vec::new();
        for i in 0..boxes.rows() {
            let (Some(&score), Some(&class)) = (
                scores.row(i).and_then(|r| r.first()),
                classes.row(i).and_then(|r| r.first()),
            ) else {
                break;
            };
            if score < self.confidence_threshold || class < 0.0 {
                continue;
            }
            let Some(label) = coco_label(class as usize) else {
                debug!("Skipping unknown class index {}", class);
                continue;
            };
            let Some(&[ymin, xmin, ymax, xmax, ..]) = boxes.row(i) else {
                continue;
            };

            candidates.push(Candidate {
                bbox: BoundingBox::from_corners(xmin * w, ymin * h, xmax * w, ymax * h),
                score,
                payload: label,
            });
        }

        let mut labels: Vec<&str> = candidates.iter().map(|c| c.payload).collect();
        labels.sort_unstable();
        labels.dedup();

        let mut objects: Vec<DetectedObject> = labels
            .into_iter()
            .flat_map(|label| {
                let same_class =
                    candidates.iter().filter(|c| c.payload == label).cloned().collect();
                non_max_suppression(same_class, self.iou_threshold, self.max_objects)
            })
            .map(|c| DetectedObject {
                label: c.payload.to_string(),
                confidence: c.score,
                bbox: c.bbox,
            })
            .collect();

        objects.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        objects.truncate(self.max_objects);
        Ok(objects)
    }
}

#[async_trait]
impl ObjectDetector for OnnxObjectDetector {
    fn name(&self) -> &str {
        "onnx-object"
    }

    async fn load(&mut self) -> Result<(), DetectionError> {
        if self.model.is_some() {
            debug!("Object model already loaded");
            return Ok(());
        }
        match OnnxModel::load(&self.spec).await {
            Ok(model) => {
                info!("Object model loaded");
                self.model = Some(model);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load object model: {}", e);
                Err(e)
            }
        }
    }

    fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    async fn detect_objects(
        &self,
        frame: &VideoFrame,
    ) -> Result<Vec<DetectedObject>, DetectionError> {
        let model = self.model.as_ref().ok_or(DetectionError::NotLoaded)?;
        let outputs = model.run(frame).await?;
        self.decode(&outputs, frame.width, frame.height)
    }
}

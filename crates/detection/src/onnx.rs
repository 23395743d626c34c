//! ONNX model wrapper (tract)
//!
//! Loading and inference both run on the blocking pool so the async
//! session loop is never stalled by model work.

use image::imageops::{self, FilterType};
use media_capture::VideoFrame;
use std::sync::Arc;
use tracing::{debug, info};
use tract_onnx::prelude::*;

use crate::config::ModelSpec;
use crate::DetectionError;

type Plan = TypedRunnableModel<TypedModel>;

/// One output tensor flattened to f32
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl ModelOutput {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { shape, data }
    }

    /// Number of rows when viewed as `[1, rows, width]` or `[1, rows]`
    pub fn rows(&self) -> usize {
        match self.shape.as_slice() {
            [_, rows, ..] => *rows,
            [rows] => *rows,
            _ => 0,
        }
    }

    /// Values per row
    pub fn row_width(&self) -> usize {
        let rows = self.rows();
        if rows == 0 {
            0
        } else {
            self.data.len() / rows
        }
    }

    /// Borrow one row
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let width = self.row_width();
        let start = index.checked_mul(width)?;
        self.data.get(start..start + width)
    }
}

/// A loaded, optimized ONNX model
pub struct OnnxModel {
    spec: ModelSpec,
    plan: Arc<Plan>,
}

impl OnnxModel {
    /// Load and optimize the model described by `spec`
    pub async fn load(spec: &ModelSpec) -> Result<Self, DetectionError> {
        let path = spec
            .path
            .clone()
            .ok_or_else(|| DetectionError::ModelLoad("no model path configured".to_string()))?;
        let size = spec.input_size as usize;

        info!("Loading ONNX model from {}", path);
        let plan = tokio::task::spawn_blocking(move || -> TractResult<Plan> {
            tract_onnx::onnx()
                .model_for_path(&path)?
                .with_input_fact(0, f32::fact([1, 3, size, size]).into())?
                .into_optimized()?
                .into_runnable()
        })
        .await
        .map_err(|e| DetectionError::ModelLoad(e.to_string()))?
        .map_err(|e| DetectionError::ModelLoad(e.to_string()))?;

        Ok(Self {
            spec: spec.clone(),
            plan: Arc::new(plan),
        })
    }

    /// Resize and normalize a frame into a 1x3xSxS tensor
    pub fn preprocess(&self, frame: &VideoFrame) -> Result<Tensor, DetectionError> {
        frame_to_tensor(frame, &self.spec)
    }

    /// Run the model on one frame
    pub async fn run(&self, frame: &VideoFrame) -> Result<Vec<ModelOutput>, DetectionError> {
        let input = self.preprocess(frame)?;
        let plan = Arc::clone(&self.plan);

        let outputs = tokio::task::spawn_blocking(move || -> TractResult<Vec<ModelOutput>> {
            let outputs = plan.run(tvec!(input.into()))?;
            outputs
                .iter()
                .map(|t| {
                    let t = t.cast_to::<f32>()?;
                    let view = t.to_array_view::<f32>()?;
                    Ok(ModelOutput::new(view.shape().to_vec(), view.iter().copied().collect()))
                })
                .collect()
        })
        .await
        .map_err(|e| DetectionError::Inference(e.to_string()))?
        .map_err(|e| DetectionError::Inference(e.to_string()))?;

        debug!("Model produced {} outputs", outputs.len());
        Ok(outputs)
    }
}

fn frame_to_tensor(frame: &VideoFrame, spec: &ModelSpec) -> Result<Tensor, DetectionError> {
    if !frame.is_valid() {
        return Err(DetectionError::ImageProcessing(format!(
            "frame {} is {}x{} with {} bytes",
            frame.sequence,
            frame.width,
            frame.height,
            frame.data.len()
        )));
    }
    let img = frame.to_rgb_image().ok_or_else(|| {
        DetectionError::ImageProcessing("frame buffer does not match its dimensions".to_string())
    })?;

    let size = spec.input_size;
    let resized = imageops::resize(&img, size, size, FilterType::Triangle);
    let normalization = spec.normalization;

    let input = tract_ndarray::Array4::from_shape_fn(
        (1, 3, size as usize, size as usize),
        |(_, c, y, x)| normalization.apply(resized.get_pixel(x as u32, y as u32)[c]),
    );
    Ok(input.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_rows() {
        let out = ModelOutput::new(vec![1, 3, 4], (0..12).map(|v| v as f32).collect());
        assert_eq!(out.rows(), 3);
        assert_eq!(out.row_width(), 4);
        assert_eq!(out.row(1), Some(&[4.0, 5.0, 6.0, 7.0][..]));
        assert_eq!(out.row(3), None);
    }

    #[test]
    fn test_scores_shape() {
        let out = ModelOutput::new(vec![1, 2], vec![0.1, 0.9]);
        assert_eq!(out.row_width(), 1);
        assert_eq!(out.row(1), Some(&[0.9][..]));
    }

    fn spec(size: u32) -> ModelSpec {
        ModelSpec {
            path: None,
            input_size: size,
            normalization: crate::Normalization::ZeroToOne,
        }
    }

    #[test]
    fn test_tensor_shape_and_scale() {
        let frame = VideoFrame::filled(64, 48, [255, 0, 51]);
        let tensor = frame_to_tensor(&frame, &spec(16)).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 16, 16]);

        let view = tensor.to_array_view::<f32>().unwrap();
        assert!((view[[0, 0, 5, 5]] - 1.0).abs() < 1e-6);
        assert!(view[[0, 1, 5, 5]].abs() < 1e-6);
        assert!((view[[0, 2, 5, 5]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_malformed_frame_rejected_before_resize() {
        let frame = VideoFrame::new(vec![0; 10], 64, 48, 0, 7);
        let err = frame_to_tensor(&frame, &spec(16)).unwrap_err();
        assert!(matches!(
            err,
            DetectionError::ImageProcessing(ref msg) if msg.starts_with("frame 7")
        ));
    }

    #[tokio::test]
    async fn test_missing_path_is_load_error() {
        let spec = ModelSpec {
            path: None,
            input_size: 128,
            normalization: crate::Normalization::ZeroToOne,
        };
        let err = OnnxModel::load(&spec).await.err().unwrap();
        assert!(matches!(err, DetectionError::ModelLoad(_)));
    }
}

//! YOLOv8 detector on tract-onnx

use std::path::{Path, PathBuf};
use std::time::Instant;

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tract_onnx::prelude::*;
use video_frame::VideoFrame;

use crate::postprocess::{decode_predictions, non_max_suppression, Letterbox};
use crate::{class_name, ObjectDetectionError};

type YoloPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Padding color used by the YOLOv8 letterbox
const PAD_COLOR: Rgb<u8> = Rgb([114, 114, 114]);

/// Detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YoloConfig {
    /// Path to a YOLOv8 ONNX export
    pub model_path: PathBuf,
    /// Square model input side (pixels)
    pub input_size: u32,
    /// IoU above which same-class boxes are suppressed
    pub iou_threshold: f32,
}

impl Default for YoloConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/yolov8n.onnx"),
            input_size: 640,
            iou_threshold: 0.5,
        }
    }
}

/// YOLOv8 object detector
pub struct YoloDetector {
    plan: YoloPlan,
    input_size: u32,
    iou_threshold: f32,
}

impl YoloDetector {
    /// Load a model with default settings
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ObjectDetectionError> {
        Self::from_config(&YoloConfig {
            model_path: path.as_ref().to_path_buf(),
            ..Default::default()
        })
    }

    pub fn from_config(config: &YoloConfig) -> Result<Self, ObjectDetectionError> {
        info!("Loading object detection model: {}", config.model_path.display());
        let size = config.input_size as usize;

        let plan = tract_onnx::onnx()
            .model_for_path(&config.model_path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, 3, size, size]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| ObjectDetectionError::ModelLoad(format!("{}: {}", config.model_path.display(), e)))?;

        info!("Object detection model loaded ({}x{} input)", size, size);
        Ok(Self {
            plan,
            input_size: config.input_size,
            iou_threshold: config.iou_threshold,
        })
    }

    /// Detect objects at or above `confidence_threshold`
    pub fn detect_objects(
        &self,
        frame: &VideoFrame,
        confidence_threshold: f32,
    ) -> Result<Vec<proctor::ObjectDetection>, ObjectDetectionError> {
        let start = Instant::now();
        let (input, letterbox) = self.preprocess(frame)?;

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| ObjectDetectionError::Inference(e.to_string()))?;
        let output = outputs
            .first()
            .ok_or_else(|| ObjectDetectionError::Inference("model produced no outputs".into()))?
            .to_array_view::<f32>()
            .map_err(|e| ObjectDetectionError::Inference(e.to_string()))?;

        let shape = output.shape().to_vec();
        let predictions = match shape.as_slice() {
            [1, rows, _] if *rows > 4 => output
                .into_dimensionality::<tract_ndarray::Ix3>()
                .map_err(|_| ObjectDetectionError::OutputShape(shape.clone()))?
                .index_axis_move(tract_ndarray::Axis(0), 0),
            _ => return Err(ObjectDetectionError::OutputShape(shape.clone())),
        };

        let candidates = decode_predictions(predictions, confidence_threshold, &letterbox);
        let kept = non_max_suppression(candidates, self.iou_threshold);

        let detections: Vec<proctor::ObjectDetection> = kept
            .into_iter()
            .filter_map(|candidate| {
                class_name(candidate.class_id).map(|label| proctor::ObjectDetection {
                    label: label.to_string(),
                    confidence: candidate.confidence,
                    bbox: candidate.bbox,
                })
            })
            .collect();

        debug!(
            "Object detection: {} detection(s) in {}ms",
            detections.len(),
            start.elapsed().as_millis()
        );
        Ok(detections)
    }

    /// Letterbox into a normalized NCHW tensor
    fn preprocess(&self, frame: &VideoFrame) -> Result<(Tensor, Letterbox), ObjectDetectionError> {
        let image = frame.to_rgb_image()?;
        let letterbox = Letterbox::new(frame.width, frame.height, self.input_size);
        let (content_w, content_h) = letterbox.content_size();

        let resized = imageops::resize(&image, content_w.max(1), content_h.max(1), FilterType::Triangle);
        let mut canvas = RgbImage::from_pixel(self.input_size, self.input_size, PAD_COLOR);
        imageops::replace(&mut canvas, &resized, letterbox.pad_x as i64, letterbox.pad_y as i64);

        let size = self.input_size as usize;
        let tensor: Tensor = tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
            canvas.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        })
        .into();
        Ok((tensor, letterbox))
    }
}

impl proctor::ObjectDetector for YoloDetector {
    fn detect(
        &mut self,
        frame: &VideoFrame,
        confidence_threshold: f32,
    ) -> Result<Vec<proctor::ObjectDetection>, proctor::ProctorError> {
        Ok(self.detect_objects(frame, confidence_threshold)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_fails_to_load() {
        let result = YoloDetector::load("does/not/exist.onnx");
        assert!(matches!(result, Err(ObjectDetectionError::ModelLoad(_))));
    }

    #[test]
    fn test_default_config() {
        let config = YoloConfig::default();
        assert_eq!(config.input_size, 640);
        assert_eq!(config.iou_threshold, 0.5);
    }
}

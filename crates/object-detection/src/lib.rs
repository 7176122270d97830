//! Object Detection
//!
//! YOLOv8 object detection on ONNX models using tract-onnx. Produces labeled
//! pixel boxes for the proctoring engine's prohibited object checks.

mod detector;
mod postprocess;

pub use detector::{YoloConfig, YoloDetector};
pub use postprocess::{decode_predictions, iou, non_max_suppression, Candidate, Letterbox};

use thiserror::Error;

/// Errors during object detection
#[derive(Debug, Error)]
pub enum ObjectDetectionError {
    #[error("Model load failed: {0}")]
    ModelLoad(String),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Unexpected output shape {0:?}")]
    OutputShape(Vec<usize>),
    #[error("Frame conversion failed: {0}")]
    Frame(#[from] video_frame::FrameError),
}

impl From<ObjectDetectionError> for proctor::ProctorError {
    fn from(err: ObjectDetectionError) -> Self {
        match err {
            ObjectDetectionError::ModelLoad(msg) => proctor::ProctorError::ModelLoad(msg),
            ObjectDetectionError::Frame(e) => proctor::ProctorError::InvalidFrame(e),
            other => proctor::ProctorError::Inference(other.to_string()),
        }
    }
}

/// COCO class names in YOLOv8 output order
pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch", "potted plant",
    "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone",
    "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase", "scissors",
    "teddy bear", "hair drier", "toothbrush",
];

/// Label for a class index, `None` when out of range
pub fn class_name(class_id: usize) -> Option<&'static str> {
    COCO_CLASSES.get(class_id).copied()
}

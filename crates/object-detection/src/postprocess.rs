//! YOLOv8 output decoding and non-maximum suppression

use tract_onnx::prelude::tract_ndarray::{ArrayView2, Axis};

/// Mapping between frame pixels and the square model input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Letterbox {
    /// Fit a frame into `input_size` x `input_size`, centered, preserving aspect
    pub fn new(frame_width: u32, frame_height: u32, input_size: u32) -> Self {
        let scale = (input_size as f32 / frame_width as f32).min(input_size as f32 / frame_height as f32);
        let scaled_w = (frame_width as f32 * scale).round();
        let scaled_h = (frame_height as f32 * scale).round();
        Self {
            scale,
            pad_x: ((input_size as f32 - scaled_w) / 2.0).floor(),
            pad_y: ((input_size as f32 - scaled_h) / 2.0).floor(),
            frame_width,
            frame_height,
        }
    }

    /// Scaled content size inside the input (width, height)
    pub fn content_size(&self) -> (u32, u32) {
        (
            (self.frame_width as f32 * self.scale).round() as u32,
            (self.frame_height as f32 * self.scale).round() as u32,
        )
    }

    /// Map an input-space point back to frame pixels, clamped to the frame
    pub fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        let fx = ((x - self.pad_x) / self.scale).clamp(0.0, self.frame_width as f32);
        let fy = ((y - self.pad_y) / self.scale).clamp(0.0, self.frame_height as f32);
        (fx, fy)
    }
}

/// A decoded box before suppression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub class_id: usize,
    pub confidence: f32,
    /// [x1, y1, x2, y2] in frame pixels
    pub bbox: [f32; 4],
}

/// Decode a `[4 + classes, anchors]` prediction matrix.
///
/// Rows 0-3 hold the box center and size in input pixels, the remaining rows
/// hold per-class scores. Each anchor keeps only its best class.
pub fn decode_predictions(predictions: ArrayView2<f32>, confidence_threshold: f32, letterbox: &Letterbox) -> Vec<Candidate> {
    if predictions.nrows() <= 4 {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    for anchor in predictions.axis_iter(Axis(1)) {
        let best = anchor
            .iter()
            .skip(4)
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (class_id, &score)| match best {
                Some((_, top)) if top >= score => best,
                _ => Some((class_id, score)),
            });
        let Some((class_id, confidence)) = best else {
            continue;
        };
        if confidence.is_nan() || confidence < confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (anchor[0], anchor[1], anchor[2], anchor[3]);
        let (x1, y1) = letterbox.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.to_frame(cx + w / 2.0, cy + h / 2.0);
        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        candidates.push(Candidate {
            class_id,
            confidence,
            bbox: [x1, y1, x2, y2],
        });
    }
    candidates
}

/// Intersection over union of two [x1, y1, x2, y2] boxes
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix1 = a[0].max(b[0]);
    let iy1 = a[1].max(b[1]);
    let ix2 = a[2].min(b[2]);
    let iy2 = a[3].min(b[3]);

    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// Per-class greedy suppression, highest confidence first
pub fn non_max_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let suppressed = keep
            .iter()
            .any(|kept| kept.class_id == candidate.class_id && iou(&kept.bbox, &candidate.bbox) > iou_threshold);
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use tract_onnx::prelude::tract_ndarray::Array2;

    const CLASSES: usize = 80;

    fn predictions(anchors: &[([f32; 4], usize, f32)]) -> Array2<f32> {
        let mut out = Array2::<f32>::zeros((4 + CLASSES, anchors.len()));
        for (i, (bbox, class_id, score)) in anchors.iter().enumerate() {
            for (row, value) in bbox.iter().enumerate() {
                out[[row, i]] = *value;
            }
            out[[4 + class_id, i]] = *score;
        }
        out
    }

    #[test]
    fn test_letterbox_landscape() {
        let letterbox = Letterbox::new(1280, 720, 640);
        assert_eq!(letterbox.scale, 0.5);
        assert_eq!(letterbox.pad_x, 0.0);
        assert_eq!(letterbox.pad_y, 140.0);
        assert_eq!(letterbox.content_size(), (640, 360));
        assert_eq!(letterbox.to_frame(320.0, 320.0), (640.0, 360.0));
    }

    #[test]
    fn test_decode_maps_back_to_frame() {
        let letterbox = Letterbox::new(1280, 720, 640);
        let output = predictions(&[([320.0, 320.0, 100.0, 50.0], 67, 0.8)]);

        let candidates = decode_predictions(output.view(), 0.3, &letterbox);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].class_id, 67);
        assert_eq!(candidates[0].bbox, [540.0, 310.0, 740.0, 410.0]);
    }

    #[test]
    fn test_decode_applies_threshold() {
        let letterbox = Letterbox::new(640, 640, 640);
        let output = predictions(&[
            ([100.0, 100.0, 40.0, 40.0], 73, 0.29),
            ([300.0, 300.0, 40.0, 40.0], 73, 0.3),
        ]);

        let candidates = decode_predictions(output.view(), 0.3, &letterbox);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].bbox, [280.0, 280.0, 320.0, 320.0]);
    }

    #[test]
    fn test_decode_drops_boxes_in_padding() {
        let letterbox = Letterbox::new(1280, 720, 640);
        let output = predictions(&[([320.0, 60.0, 100.0, 40.0], 0, 0.9)]);
        assert!(decode_predictions(output.view(), 0.3, &letterbox).is_empty());
    }

    #[test]
    fn test_iou() {
        let a = [0.0, 0.0, 10.0, 10.0];
        assert_eq!(iou(&a, &a), 1.0);
        assert_eq!(iou(&a, &[20.0, 20.0, 30.0, 30.0]), 0.0);
        assert!((iou(&a, &[5.0, 0.0, 15.0, 10.0]) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_is_per_class() {
        let phone = |confidence, x| Candidate {
            class_id: 67,
            confidence,
            bbox: [x, 0.0, x + 10.0, 10.0],
        };
        let book = Candidate {
            class_id: 73,
            confidence: 0.5,
            bbox: [0.0, 0.0, 10.0, 10.0],
        };

        let kept = non_max_suppression(vec![phone(0.6, 1.0), book, phone(0.9, 0.0), phone(0.7, 50.0)], 0.5);
        let summary: Vec<(usize, f32)> = kept.iter().map(|c| (c.class_id, c.confidence)).collect();
        assert_eq!(summary, vec![(67, 0.9), (67, 0.7), (73, 0.5)]);
    }
}

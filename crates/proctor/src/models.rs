//! Model collaborator interfaces and their input/output types
//!
//! Face, landmark and object models are stateful and not reentrant: their
//! methods take `&mut self`, so a single instance can only ever be driven by
//! one caller at a time. The engine keeps each instance behind its own lock.
//! Pose solvers are pure and may be shared freely.

use nalgebra::{Point2, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};
use video_frame::VideoFrame;

use crate::ProctorError;

/// Bounding box relative to frame size (0-1 on both axes)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeBox {
    pub xmin: f32,
    pub ymin: f32,
    pub width: f32,
    pub height: f32,
}

impl RelativeBox {
    /// Box center (cx, cy)
    pub fn center(&self) -> (f32, f32) {
        (self.xmin + self.width / 2.0, self.ymin + self.height / 2.0)
    }
}

/// One detected face
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    pub bbox: RelativeBox,
    pub score: f32,
}

/// Normalized facial landmark (x, y in 0-1 of frame size, z relative depth)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Landmarks for a single face, in the landmark model's index order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    pub points: Vec<Landmark>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Raw object detector output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDetection {
    /// Class label as reported by the detector
    pub label: String,
    /// Detection confidence (0-1)
    pub confidence: f32,
    /// Bounding box [x1, y1, x2, y2] in pixels
    pub bbox: [f32; 4],
}

/// Pinhole camera without lens distortion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    pub focal_length: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Webcam approximation: focal length = frame width, principal point at the center
    pub fn approximate(width: u32, height: u32) -> Self {
        Self {
            focal_length: width as f64,
            cx: width as f64 / 2.0,
            cy: height as f64 / 2.0,
        }
    }

    /// Project a model point under (rotation, translation); `None` behind the camera
    pub fn project(&self, rotation: &Rotation3<f64>, translation: &Vector3<f64>, point: &Point3<f64>) -> Option<Point2<f64>> {
        let camera = rotation * point.coords + translation;
        if camera.z <= f64::EPSILON {
            return None;
        }
        Some(Point2::new(
            self.focal_length * camera.x / camera.z + self.cx,
            self.focal_length * camera.y / camera.z + self.cy,
        ))
    }
}

/// Face presence detector
pub trait FaceDetector: Send {
    /// Detect faces; an empty list means nobody is in frame
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<FaceDetection>, ProctorError>;
}

/// Dense facial landmark model
pub trait LandmarkModel: Send {
    /// One landmark set per detected face, most prominent first
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<LandmarkSet>, ProctorError>;
}

/// Object detector
pub trait ObjectDetector: Send {
    /// Detections at or above `confidence_threshold`
    fn detect(&mut self, frame: &VideoFrame, confidence_threshold: f32) -> Result<Vec<ObjectDetection>, ProctorError>;
}

/// Rotation from 2D-3D point correspondences
pub trait PoseSolver: Send + Sync {
    /// Rotation mapping model coordinates into camera coordinates, or `None`
    /// if no solution was found
    fn solve(
        &self,
        model_points: &[Point3<f64>],
        image_points: &[Point2<f64>],
        intrinsics: &CameraIntrinsics,
    ) -> Option<Rotation3<f64>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_box_center() {
        let bbox = RelativeBox { xmin: 0.2, ymin: 0.1, width: 0.4, height: 0.6 };
        let (cx, cy) = bbox.center();
        assert!((cx - 0.4).abs() < 1e-6);
        assert!((cy - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_projection_of_principal_axis() {
        let intrinsics = CameraIntrinsics::approximate(640, 480);
        let projected = intrinsics
            .project(&Rotation3::identity(), &Vector3::new(0.0, 0.0, 1000.0), &Point3::origin())
            .unwrap();
        assert_eq!(projected, Point2::new(320.0, 240.0));
    }

    #[test]
    fn test_projection_behind_camera() {
        let intrinsics = CameraIntrinsics::approximate(640, 480);
        let projected = intrinsics.project(&Rotation3::identity(), &Vector3::new(0.0, 0.0, -10.0), &Point3::origin());
        assert!(projected.is_none());
    }
}

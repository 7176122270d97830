//! Stub collaborators and synthetic inputs for unit tests

use nalgebra::{Point2, Point3, Rotation3};
use video_frame::VideoFrame;

use crate::config::ProctorConfig;
use crate::engine::{ModelSet, ProctorEngine};
use crate::models::{
    CameraIntrinsics, FaceDetection, FaceDetector, LandmarkModel, LandmarkSet, ObjectDetection,
    ObjectDetector, PoseSolver, RelativeBox,
};
use crate::pose::{euler_to_rotation, project_head, HeadPoseAngles};
use crate::ProctorError;

/// Pose landmarks of the head model at `angles`, 1.5m in front of an
/// approximate webcam
pub fn synthetic_landmarks(angles: &HeadPoseAngles, width: u32, height: u32) -> LandmarkSet {
    project_head(angles, 1500.0, width, height).expect("synthetic head is in front of the camera")
}

pub fn face_at(cx: f32, cy: f32) -> FaceDetection {
    FaceDetection {
        bbox: RelativeBox {
            xmin: cx - 0.1,
            ymin: cy - 0.15,
            width: 0.2,
            height: 0.3,
        },
        score: 0.9,
    }
}

pub fn object(label: &str, confidence: f32) -> ObjectDetection {
    ObjectDetection {
        label: label.to_string(),
        confidence,
        bbox: [40.0, 40.0, 120.0, 160.0],
    }
}

pub fn gray_frame(level: u8) -> VideoFrame {
    VideoFrame::filled(64, 48, [level, level, level])
}

#[derive(Default)]
pub struct StubFaceDetector {
    pub faces: Vec<FaceDetection>,
    pub fail: bool,
}

impl FaceDetector for StubFaceDetector {
    fn detect(&mut self, _frame: &VideoFrame) -> Result<Vec<FaceDetection>, ProctorError> {
        if self.fail {
            return Err(ProctorError::Inference("face detector crashed".into()));
        }
        Ok(self.faces.clone())
    }
}

#[derive(Default)]
pub struct StubLandmarkModel {
    pub sets: Vec<LandmarkSet>,
    pub fail: bool,
}

impl LandmarkModel for StubLandmarkModel {
    fn detect(&mut self, _frame: &VideoFrame) -> Result<Vec<LandmarkSet>, ProctorError> {
        if self.fail {
            return Err(ProctorError::Inference("landmark model crashed".into()));
        }
        Ok(self.sets.clone())
    }
}

#[derive(Default)]
pub struct StubObjectDetector {
    pub detections: Vec<ObjectDetection>,
}

impl ObjectDetector for StubObjectDetector {
    fn detect(&mut self, _frame: &VideoFrame, _confidence_threshold: f32) -> Result<Vec<ObjectDetection>, ProctorError> {
        Ok(self.detections.clone())
    }
}

/// Solver that ignores its input
pub struct FixedPoseSolver {
    rotation: Option<Rotation3<f64>>,
}

impl FixedPoseSolver {
    pub fn returning(angles: HeadPoseAngles) -> Self {
        Self {
            rotation: Some(euler_to_rotation(&angles)),
        }
    }

    pub fn failing() -> Self {
        Self { rotation: None }
    }
}

impl PoseSolver for FixedPoseSolver {
    fn solve(&self, _model: &[Point3<f64>], _image: &[Point2<f64>], _intrinsics: &CameraIntrinsics) -> Option<Rotation3<f64>> {
        self.rotation
    }
}

/// Scripted collaborators for an engine under test
pub struct Scenario {
    pub faces: Vec<FaceDetection>,
    pub face_detector_fails: bool,
    pub landmarks: Vec<LandmarkSet>,
    pub objects: Option<Vec<ObjectDetection>>,
    pub pose: Option<HeadPoseAngles>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            faces: vec![face_at(0.5, 0.45)],
            face_detector_fails: false,
            landmarks: vec![synthetic_landmarks(&HeadPoseAngles::default(), 64, 48)],
            objects: Some(Vec::new()),
            pose: Some(HeadPoseAngles::default()),
        }
    }
}

impl Scenario {
    pub fn engine(self) -> ProctorEngine {
        self.engine_with(ProctorConfig::default())
    }

    pub fn engine_with(self, config: ProctorConfig) -> ProctorEngine {
        let solver: Box<dyn PoseSolver> = match self.pose {
            Some(angles) => Box::new(FixedPoseSolver::returning(angles)),
            None => Box::new(FixedPoseSolver::failing()),
        };
        let mut models = ModelSet::new(
            Box::new(StubFaceDetector {
                faces: self.faces,
                fail: self.face_detector_fails,
            }),
            Box::new(StubLandmarkModel {
                sets: self.landmarks,
                fail: false,
            }),
        )
        .with_pose_solver(solver);
        if let Some(detections) = self.objects {
            models = models.with_object_detector(Box::new(StubObjectDetector { detections }));
        }
        ProctorEngine::new(config, models).expect("default config is valid")
    }
}

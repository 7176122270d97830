//! Head pose estimation from facial landmarks

use std::f64::consts::PI;

use nalgebra::{Point2, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::{CameraIntrinsics, Landmark, LandmarkSet, PoseSolver};
use crate::pnp::IterativePnpSolver;

/// Face mesh indices used for pose: nose tip, chin, left eye outer corner,
/// right eye outer corner, left mouth corner, right mouth corner
pub const POSE_LANDMARKS: [usize; 6] = [1, 152, 33, 263, 61, 291];

/// Landmark count of a full face mesh
pub const FACE_MESH_SIZE: usize = 468;

/// Generic head model matching [`POSE_LANDMARKS`], centered on the nose tip
pub const FACE_MODEL_POINTS: [[f64; 3]; 6] = [
    [0.0, 0.0, 0.0],
    [0.0, -330.0, -65.0],
    [-225.0, 170.0, -135.0],
    [225.0, 170.0, -135.0],
    [-150.0, -150.0, -125.0],
    [150.0, -150.0, -125.0],
];

/// Head orientation in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadPoseAngles {
    /// Up-down tilt
    pub pitch: f64,
    /// Left-right turn
    pub yaw: f64,
    /// Side tilt
    pub roll: f64,
}

impl HeadPoseAngles {
    pub fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }
}

/// Why no pose could be produced for a frame
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseUnavailable {
    #[error("landmark {required} requested but only {available} landmarks available")]
    MissingLandmarks { required: usize, available: usize },

    #[error("landmark coordinates are not finite")]
    NonFiniteLandmarks,

    #[error("frame has zero width or height")]
    EmptyFrame,

    #[error("pose solver found no solution")]
    SolveFailed,

    #[error("rotation does not decompose into finite angles")]
    Degenerate,
}

/// Outcome of a pose estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PoseResult {
    Found(HeadPoseAngles),
    Unavailable(PoseUnavailable),
}

impl PoseResult {
    pub fn angles(&self) -> Option<HeadPoseAngles> {
        match self {
            PoseResult::Found(angles) => Some(*angles),
            PoseResult::Unavailable(_) => None,
        }
    }

    pub fn into_result(self) -> Result<HeadPoseAngles, PoseUnavailable> {
        match self {
            PoseResult::Found(angles) => Ok(angles),
            PoseResult::Unavailable(reason) => Err(reason),
        }
    }
}

/// Model-to-camera rotation of a face looking straight into the camera.
///
/// The head model is y-up with the nose towards +z; the camera is y-down
/// looking along +z.
pub fn frontal_reference() -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::x_axis(), PI)
}

/// Decompose a model-to-camera rotation into head angles.
///
/// The rotation is taken relative to [`frontal_reference`] and split as
/// `Rx(pitch) * Ry(yaw) * Rz(roll)`, so a frontal face reads (0, 0, 0).
pub fn rotation_to_euler(rotation: &Rotation3<f64>) -> Option<HeadPoseAngles> {
    let head = rotation * frontal_reference().inverse();
    let m = head.matrix();

    let sin_yaw = m[(0, 2)].clamp(-1.0, 1.0);
    let yaw = sin_yaw.asin();
    let (pitch, roll) = if sin_yaw.abs() < 1.0 - 1e-9 {
        (
            (-m[(1, 2)]).atan2(m[(2, 2)]),
            (-m[(0, 1)]).atan2(m[(0, 0)]),
        )
    } else {
        // Gimbal lock: pitch and roll share an axis, attribute it all to pitch
        (m[(2, 1)].atan2(m[(1, 1)]), 0.0)
    };

    let angles = HeadPoseAngles::new(pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees());
    if angles.pitch.is_finite() && angles.yaw.is_finite() && angles.roll.is_finite() {
        Some(angles)
    } else {
        None
    }
}

/// Inverse of [`rotation_to_euler`]
pub fn euler_to_rotation(angles: &HeadPoseAngles) -> Rotation3<f64> {
    let pitch = Rotation3::from_axis_angle(&Vector3::x_axis(), angles.pitch.to_radians());
    let yaw = Rotation3::from_axis_angle(&Vector3::y_axis(), angles.yaw.to_radians());
    let roll = Rotation3::from_axis_angle(&Vector3::z_axis(), angles.roll.to_radians());
    pitch * yaw * roll * frontal_reference()
}

/// Face-mesh-sized landmark set for a head at `angles`, `distance_mm` in
/// front of the approximate camera of a `width`x`height` frame.
///
/// Only the pose landmarks are placed; the rest sit at the frame center.
/// `None` if a model point lands behind the camera.
pub fn project_head(angles: &HeadPoseAngles, distance_mm: f64, width: u32, height: u32) -> Option<LandmarkSet> {
    let intrinsics = CameraIntrinsics::approximate(width, height);
    let rotation = euler_to_rotation(angles);
    let translation = Vector3::new(0.0, 0.0, distance_mm);

    let mut points = vec![Landmark { x: 0.5, y: 0.5, z: 0.0 }; FACE_MESH_SIZE];
    for (index, model) in POSE_LANDMARKS.iter().zip(FACE_MODEL_POINTS.iter()) {
        let projected = intrinsics.project(&rotation, &translation, &Point3::new(model[0], model[1], model[2]))?;
        points[*index] = Landmark {
            x: (projected.x / width as f64) as f32,
            y: (projected.y / height as f64) as f32,
            z: 0.0,
        };
    }
    Some(LandmarkSet::new(points))
}

/// Head pose estimator using a 6-point PnP solve
pub struct HeadPoseEstimator {
    solver: Box<dyn PoseSolver>,
    model_points: Vec<Point3<f64>>,
}

impl HeadPoseEstimator {
    pub fn new(solver: Box<dyn PoseSolver>) -> Self {
        Self {
            solver,
            model_points: FACE_MODEL_POINTS
                .iter()
                .map(|p| Point3::new(p[0], p[1], p[2]))
                .collect(),
        }
    }

    /// Estimate head pose for one face
    pub fn estimate(&self, landmarks: &LandmarkSet, width: u32, height: u32) -> PoseResult {
        let image_points = match Self::image_points(landmarks, width, height) {
            Ok(points) => points,
            Err(reason) => return PoseResult::Unavailable(reason),
        };

        let intrinsics = CameraIntrinsics::approximate(width, height);
        let Some(rotation) = self.solver.solve(&self.model_points, &image_points, &intrinsics) else {
            debug!("Pose solver returned no solution");
            return PoseResult::Unavailable(PoseUnavailable::SolveFailed);
        };

        match rotation_to_euler(&rotation) {
            Some(angles) => PoseResult::Found(angles),
            None => PoseResult::Unavailable(PoseUnavailable::Degenerate),
        }
    }

    /// Pixel coordinates of the pose landmarks
    pub fn image_points(landmarks: &LandmarkSet, width: u32, height: u32) -> Result<Vec<Point2<f64>>, PoseUnavailable> {
        if width == 0 || height == 0 {
            return Err(PoseUnavailable::EmptyFrame);
        }

        POSE_LANDMARKS
            .iter()
            .map(|&index| {
                let landmark = landmarks.get(index).ok_or(PoseUnavailable::MissingLandmarks {
                    required: index,
                    available: landmarks.len(),
                })?;
                let x = landmark.x as f64 * width as f64;
                let y = landmark.y as f64 * height as f64;
                if x.is_finite() && y.is_finite() {
                    Ok(Point2::new(x, y))
                } else {
                    Err(PoseUnavailable::NonFiniteLandmarks)
                }
            })
            .collect()
    }
}

impl Default for HeadPoseEstimator {
    fn default() -> Self {
        Self::new(Box::new(IterativePnpSolver::default()))
    }
}

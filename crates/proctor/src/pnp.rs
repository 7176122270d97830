//! Iterative PnP solver (Levenberg-Marquardt on reprojection error)

use nalgebra::{DMatrix, DVector, Point2, Point3, Rotation3, Vector3};
use tracing::debug;

use crate::models::{CameraIntrinsics, PoseSolver};
use crate::pose::frontal_reference;

/// Minimizes the squared reprojection error over rotation and translation.
///
/// Starts from a camera-facing pose at the distance implied by the point
/// spread, so it converges for the head orientations a webcam sees.
#[derive(Debug, Clone)]
pub struct IterativePnpSolver {
    /// Iteration cap
    pub max_iterations: usize,
    /// Stop once the RMS reprojection error (pixels) is this small
    pub tolerance_px: f64,
}

impl Default for IterativePnpSolver {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance_px: 1e-6,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Pose {
    rotation: Rotation3<f64>,
    translation: Vector3<f64>,
}

impl Pose {
    /// Apply a step: 3 rotation-vector components then 3 translation components
    fn perturbed(&self, step: &[f64]) -> Pose {
        Pose {
            rotation: self.rotation * Rotation3::new(Vector3::new(step[0], step[1], step[2])),
            translation: self.translation + Vector3::new(step[3], step[4], step[5]),
        }
    }
}

struct Problem<'a> {
    model: &'a [Point3<f64>],
    image: &'a [Point2<f64>],
    intrinsics: &'a CameraIntrinsics,
}

impl Problem<'_> {
    /// Residual vector, `None` when a point falls behind the camera
    fn residuals(&self, pose: &Pose) -> Option<DVector<f64>> {
        let mut residuals = DVector::zeros(self.model.len() * 2);
        for (i, (model, observed)) in self.model.iter().zip(self.image).enumerate() {
            let projected = self.intrinsics.project(&pose.rotation, &pose.translation, model)?;
            residuals[2 * i] = projected.x - observed.x;
            residuals[2 * i + 1] = projected.y - observed.y;
        }
        Some(residuals)
    }

    /// Central-difference Jacobian of the residuals around `pose`
    fn jacobian(&self, pose: &Pose) -> Option<DMatrix<f64>> {
        let rows = self.model.len() * 2;
        let mut jacobian = DMatrix::zeros(rows, 6);
        for col in 0..6 {
            let h = if col < 3 {
                1e-6
            } else {
                1e-6 * pose.translation[col - 3].abs().max(1.0)
            };
            let mut step = [0.0; 6];
            step[col] = h;
            let forward = self.residuals(&pose.perturbed(&step))?;
            step[col] = -h;
            let backward = self.residuals(&pose.perturbed(&step))?;
            jacobian.set_column(col, &((forward - backward) / (2.0 * h)));
        }
        Some(jacobian)
    }

    /// Camera-facing start at the depth that reproduces the observed point spread
    fn initial_pose(&self) -> Option<Pose> {
        let n = self.model.len() as f64;
        let rotation = frontal_reference();

        let model_centroid = self.model.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / n;
        let image_centroid = self.image.iter().fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords) / n;

        let model_spread = (self
            .model
            .iter()
            .map(|p| {
                let d = p.coords - model_centroid;
                d.x * d.x + d.y * d.y
            })
            .sum::<f64>()
            / n)
            .sqrt();
        let image_spread = (self
            .image
            .iter()
            .map(|p| (p.coords - image_centroid).norm_squared())
            .sum::<f64>()
            / n)
            .sqrt();

        if !(image_spread > 1e-9 && model_spread > 1e-9) {
            return None;
        }

        let f = self.intrinsics.focal_length;
        let depth = f * model_spread / image_spread;
        let centroid_camera = Vector3::new(
            (image_centroid.x - self.intrinsics.cx) * depth / f,
            (image_centroid.y - self.intrinsics.cy) * depth / f,
            depth,
        );
        let translation = centroid_camera - rotation * model_centroid;
        Some(Pose { rotation, translation })
    }
}

impl PoseSolver for IterativePnpSolver {
    fn solve(
        &self,
        model_points: &[Point3<f64>],
        image_points: &[Point2<f64>],
        intrinsics: &CameraIntrinsics,
    ) -> Option<Rotation3<f64>> {
        if model_points.len() != image_points.len() || model_points.len() < 4 || intrinsics.focal_length <= 0.0 {
            return None;
        }

        let problem = Problem {
            model: model_points,
            image: image_points,
            intrinsics,
        };
        let mut pose = problem.initial_pose()?;
        let mut residuals = problem.residuals(&pose)?;
        let mut cost = residuals.norm_squared();
        let target_cost = self.tolerance_px * self.tolerance_px * model_points.len() as f64;
        let mut lambda = 1e-3;

        for iteration in 0..self.max_iterations {
            if cost <= target_cost {
                break;
            }

            let jacobian = problem.jacobian(&pose)?;
            let jtj = jacobian.transpose() * &jacobian;
            let gradient = jacobian.transpose() * &residuals;

            let mut accepted = None;
            while lambda < 1e12 {
                let mut damped = jtj.clone();
                for i in 0..6 {
                    damped[(i, i)] += lambda * jtj[(i, i)].max(1e-12);
                }
                let Some(cholesky) = damped.cholesky() else {
                    lambda *= 10.0;
                    continue;
                };
                let step = cholesky.solve(&(-&gradient));
                let candidate = pose.perturbed(step.as_slice());
                if let Some(candidate_residuals) = problem.residuals(&candidate) {
                    let candidate_cost = candidate_residuals.norm_squared();
                    if candidate_cost < cost {
                        accepted = Some((candidate, candidate_residuals, candidate_cost, step.norm()));
                        lambda = (lambda / 10.0).max(1e-15);
                        break;
                    }
                }
                lambda *= 10.0;
            }

            let Some((candidate, candidate_residuals, candidate_cost, step_norm)) = accepted else {
                debug!("PnP stalled after {} iterations (cost {:.3e})", iteration, cost);
                break;
            };
            let improvement = cost - candidate_cost;
            pose = candidate;
            residuals = candidate_residuals;
            cost = candidate_cost;
            if step_norm < 1e-12 || improvement < 1e-15 * cost.max(1.0) {
                break;
            }
        }

        if !cost.is_finite() || pose.translation.z <= 0.0 {
            return None;
        }
        Some(pose.rotation)
    }
}

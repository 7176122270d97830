//! Per-frame violation engine

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use video_frame::{decode_base64_image, VideoFrame};

use crate::analysis::{AnalysisStage, FrameAnalysisResult};
use crate::calibration::{CalibrationBaseline, CalibrationError, CalibrationManager};
use crate::config::ProctorConfig;
use crate::environment::{EnvironmentCheckResult, EnvironmentChecker};
use crate::gaze::GazeDeviationClassifier;
use crate::models::{FaceDetection, FaceDetector, LandmarkModel, ObjectDetector, PoseSolver};
use crate::objects::{ObjectFindings, ObjectViolationMapper};
use crate::pnp::IterativePnpSolver;
use crate::pose::{HeadPoseEstimator, PoseResult};
use crate::presence::PresenceAnalyzer;
use crate::snapshot::annotate_snapshot;
use crate::throttle::EvidenceThrottle;
use crate::ProctorError;

/// Model collaborators handed to the engine
pub struct ModelSet {
    pub face_detector: Box<dyn FaceDetector>,
    pub landmark_model: Box<dyn LandmarkModel>,
    /// `None` when the object model could not be loaded
    pub object_detector: Option<Box<dyn ObjectDetector>>,
    pub pose_solver: Box<dyn PoseSolver>,
}

impl ModelSet {
    pub fn new(face_detector: Box<dyn FaceDetector>, landmark_model: Box<dyn LandmarkModel>) -> Self {
        Self {
            face_detector,
            landmark_model,
            object_detector: None,
            pose_solver: Box::new(IterativePnpSolver::default()),
        }
    }

    pub fn with_object_detector(mut self, detector: Box<dyn ObjectDetector>) -> Self {
        self.object_detector = Some(detector);
        self
    }

    pub fn with_pose_solver(mut self, solver: Box<dyn PoseSolver>) -> Self {
        self.pose_solver = solver;
        self
    }
}

/// Proctoring engine.
///
/// Owns the models, each behind its own lock, and the snapshot throttle.
/// Safe to share between threads; calls into the same model are serialized.
pub struct ProctorEngine {
    config: ProctorConfig,
    face_detector: Mutex<Box<dyn FaceDetector>>,
    landmark_model: Mutex<Box<dyn LandmarkModel>>,
    object_detector: Option<Mutex<Box<dyn ObjectDetector>>>,
    estimator: HeadPoseEstimator,
    presence: PresenceAnalyzer,
    gaze: GazeDeviationClassifier,
    objects: ObjectViolationMapper,
    environment: EnvironmentChecker,
    throttle: EvidenceThrottle,
}

impl ProctorEngine {
    pub fn new(config: ProctorConfig, models: ModelSet) -> Result<Self, ProctorError> {
        config.validate()?;

        if models.object_detector.is_none() {
            warn!("No object detector available, phone and book checks are disabled");
        }

        info!(
            "Proctor engine ready (snapshot interval {}s, object threshold {})",
            config.snapshot_interval_secs, config.object_confidence_threshold
        );

        Ok(Self {
            face_detector: Mutex::new(models.face_detector),
            landmark_model: Mutex::new(models.landmark_model),
            object_detector: models.object_detector.map(Mutex::new),
            estimator: HeadPoseEstimator::new(models.pose_solver),
            presence: PresenceAnalyzer,
            gaze: GazeDeviationClassifier::new(&config),
            objects: ObjectViolationMapper::new(config.object_confidence_threshold),
            environment: EnvironmentChecker::new(&config),
            throttle: EvidenceThrottle::new(config.snapshot_interval_secs, config.snapshot_jpeg_quality),
            config,
        })
    }

    pub fn config(&self) -> &ProctorConfig {
        &self.config
    }

    /// Analyze a frame against a session's calibrated pitch and yaw
    pub fn process_frame(
        &self,
        frame: &VideoFrame,
        session_id: &str,
        calibrated_pitch: f64,
        calibrated_yaw: f64,
    ) -> Result<FrameAnalysisResult, ProctorError> {
        self.process_frame_at(
            frame,
            session_id,
            CalibrationBaseline::new(calibrated_pitch, calibrated_yaw),
            Utc::now(),
        )
    }

    /// Decode a base64 image and analyze it
    pub fn process_encoded_frame(
        &self,
        payload: &str,
        session_id: &str,
        calibrated_pitch: f64,
        calibrated_yaw: f64,
    ) -> Result<FrameAnalysisResult, ProctorError> {
        let frame = decode_base64_image(payload)?;
        self.process_frame(&frame, session_id, calibrated_pitch, calibrated_yaw)
    }

    /// Analyze a frame captured at `now`.
    ///
    /// Only an invalid frame is an error. A failing model skips its stage and
    /// the stage is listed in the result.
    pub fn process_frame_at(
        &self,
        frame: &VideoFrame,
        session_id: &str,
        baseline: CalibrationBaseline,
        now: DateTime<Utc>,
    ) -> Result<FrameAnalysisResult, ProctorError> {
        frame.validate()?;

        let mut result = FrameAnalysisResult::new(now);

        // Presence
        match self.detect_faces(frame) {
            Ok(faces) => {
                let presence = self.presence.analyze(&faces);
                result.face_count = presence.face_count;
                let single_face = presence.single_face();
                if let Some(violation) = presence.violation {
                    result.push_violation(violation);
                }

                // Gaze, single face only
                if single_face {
                    self.analyze_gaze(frame, &baseline, &mut result);
                }
            }
            Err(e) => self.skip_stage(&mut result, AnalysisStage::FaceDetection, &e),
        }

        // Prohibited objects
        let findings = self.detect_objects(frame, &mut result);
        for violation in findings.violations() {
            result.push_violation(violation);
        }
        result.objects = findings.detections.clone();

        metrics::counter!("proctor_frames_processed_total").increment(1);
        for violation in &result.violations {
            metrics::counter!("proctor_violations_total", "type" => violation.kind.as_str()).increment(1);
        }

        // Evidence
        let violations = &result.violations;
        let snapshot = self
            .throttle
            .maybe_capture(session_id, !violations.is_empty(), now, || {
                if self.config.annotate_snapshots {
                    annotate_snapshot(frame, &findings, violations)
                } else {
                    Ok(frame.clone())
                }
            });
        result.snapshot_base64 = snapshot;
        if result.snapshot_base64.is_some() {
            metrics::counter!("proctor_snapshots_captured_total").increment(1);
        }

        debug!(
            "Session {}: {} face(s), {} violation(s), snapshot={}",
            session_id,
            result.face_count,
            result.violations.len(),
            result.snapshot_base64.is_some()
        );

        Ok(result)
    }

    fn analyze_gaze(&self, frame: &VideoFrame, baseline: &CalibrationBaseline, result: &mut FrameAnalysisResult) {
        let sets = match lock_model(&self.landmark_model, "landmark model").and_then(|mut model| model.detect(frame)) {
            Ok(sets) => sets,
            Err(e) => {
                self.skip_stage(result, AnalysisStage::Landmarks, &e);
                return;
            }
        };

        let Some(landmarks) = sets.first() else {
            debug!("Face detected but no landmarks found");
            return;
        };

        match self.estimator.estimate(landmarks, frame.width, frame.height) {
            PoseResult::Found(pose) => {
                result.head_pose = Some(pose);
                let assessment = self.gaze.assess_pose(&pose, baseline);
                if let Some(violation) = self.gaze.violation(&assessment) {
                    result.push_violation(violation);
                }
            }
            PoseResult::Unavailable(reason) => {
                debug!("Head pose unavailable: {}", reason);
            }
        }
    }

    fn detect_objects(&self, frame: &VideoFrame, result: &mut FrameAnalysisResult) -> ObjectFindings {
        let Some(detector) = &self.object_detector else {
            result.skipped_stages.push(AnalysisStage::ObjectDetection);
            return ObjectFindings::default();
        };

        let threshold = self.objects.confidence_threshold();
        match lock_model(detector, "object detector").and_then(|mut model| model.detect(frame, threshold)) {
            Ok(detections) => self.objects.map(&detections),
            Err(e) => {
                self.skip_stage(result, AnalysisStage::ObjectDetection, &e);
                ObjectFindings::default()
            }
        }
    }

    fn detect_faces(&self, frame: &VideoFrame) -> Result<Vec<FaceDetection>, ProctorError> {
        lock_model(&self.face_detector, "face detector")?.detect(frame)
    }

    fn skip_stage(&self, result: &mut FrameAnalysisResult, stage: AnalysisStage, error: &ProctorError) {
        warn!("Skipping {} stage: {}", stage.as_str(), error);
        metrics::counter!("proctor_stages_skipped_total", "stage" => stage.as_str()).increment(1);
        result.skipped_stages.push(stage);
    }

    /// Capture a calibration baseline from a frame
    pub fn calibrate(&self, frame: &VideoFrame) -> Result<CalibrationBaseline, CalibrationError> {
        let mut model = lock_model(&self.landmark_model, "landmark model")
            .map_err(|e| CalibrationError::Model(e.to_string()))?;
        CalibrationManager::new(&self.estimator).calibrate(&mut **model, frame)
    }

    /// Capture a calibration baseline from a base64 image
    pub fn calibrate_from_encoded(&self, payload: &str) -> Result<CalibrationBaseline, CalibrationError> {
        let mut model = lock_model(&self.landmark_model, "landmark model")
            .map_err(|e| CalibrationError::Model(e.to_string()))?;
        CalibrationManager::new(&self.estimator).calibrate_encoded(&mut **model, payload)
    }

    /// Lighting and framing check, independent of any session.
    ///
    /// Only an invalid frame is an error. A face detector failure is
    /// reported in the result with the face checks failed.
    pub fn check_environment(&self, frame: &VideoFrame) -> Result<EnvironmentCheckResult, ProctorError> {
        frame.validate()?;
        match self.detect_faces(frame) {
            Ok(faces) => Ok(self.environment.check(frame, &faces)),
            Err(e) => {
                warn!("Environment check without face detection: {}", e);
                Ok(self.environment.check_without_faces(frame, &e.to_string()))
            }
        }
    }

    /// Drop per-session state held by the engine
    pub fn end_session(&self, session_id: &str) -> bool {
        self.throttle.end_session(session_id)
    }

    pub fn has_object_detector(&self) -> bool {
        self.object_detector.is_some()
    }
}

fn lock_model<'a, T: ?Sized>(model: &'a Mutex<Box<T>>, name: &str) -> Result<MutexGuard<'a, Box<T>>, ProctorError> {
    model
        .lock()
        .map_err(|_| ProctorError::ModelUnavailable(format!("{} lock poisoned", name)))
}

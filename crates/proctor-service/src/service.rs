//! Session-facing proctoring service

use std::collections::HashMap;
use std::sync::Arc;

use object_detection::YoloDetector;
use proctor::{
    CalibrationBaseline, EnvironmentCheckResult, FaceDetector, FrameAnalysisResult, LandmarkModel, ModelSet,
    ProctorEngine,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use video_frame::VideoFrame;

use crate::config::ServiceConfig;
use crate::ServiceError;

type BaselineSlot = Arc<RwLock<Option<CalibrationBaseline>>>;

/// Proctoring service shared by all sessions.
///
/// Each session's baseline sits behind its own lock: calibration holds the
/// write side for the whole calibration, analysis holds the read side, so a
/// frame is never analyzed against a half-updated baseline.
pub struct ProctoringService {
    engine: Arc<ProctorEngine>,
    sessions: RwLock<HashMap<String, BaselineSlot>>,
}

impl ProctoringService {
    pub fn new(engine: ProctorEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Build the engine from configuration and the face models.
    ///
    /// A missing or broken object model is logged and the service runs
    /// without phone and book checks.
    pub fn from_config(
        config: &ServiceConfig,
        face_detector: Box<dyn FaceDetector>,
        landmark_model: Box<dyn LandmarkModel>,
    ) -> Result<Self, ServiceError> {
        let mut models = ModelSet::new(face_detector, landmark_model);

        if config.enable_object_detection {
            match YoloDetector::from_config(&config.object_detection) {
                Ok(detector) => models = models.with_object_detector(Box::new(detector)),
                Err(e) => warn!("Object detection unavailable: {}", e),
            }
        }

        let engine = ProctorEngine::new(config.proctor.clone(), models)?;
        info!("Proctoring service started");
        Ok(Self::new(engine))
    }

    pub fn engine(&self) -> &ProctorEngine {
        &self.engine
    }

    async fn slot(&self, session_id: &str) -> BaselineSlot {
        if let Some(slot) = self.sessions.read().await.get(session_id) {
            return Arc::clone(slot);
        }
        let mut sessions = self.sessions.write().await;
        Arc::clone(sessions.entry(session_id.to_string()).or_default())
    }

    async fn existing_slot(&self, session_id: &str) -> Option<BaselineSlot> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Calibrate a session, replacing any previous baseline
    pub async fn calibrate_session(&self, session_id: &str, frame: VideoFrame) -> Result<CalibrationBaseline, ServiceError> {
        let engine = Arc::clone(&self.engine);
        self.store_calibration(session_id, move || engine.calibrate(&frame)).await
    }

    /// Calibrate a session from a base64 image
    pub async fn calibrate_session_from_encoded(
        &self,
        session_id: &str,
        payload: String,
    ) -> Result<CalibrationBaseline, ServiceError> {
        let engine = Arc::clone(&self.engine);
        self.store_calibration(session_id, move || engine.calibrate_from_encoded(&payload)).await
    }

    async fn store_calibration<F>(&self, session_id: &str, calibrate: F) -> Result<CalibrationBaseline, ServiceError>
    where
        F: FnOnce() -> Result<CalibrationBaseline, proctor::CalibrationError> + Send + 'static,
    {
        let slot = self.slot(session_id).await;
        let mut baseline = slot.write().await;

        let calibrated = tokio::task::spawn_blocking(calibrate)
            .await
            .map_err(|e| ServiceError::Task(e.to_string()))
            .and_then(|result| result.map_err(ServiceError::from));

        match calibrated {
            Ok(value) => {
                *baseline = Some(value);
                info!("Session {} calibrated", session_id);
                Ok(value)
            }
            Err(e) => {
                warn!("Calibration failed for session {}: {}", session_id, e);
                let never_calibrated = baseline.is_none();
                drop(baseline);
                if never_calibrated {
                    self.discard_empty_slot(session_id, &slot).await;
                }
                Err(e)
            }
        }
    }

    /// Remove a slot left empty by a failed calibration, unless another
    /// task has picked it up in the meantime
    async fn discard_empty_slot(&self, session_id: &str, slot: &BaselineSlot) {
        let mut sessions = self.sessions.write().await;
        let unused = sessions.get(session_id).is_some_and(|current| {
            Arc::ptr_eq(current, slot)
                && Arc::strong_count(slot) == 2
                && slot.try_read().is_ok_and(|baseline| baseline.is_none())
        });
        if unused {
            sessions.remove(session_id);
            debug!("Discarded empty slot for session {}", session_id);
        }
    }

    /// Analyze a frame against the session's baseline
    pub async fn analyze_frame(&self, session_id: &str, frame: VideoFrame) -> Result<FrameAnalysisResult, ServiceError> {
        let engine = Arc::clone(&self.engine);
        let id = session_id.to_string();
        self.with_baseline(session_id, move |baseline| {
            engine.process_frame(&frame, &id, baseline.pitch, baseline.yaw)
        })
        .await
    }

    /// Analyze a base64 frame against the session's baseline
    pub async fn analyze_encoded_frame(
        &self,
        session_id: &str,
        payload: String,
    ) -> Result<FrameAnalysisResult, ServiceError> {
        let engine = Arc::clone(&self.engine);
        let id = session_id.to_string();
        self.with_baseline(session_id, move |baseline| {
            engine.process_encoded_frame(&payload, &id, baseline.pitch, baseline.yaw)
        })
        .await
    }

    async fn with_baseline<F>(&self, session_id: &str, analyze: F) -> Result<FrameAnalysisResult, ServiceError>
    where
        F: FnOnce(CalibrationBaseline) -> Result<FrameAnalysisResult, proctor::ProctorError> + Send + 'static,
    {
        let slot = self
            .existing_slot(session_id)
            .await
            .ok_or_else(|| ServiceError::NotCalibrated(session_id.to_string()))?;
        let guard = slot.read().await;
        let baseline = (*guard).ok_or_else(|| ServiceError::NotCalibrated(session_id.to_string()))?;

        let result = tokio::task::spawn_blocking(move || analyze(baseline))
            .await
            .map_err(|e| ServiceError::Task(e.to_string()))??;

        debug!("Session {}: {} violation(s)", session_id, result.violations.len());
        Ok(result)
    }

    /// Pre-session lighting and framing check
    pub async fn check_environment(&self, frame: VideoFrame) -> Result<EnvironmentCheckResult, ServiceError> {
        let engine = Arc::clone(&self.engine);
        let result = tokio::task::spawn_blocking(move || engine.check_environment(&frame))
            .await
            .map_err(|e| ServiceError::Task(e.to_string()))??;
        Ok(result)
    }

    pub async fn session_baseline(&self, session_id: &str) -> Option<CalibrationBaseline> {
        let slot = self.existing_slot(session_id).await?;
        let baseline = *slot.read().await;
        baseline
    }

    /// Drop a session's baseline and snapshot history
    pub async fn end_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        let throttled = self.engine.end_session(session_id);
        if removed || throttled {
            info!("Session {} ended", session_id);
        }
        removed || throttled
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

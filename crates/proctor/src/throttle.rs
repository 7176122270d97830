//! Per-session evidence snapshot throttle

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use video_frame::{encode_base64_jpeg, FrameError, VideoFrame};

type CaptureSlot = Arc<Mutex<Option<DateTime<Utc>>>>;

/// Rate limiter for violation snapshots, keyed by session id.
///
/// Each session has its own slot, so captures for one session never wait on
/// another. The map lock is only held to look up or insert a slot.
pub struct EvidenceThrottle {
    interval_secs: f64,
    jpeg_quality: u8,
    sessions: RwLock<HashMap<String, CaptureSlot>>,
}

impl EvidenceThrottle {
    pub fn new(interval_secs: f64, jpeg_quality: u8) -> Self {
        Self {
            interval_secs,
            jpeg_quality,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    fn slot(&self, session_id: &str) -> CaptureSlot {
        if let Some(slot) = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
        {
            return Arc::clone(slot);
        }

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(sessions.entry(session_id.to_string()).or_default())
    }

    /// Encode a snapshot if the frame has violations and the session's last
    /// capture is at least the interval old.
    ///
    /// `render` is only called when a capture is due. A failed render or
    /// encode leaves the last capture time unchanged.
    pub fn maybe_capture<F>(&self, session_id: &str, has_violations: bool, now: DateTime<Utc>, render: F) -> Option<String>
    where
        F: FnOnce() -> Result<VideoFrame, FrameError>,
    {
        if !has_violations {
            return None;
        }

        let slot = self.slot(session_id);
        let mut last = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(previous) = *last {
            let elapsed = (now - previous).num_milliseconds() as f64 / 1000.0;
            if elapsed < self.interval_secs {
                debug!("Snapshot throttled for session {} ({:.2}s since last)", session_id, elapsed);
                return None;
            }
        }

        let encoded = render().and_then(|frame| encode_base64_jpeg(&frame, self.jpeg_quality));
        match encoded {
            Ok(snapshot) => {
                *last = Some(now);
                debug!("Captured snapshot for session {}", session_id);
                Some(snapshot)
            }
            Err(e) => {
                warn!("Snapshot encoding failed for session {}: {}", session_id, e);
                None
            }
        }
    }

    /// Forget a session's capture history
    pub fn end_session(&self, session_id: &str) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
            .is_some();
        if removed {
            info!("Evicted snapshot throttle state for session {}", session_id);
        }
        removed
    }

    /// Number of sessions with throttle state
    pub fn session_count(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn last_capture(&self, session_id: &str) -> Option<DateTime<Utc>> {
        let slot = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()?;
        let last = *slot.lock().unwrap_or_else(PoisonError::into_inner);
        last
    }

    pub fn interval_secs(&self) -> f64 {
        self.interval_secs
    }
}

impl Default for EvidenceThrottle {
    fn default() -> Self {
        Self::new(2.0, 95)
    }
}

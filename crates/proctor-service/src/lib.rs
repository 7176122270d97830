//! Proctoring Service
//!
//! Session-facing facade over the proctoring engine. Owns each session's
//! calibration baseline and runs frame analysis on the blocking pool.

pub mod config;
pub mod logging;
pub mod service;

pub use config::{LogFormat, LoggingConfig, ServiceConfig};
pub use logging::init_logging;
pub use service::ProctoringService;

use proctor::{CalibrationError, ProctorError};
use thiserror::Error;

/// Service error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Proctor(#[from] ProctorError),

    #[error("Calibration failed: {0}")]
    Calibration(#[from] CalibrationError),

    #[error("Session {0} has not been calibrated")]
    NotCalibrated(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Analysis task failed: {0}")]
    Task(String),
}

impl From<::config::ConfigError> for ServiceError {
    fn from(err: ::config::ConfigError) -> Self {
        ServiceError::Config(err.to_string())
    }
}

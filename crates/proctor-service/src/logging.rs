//! Tracing subscriber setup

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::config::{LogFormat, LoggingConfig};
use crate::ServiceError;

/// Install the global tracing subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<(), ServiceError> {
    let level: Level = config
        .level
        .parse()
        .map_err(|_| ServiceError::Config(format!("unknown log level '{}'", config.level)))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(config.with_target);

    let result = match config.format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };
    result.map_err(|e| ServiceError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_level_rejected() {
        let config = LoggingConfig {
            level: "loud".to_string(),
            ..Default::default()
        };
        assert!(matches!(init_logging(&config), Err(ServiceError::Config(_))));
    }
}

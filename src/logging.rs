//! Console logging setup.
//!
//! Library code logs through the `log` macros only; the binary installs a
//! `log4rs` console appender on stderr so stdout stays reserved for reports.

use log::LevelFilter;
use log4rs::Config;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;

use crate::error::AppError;

// ISO 8601 timestamp and a color coded level tag.
const LOG_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%SZ)} {h({l})} {t} - {m}{n}";
const APPENDER: &str = "stderr";

pub fn build_config(level: LevelFilter) -> Result<Config, AppError> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();
    Config::builder()
        .appender(Appender::builder().build(APPENDER, Box::new(stderr)))
        .build(Root::builder().appender(APPENDER).build(level))
        .map_err(|e| AppError::invalid_input(format!("Failed to build log config: {e}")))
}

/// Install the global logger. Call once, before any work starts.
pub fn init_logging(level: LevelFilter) -> Result<(), AppError> {
    let config = build_config(level)?;
    log4rs::init_config(config)
        .map(|_| ())
        .map_err(|e| AppError::invalid_input(format!("Failed to initialize logging: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_carries_the_requested_level() {
        let config = build_config(LevelFilter::Debug).unwrap();
        assert_eq!(config.root().level(), LevelFilter::Debug);
        assert_eq!(config.appenders().len(), 1);
    }
}

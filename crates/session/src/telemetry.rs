//! Logging setup and metric names

use escalation::AcceptedWarning;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use violations::ViolationType;

use crate::config::LoggingConfig;
use crate::SessionError;

pub const VIOLATIONS_TOTAL: &str = "proctor_violations_total";
pub const WARNINGS_ACCEPTED_TOTAL: &str = "proctor_warnings_accepted_total";
pub const INFERENCE_ERRORS_TOTAL: &str = "proctor_inference_errors_total";
pub const TICKS_SKIPPED_TOTAL: &str = "proctor_ticks_skipped_total";
pub const SESSIONS_TERMINATED_TOTAL: &str = "proctor_sessions_terminated_total";
pub const WARNING_COUNT: &str = "proctor_warning_count";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(format: LogFormat, level: Level) -> Result<(), SessionError> {
    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| SessionError::Logging(e.to_string()))
}

/// [`init_logging`] driven by a [`LoggingConfig`]
pub fn init_from_config(config: &LoggingConfig) -> Result<(), SessionError> {
    let level = config
        .level
        .parse::<Level>()
        .map_err(|e| SessionError::Logging(format!("invalid level {:?}: {}", config.level, e)))?;
    let format = if config.json { LogFormat::Json } else { LogFormat::Text };
    init_logging(format, level)
}

pub(crate) fn record_violation(violation: ViolationType) {
    metrics::counter!(VIOLATIONS_TOTAL, "type" => violation.as_str()).increment(1);
}

pub(crate) fn record_accepted(warning: &AcceptedWarning) {
    metrics::counter!(
        WARNINGS_ACCEPTED_TOTAL,
        "type" => warning.violation.as_str(),
        "severity" => warning.severity.as_str()
    )
    .increment(1);
    metrics::gauge!(WARNING_COUNT).set(warning.warnings as f64);
}

pub(crate) fn record_inference_error() {
    metrics::counter!(INFERENCE_ERRORS_TOTAL).increment(1);
}

pub(crate) fn record_skipped_tick() {
    metrics::counter!(TICKS_SKIPPED_TOTAL).increment(1);
}

pub(crate) fn record_termination(reason: &'static str) {
    metrics::counter!(SESSIONS_TERMINATED_TOTAL, "reason" => reason).increment(1);
}

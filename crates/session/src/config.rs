//! Layered configuration for a proctoring session

use audio_level::AudioConfig;
use detection::DetectionConfig;
use escalation::EscalationConfig;
use media_capture::MediaConfig;
use reporting::ReporterConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use violations::EvaluatorConfig;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error(transparent)]
    Evaluator(#[from] violations::ConfigError),

    #[error(transparent)]
    Detection(#[from] detection::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Controller timing and preflight settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Detection poll interval (ms)
    pub poll_interval_ms: u64,
    /// Delay before redirecting to the instructions page after a failed init (ms)
    pub redirect_delay_ms: u64,
    /// Sample loudness while monitoring, when a microphone was acquired
    pub monitor_audio: bool,
    /// URL fetched by the preflight network probe
    pub network_probe_url: String,
    /// Highest acceptable preflight latency (ms)
    pub max_network_latency_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1200,
            redirect_delay_ms: 2000,
            monitor_audio: true,
            network_probe_url: "https://www.google.com/generate_204".to_string(),
            max_network_latency_ms: 1000,
        }
    }
}

impl SessionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }

    pub fn max_network_latency(&self) -> Duration {
        Duration::from_millis(self.max_network_latency_ms)
    }
}

/// Logging output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Maximum level ("trace" .. "error")
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete session configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProctorConfig {
    pub media: MediaConfig,
    pub detection: DetectionConfig,
    pub evaluator: EvaluatorConfig,
    pub escalation: EscalationConfig,
    pub audio: AudioConfig,
    pub reporter: ReporterConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

impl ProctorConfig {
    /// Load defaults, then an optional file, then `PROCTOR__*` environment
    /// variables (e.g. `PROCTOR__ESCALATION__DEBOUNCE_MS=5000`).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("PROCTOR")
                .separator("__")
                .try_parsing(true),
        );
        Self::finish(builder)
    }

    /// Load from an inline TOML document over the defaults
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml));
        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let config: ProctorConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.evaluator.validate()?;
        self.detection.validate()?;

        if self.escalation.warning_threshold == 0 {
            return Err(ConfigError::Invalid("escalation.warning_threshold must be > 0".into()));
        }
        if self.escalation.critical_after == 0 {
            return Err(ConfigError::Invalid("escalation.critical_after must be > 0".into()));
        }
        if self.session.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("session.poll_interval_ms must be > 0".into()));
        }
        if self.audio.sample_interval_ms == 0 {
            return Err(ConfigError::Invalid("audio.sample_interval_ms must be > 0".into()));
        }
        if self.audio.shout_db < self.audio.loud_db {
            return Err(ConfigError::Invalid(format!(
                "audio.shout_db ({}) must not be below audio.loud_db ({})",
                self.audio.shout_db, self.audio.loud_db
            )));
        }
        if self.audio.shout_consecutive_samples == 0 {
            return Err(ConfigError::Invalid("audio.shout_consecutive_samples must be > 0".into()));
        }
        if self.media.video_ready_timeout_ms == 0 {
            return Err(ConfigError::Invalid("media.video_ready_timeout_ms must be > 0".into()));
        }
        Ok(())
    }
}

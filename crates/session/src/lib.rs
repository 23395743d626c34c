//! Proctoring Session Controller
//!
//! Ties media capture, detection, evaluation, escalation, and reporting
//! into one exam session:
//! - `Initializing -> Ready -> Monitoring -> Terminated`, or `Failed`
//! - Fixed-interval detection ticks that never overlap
//! - DOM signal listeners attached only while monitoring
//! - A single auto-submit signal when the warning threshold is reached

pub mod config;
pub mod controller;
pub mod handle;
pub mod host;
mod monitor;
pub mod preflight;
pub mod state;
pub mod telemetry;

pub use config::{ConfigError, LoggingConfig, ProctorConfig, SessionConfig};
pub use controller::{ProctorSession, SessionPorts, StartOptions, STOPPED_REASON};
pub use handle::SessionHandle;
pub use host::{HostPage, NoSignals, Notice, NoticeLevel, SignalSource};
pub use preflight::{
    check_compatibility, CheckStatus, CompatibilityReport, HttpNetworkProbe, NetworkProbe,
};
pub use state::{AutoSubmit, InitFailure, InitFailureKind, InitPhase, SessionState, Termination};
pub use telemetry::{init_logging, LogFormat};

use thiserror::Error;

/// Session error types
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Proctoring initialization failed: {0}")]
    Init(InitFailure),

    #[error("Session is not running (state: {0})")]
    NotRunning(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Preflight check failed: {0}")]
    Preflight(String),
}

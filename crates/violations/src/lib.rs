//! Violation Evaluation
//!
//! Classifies one poll's detector outputs, one browser signal, or one audio
//! event into zero or more violations. Evaluation is pure: debouncing and
//! counting belong to the escalation state machine.

pub mod config;
pub mod evaluator;
pub mod signals;
pub mod types;

pub use config::{ConfigError, EvaluatorConfig};
pub use evaluator::{evaluate_audio, evaluate_frame, FrameObservation};
pub use signals::{classify_key, evaluate_signal, BrowserSignal, KeyStroke, SignalVerdict};
pub use types::{BlockedKey, Finding, ViolationType};

//! Audio Level Monitor
//!
//! Turns windows of microphone samples into a loudness estimate (dBFS) and
//! classifies each sample into one of three bands. Loud talking fires on a
//! single sample; shouting needs a run of consecutive shouting-band samples.

mod level;
mod monitor;

pub use level::{rms, to_dbfs, SILENCE_DB};
pub use monitor::{AudioConfig, AudioEvent, AudioLevelMonitor, LoudnessBand};

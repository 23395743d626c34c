//! Loudness band classification with a consecutive shouting counter

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::level::{rms, to_dbfs};

/// Audio monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sampling cadence (milliseconds)
    pub sample_interval_ms: u64,

    /// Level at or above which a sample counts as loud talking (dBFS)
    pub loud_db: f32,

    /// Level at or above which a sample is in the shouting band (dBFS)
    pub shout_db: f32,

    /// Consecutive shouting-band samples needed before shouting fires
    pub shout_consecutive_samples: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 1200,
            loud_db: -20.0,
            shout_db: -10.0,
            shout_consecutive_samples: 3,
        }
    }
}

impl AudioConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

/// Loudness band of one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoudnessBand {
    Normal,
    Loud,
    Shouting,
}

/// Audio finding produced by the monitor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioEvent {
    /// A sample in the loud band
    LoudTalking { level_db: f32 },
    /// A full run of shouting-band samples
    Shouting { level_db: f32 },
}

/// Stateful loudness classifier
#[derive(Debug, Clone)]
pub struct AudioLevelMonitor {
    config: AudioConfig,
    consecutive_shouts: u32,
    last_level_db: Option<f32>,
}

impl AudioLevelMonitor {
    pub fn new(config: AudioConfig) -> Self {
        Self {
            config,
            consecutive_shouts: 0,
            last_level_db: None,
        }
    }

    /// Band of a level, without touching the run counter
    pub fn classify(&self, level_db: f32) -> LoudnessBand {
        if level_db >= self.config.shout_db {
            LoudnessBand::Shouting
        } else if level_db >= self.config.loud_db {
            LoudnessBand::Loud
        } else {
            LoudnessBand::Normal
        }
    }

    /// Feed one loudness sample.
    ///
    /// Bands are exclusive: a shouting-band sample reports nothing until it
    /// completes a run, so sustained shouting yields `Shouting` alone.
    pub fn observe_level(&mut self, level_db: f32) -> Option<AudioEvent> {
        self.last_level_db = Some(level_db);

        match self.classify(level_db) {
            LoudnessBand::Normal => {
                self.consecutive_shouts = 0;
                None
            }
            LoudnessBand::Loud => {
                self.consecutive_shouts = 0;
                Some(AudioEvent::LoudTalking { level_db })
            }
            LoudnessBand::Shouting => {
                self.consecutive_shouts += 1;
                debug!(
                    "Shouting-band sample {}/{} at {:.1} dBFS",
                    self.consecutive_shouts, self.config.shout_consecutive_samples, level_db
                );
                if self.consecutive_shouts >= self.config.shout_consecutive_samples {
                    self.consecutive_shouts = 0;
                    Some(AudioEvent::Shouting { level_db })
                } else {
                    None
                }
            }
        }
    }

    /// Feed one window of time-domain samples
    pub fn observe_samples(&mut self, samples: &[f32]) -> Option<AudioEvent> {
        self.observe_level(to_dbfs(rms(samples)))
    }

    pub fn consecutive_shouts(&self) -> u32 {
        self.consecutive_shouts
    }

    pub fn last_level_db(&self) -> Option<f32> {
        self.last_level_db
    }

    pub fn reset(&mut self) {
        self.consecutive_shouts = 0;
        self.last_level_db = None;
    }
}

impl Default for AudioLevelMonitor {
    fn default() -> Self {
        Self::new(AudioConfig::default())
    }
}

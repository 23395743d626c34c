//! Evaluator configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid evaluator configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be within (0, 1], got {value}")]
    RatioOutOfRange { field: &'static str, value: f32 },

    #[error("forbidden_min_confidence must be within [0, 1], got {0}")]
    ConfidenceOutOfRange(f32),
}

/// Violation evaluator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Face box narrower than this fraction of the frame width is too far
    pub min_face_width_ratio: f32,

    /// Nose offset from the face center, as a fraction of face width,
    /// beyond which the candidate is looking away
    pub looking_away_offset_ratio: f32,

    /// Terms matched case-insensitively against anywhere in a detector label
    pub forbidden_labels: Vec<String>,

    /// Minimum detector confidence for a forbidden object to count
    pub forbidden_min_confidence: f32,

    /// Treat blocked keyboard shortcuts as violations
    pub block_keys: bool,

    /// Count right-click as a violation instead of only notifying
    pub context_menu_is_violation: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            min_face_width_ratio: 0.12,
            looking_away_offset_ratio: 0.18,
            forbidden_labels: ["cell phone", "phone", "book", "laptop", "mouse", "keyboard"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            forbidden_min_confidence: 0.5,
            block_keys: true,
            context_menu_is_violation: false,
        }
    }
}

impl EvaluatorConfig {
    /// Create strict config (tighter face geometry, lower object confidence)
    pub fn strict() -> Self {
        Self {
            min_face_width_ratio: 0.15,
            looking_away_offset_ratio: 0.12,
            forbidden_min_confidence: 0.4,
            context_menu_is_violation: true,
            ..Default::default()
        }
    }

    /// Create lenient config (looser geometry, higher object confidence)
    pub fn lenient() -> Self {
        Self {
            min_face_width_ratio: 0.08,
            looking_away_offset_ratio: 0.25,
            forbidden_min_confidence: 0.65,
            ..Default::default()
        }
    }

    /// Whether a label contains any forbidden term
    pub fn is_forbidden(&self, label: &str) -> bool {
        let label = label.to_lowercase();
        self.forbidden_labels
            .iter()
            .map(|term| term.trim().to_lowercase())
            .any(|term| !term.is_empty() && label.contains(&term))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("min_face_width_ratio", self.min_face_width_ratio),
            ("looking_away_offset_ratio", self.looking_away_offset_ratio),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::RatioOutOfRange { field, value });
            }
        }
        if !(0.0..=1.0).contains(&self.forbidden_min_confidence) {
            return Err(ConfigError::ConfidenceOutOfRange(self.forbidden_min_confidence));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        assert!(EvaluatorConfig::default().validate().is_ok());
        assert!(EvaluatorConfig::strict().validate().is_ok());
        assert!(EvaluatorConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_ratio() {
        let config = EvaluatorConfig {
            min_face_width_ratio: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RatioOutOfRange { field: "min_face_width_ratio", .. })
        ));
    }

    #[test]
    fn test_forbidden_labels_case_insensitive() {
        let config = EvaluatorConfig::default();
        assert!(config.is_forbidden("Cell Phone"));
        assert!(config.is_forbidden("book"));
        assert!(!config.is_forbidden("person"));
    }

    #[test]
    fn test_forbidden_terms_match_within_labels() {
        let config = EvaluatorConfig::default();
        assert!(config.is_forbidden("mouse"));
        assert!(config.is_forbidden("Keyboard"));
        assert!(config.is_forbidden("computer mouse"));
        assert!(config.is_forbidden("smartphone"));
        assert!(!config.is_forbidden("cup"));
        assert!(!config.is_forbidden("tv"));
    }

    #[test]
    fn test_blank_term_matches_nothing() {
        let config = EvaluatorConfig {
            forbidden_labels: vec!["  ".to_string()],
            ..Default::default()
        };
        assert!(!config.is_forbidden("person"));
    }
}

//! Escalation State Machine Implementation

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use violations::ViolationType;

/// Escalation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Minimum time between two accepted occurrences of the same type (ms)
    pub debounce_ms: u64,
    /// Session-wide warnings that trigger auto-submit (default: 3)
    pub warning_threshold: u32,
    /// Per-type occurrence at which severity becomes critical (default: 3)
    pub critical_after: u32,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 4000,
            warning_threshold: 3,
            critical_after: 3,
        }
    }
}

impl EscalationConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Severity attached to a reported warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// Debounce state of one violation type
#[derive(Debug, Clone)]
pub struct WarningRecord {
    /// Last time this type was accepted
    pub last_fired: Instant,
    /// Accepted occurrences of this type
    pub occurrences: u32,
}

/// A violation that passed debouncing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedWarning {
    pub violation: ViolationType,
    pub severity: Severity,
    /// Accepted occurrences of this type, including this one
    pub occurrence: u32,
    /// Session-wide warning count after this one
    pub warnings: u32,
}

/// Result of submitting one violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationOutcome {
    /// Same type accepted too recently; nothing changed
    Debounced,
    /// The session already terminated; nothing changed
    Inactive,
    /// Counted and should be reported
    Warned(AcceptedWarning),
    /// Counted, reported, and the threshold was reached
    Terminated { warning: AcceptedWarning, reason: String },
}

impl EscalationOutcome {
    /// The accepted warning, if this outcome counted one
    pub fn accepted(&self) -> Option<&AcceptedWarning> {
        match self {
            EscalationOutcome::Warned(w) | EscalationOutcome::Terminated { warning: w, .. } => {
                Some(w)
            }
            _ => None,
        }
    }
}

/// Debounces violations and counts warnings up to termination
pub struct EscalationStateMachine {
    config: EscalationConfig,
    records: HashMap<ViolationType, WarningRecord>,
    warnings: u32,
    termination: Option<String>,
}

impl EscalationStateMachine {
    pub fn new(config: EscalationConfig) -> Self {
        debug!("Creating escalation state machine with config: {:?}", config);
        Self {
            config,
            records: HashMap::new(),
            warnings: 0,
            termination: None,
        }
    }

    /// Submit one violation observed at `now`
    pub fn on_violation(&mut self, violation: ViolationType, now: Instant) -> EscalationOutcome {
        if self.termination.is_some() {
            debug!("Ignoring {} after termination", violation);
            return EscalationOutcome::Inactive;
        }

        let debounce = self.config.debounce();
        if let Some(record) = self.records.get(&violation) {
            if now.saturating_duration_since(record.last_fired) < debounce {
                debug!("Violation {} debounced", violation);
                return EscalationOutcome::Debounced;
            }
        }

        let record = self.records.entry(violation).or_insert(WarningRecord {
            last_fired: now,
            occurrences: 0,
        });
        record.last_fired = now;
        record.occurrences += 1;

        let severity = if record.occurrences >= self.config.critical_after {
            Severity::Critical
        } else {
            Severity::Warning
        };

        self.warnings += 1;
        let warning = AcceptedWarning {
            violation,
            severity,
            occurrence: record.occurrences,
            warnings: self.warnings,
        };

        info!(
            "Warning {}/{}: {} ({}, occurrence {})",
            self.warnings,
            self.config.warning_threshold,
            violation,
            severity.as_str(),
            record.occurrences
        );

        if self.warnings >= self.config.warning_threshold {
            let reason = format!(
                "Multiple violations detected - exam terminated (last: {})",
                violation.description()
            );
            warn!("Warning threshold reached: {}", reason);
            self.termination = Some(reason.clone());
            EscalationOutcome::Terminated { warning, reason }
        } else {
            EscalationOutcome::Warned(warning)
        }
    }

    /// Session-wide warning count
    pub fn warnings(&self) -> u32 {
        self.warnings
    }

    pub fn is_terminated(&self) -> bool {
        self.termination.is_some()
    }

    pub fn termination_reason(&self) -> Option<&str> {
        self.termination.as_deref()
    }

    /// Accepted occurrences of one type
    pub fn occurrences(&self, violation: ViolationType) -> u32 {
        self.records.get(&violation).map(|r| r.occurrences).unwrap_or(0)
    }

    pub fn config(&self) -> &EscalationConfig {
        &self.config
    }
}

impl Default for EscalationStateMachine {
    fn default() -> Self {
        Self::new(EscalationConfig::default())
    }
}

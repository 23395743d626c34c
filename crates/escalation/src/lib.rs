//! Warning Escalation
//!
//! Provides violation debouncing, per-type severity escalation, and the
//! session-wide warning counter that decides when an exam is auto-submitted.

mod machine;

pub use machine::{
    AcceptedWarning, EscalationConfig, EscalationOutcome, EscalationStateMachine, Severity,
    WarningRecord,
};

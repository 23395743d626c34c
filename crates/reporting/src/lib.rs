//! Proctor Event Reporting
//!
//! Forwards each accepted warning to the exam API:
//! - `POST {base_url}/attempts/proctor` with a bearer token
//! - One request per accepted (non-debounced) violation
//! - Never awaited by the detection loop; failures are only logged

mod client;

pub use client::{spawn_report, EventReporter, HttpEventReporter, StaticToken, TokenProvider};

use escalation::{AcceptedWarning, Severity};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use violations::ViolationType;

/// Reporting error types
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server rejected event with status {0}")]
    Status(u16),

    #[error("No bearer token available")]
    MissingToken,
}

/// Reporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// API base URL (e.g. "https://exams.example.com/api")
    pub base_url: String,
    /// Path appended to the base URL
    pub endpoint: String,
    /// Per-request timeout (milliseconds)
    pub timeout_ms: u64,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            endpoint: "/attempts/proctor".to_string(),
            timeout_ms: 5000,
        }
    }
}

impl ReporterConfig {
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        )
    }
}

/// Event body nested in a report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProctorEvent {
    #[serde(rename = "type")]
    pub kind: ViolationType,
    pub severity: Severity,
}

/// Request body for one accepted warning
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProctorEventReport {
    pub exam_id: String,
    pub proctor_event: ProctorEvent,
}

impl ProctorEventReport {
    pub fn new(exam_id: impl Into<String>, warning: &AcceptedWarning) -> Self {
        Self {
            exam_id: exam_id.into(),
            proctor_event: ProctorEvent {
                kind: warning.violation,
                severity: warning.severity,
            },
        }
    }
}

//! HTTP reporter and fire-and-forget dispatch

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{ProctorEventReport, ReportError, ReporterConfig};

/// Supplies the bearer token for API calls
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Option<String>;
}

/// Fixed token, for hosts that already hold one
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Destination for accepted warnings
#[async_trait]
pub trait EventReporter: Send + Sync {
    async fn report(&self, report: &ProctorEventReport) -> Result<(), ReportError>;
}

/// Reporter posting JSON to the exam API
pub struct HttpEventReporter {
    client: Client,
    url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpEventReporter {
    pub fn new(
        config: &ReporterConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, ReportError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ReportError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url(),
            tokens,
        })
    }
}

#[async_trait]
impl EventReporter for HttpEventReporter {
    async fn report(&self, report: &ProctorEventReport) -> Result<(), ReportError> {
        let token = self.tokens.bearer_token().await.ok_or(ReportError::MissingToken)?;

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(token)
            .json(report)
            .send()
            .await
            .map_err(|e| ReportError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// Send a report in the background. The caller never waits on delivery and
/// failures are logged, not returned.
pub fn spawn_report(
    reporter: Arc<dyn EventReporter>,
    report: ProctorEventReport,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match reporter.report(&report).await {
            Ok(()) => debug!(
                "Reported {} ({}) for exam {}",
                report.proctor_event.kind,
                report.proctor_event.severity.as_str(),
                report.exam_id
            ),
            Err(e) => warn!(
                "Failed to report {} for exam {}: {}",
                report.proctor_event.kind, report.exam_id, e
            ),
        }
    })
}

//! Host-facing session handle

use media_capture::VideoSurface;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::{AutoSubmit, SessionState};
use crate::SessionError;

/// Handle to a running (or disabled) proctoring session.
///
/// Dropping the handle stops the session.
pub struct SessionHandle {
    pub(crate) session_id: Uuid,
    pub(crate) exam_id: String,
    pub(crate) surface: Arc<dyn VideoSurface>,
    pub(crate) state_rx: watch::Receiver<SessionState>,
    pub(crate) warnings_rx: watch::Receiver<u32>,
    pub(crate) start_tx: Option<watch::Sender<bool>>,
    pub(crate) auto_submit_rx: Option<oneshot::Receiver<AutoSubmit>>,
    pub(crate) cancel: CancellationToken,
    pub(crate) task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub(crate) fn disabled(
        session_id: Uuid,
        exam_id: String,
        surface: Arc<dyn VideoSurface>,
    ) -> Self {
        let (_, state_rx) = watch::channel(SessionState::Disabled);
        let (_, warnings_rx) = watch::channel(0);
        Self {
            session_id,
            exam_id,
            surface,
            state_rx,
            warnings_rx,
            start_tx: None,
            auto_submit_rx: None,
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn exam_id(&self) -> &str {
        &self.exam_id
    }

    /// Current state snapshot
    pub fn state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    /// Warnings accepted so far
    pub fn warning_count(&self) -> u32 {
        *self.warnings_rx.borrow()
    }

    /// Render surface the camera is attached to
    pub fn surface(&self) -> &Arc<dyn VideoSurface> {
        &self.surface
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    pub fn subscribe_warnings(&self) -> watch::Receiver<u32> {
        self.warnings_rx.clone()
    }

    /// Wait until initialization finishes.
    ///
    /// Resolves once the session is `Ready` or `Monitoring`; an init failure
    /// is returned as [`SessionError::Init`].
    pub async fn wait_ready(&self) -> Result<(), SessionError> {
        let mut state_rx = self.state_rx.clone();
        let state = match state_rx
            .wait_for(|state| !matches!(state, SessionState::Initializing(_)))
            .await
        {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };

        match state {
            SessionState::Ready | SessionState::Monitoring => Ok(()),
            SessionState::Failed(failure) => Err(SessionError::Init(failure)),
            other => Err(SessionError::NotRunning(other.name())),
        }
    }

    /// Begin the poll loop of a session started without auto-start
    pub fn start_monitoring(&self) -> Result<(), SessionError> {
        let state = self.state();
        let Some(start_tx) = self.start_tx.as_ref().filter(|_| !state.is_terminal()) else {
            return Err(SessionError::NotRunning(state.name()));
        };
        if !start_tx.send_replace(true) {
            info!("Monitoring start requested");
        }
        Ok(())
    }

    /// Wait for the auto-submit signal.
    ///
    /// Yields the signal once; `None` when the session ended any other way
    /// or the signal was already taken.
    pub async fn auto_submitted(&mut self) -> Option<AutoSubmit> {
        let auto_submit_rx = self.auto_submit_rx.take()?;
        auto_submit_rx.await.ok()
    }

    /// Stop the session and wait for teardown. Safe to call repeatedly.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        let Some(task) = self.task.take() else {
            debug!("Session {} already stopped", self.session_id);
            return;
        };
        if let Err(e) = task.await {
            warn!("Session task ended abnormally: {}", e);
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

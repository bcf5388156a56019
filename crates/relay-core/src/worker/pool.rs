//! Session pool: a single slot holding the current worker session, keyed
//! by launch configuration.
//!
//! A request whose configuration matches the held session reuses its live
//! process. A request with a different configuration disposes the held
//! session and installs a fresh one, so switching launch arguments or the
//! working directory is implicitly destructive to the previous worker.

use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use super::config::LaunchConfig;
use super::error::SessionResult;
use super::protocol::TurnOutput;
use super::session::{LineObserver, WorkerSession};

/// Holds at most one live [`WorkerSession`] at a time.
#[derive(Default)]
pub struct SessionPool {
    slot: Mutex<Option<WorkerSession>>,
}

impl SessionPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the session for `config` and send one turn through it.
    ///
    /// See [`WorkerSession::prompt`] for the turn semantics. Concurrent
    /// calls against the *same* configuration contend on the single
    /// session and the loser fails with [`SessionError::Busy`](super::SessionError::Busy).
    pub async fn prompt(
        &self,
        config: &LaunchConfig,
        text: &str,
        timeout: Duration,
        observer: Option<LineObserver>,
    ) -> SessionResult<TurnOutput> {
        let session = self.checkout(config).await;
        session.prompt(text, timeout, observer).await
    }

    /// Return the held session if its key matches, otherwise dispose it
    /// and install a fresh session for `config`.
    ///
    /// Disposal and replacement happen under one lock acquisition so two
    /// sessions never coexist in the slot.
    async fn checkout(&self, config: &LaunchConfig) -> WorkerSession {
        let mut slot = self.slot.lock().await;
        if let Some(session) = slot.as_ref() {
            if session.config().identity_key() == config.identity_key() {
                return session.clone();
            }
            debug!(
                program = %config.program,
                "launch configuration changed; disposing current worker session"
            );
            let old = slot.take().expect("checked above");
            old.dispose().await;
        }
        let session = WorkerSession::new(config.clone());
        *slot = Some(session.clone());
        session
    }

    /// Dispose the held session, if any, and clear the slot. The next
    /// prompt starts a fresh worker.
    pub async fn reset(&self) {
        let session = self.slot.lock().await.take();
        if let Some(session) = session {
            debug!("resetting session pool");
            session.dispose().await;
        }
    }
}

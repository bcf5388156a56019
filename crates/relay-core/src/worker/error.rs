//! Session-specific error types.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Result type for worker session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors a prompt can fail with.
///
/// Process-level anomalies (stderr content, non-zero exit codes) are *not*
/// errors; they come back as data inside a successful
/// [`TurnOutput`](super::TurnOutput) so the caller can classify them.
#[derive(Error, Debug)]
pub enum SessionError {
    /// A prompt was issued while another was already in flight on the same
    /// session. Never queued; the caller retries after the prior turn
    /// resolves or uses a different launch configuration.
    #[error("a prompt is already in flight on this session")]
    Busy,

    /// No end-of-turn signal arrived within the capped timeout. The worker
    /// process has been killed; the session respawns it on the next prompt.
    #[error("no end-of-turn signal within {0:?}; worker process killed")]
    Timeout(Duration),

    /// The worker process could not be started. The session will retry
    /// spawning on the next prompt.
    #[error("failed to spawn worker process `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Failed to write the prompt message to the worker's stdin.
    #[error("failed to write prompt to worker stdin: {0}")]
    Write(#[source] io::Error),

    /// Failed to encode the prompt message as JSON.
    #[error("failed to encode prompt message: {0}")]
    Encode(#[source] serde_json::Error),

    /// The session was disposed while this prompt was in flight.
    #[error("session was disposed while a prompt was in flight")]
    Disposed,
}

impl SessionError {
    /// Whether the caller may retry the prompt on the same session and
    /// expect the worker to be respawned.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Spawn { .. } | Self::Write(_) | Self::Disposed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_is_not_retriable() {
        assert!(!SessionError::Busy.is_retriable());
    }

    #[test]
    fn timeout_is_retriable() {
        assert!(SessionError::Timeout(Duration::from_millis(50)).is_retriable());
    }

    #[test]
    fn display_names_the_program_on_spawn_failure() {
        let err = SessionError::Spawn {
            program: "/no/such/worker".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/no/such/worker"), "got: {msg}");
    }
}

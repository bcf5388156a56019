//! Worker session: owns one worker process and its line protocol state.
//!
//! A session lazily spawns its process on the first prompt and keeps it
//! alive across turns. At most one turn is in flight at a time; a second
//! prompt while one is pending fails with [`SessionError::Busy`] rather
//! than queueing. A turn resolves through exactly one of: the `agent_end`
//! marker, process exit, or the capped timeout.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use super::config::LaunchConfig;
use super::error::{SessionError, SessionResult};
use super::protocol::{LineEvent, OutboundMessage, TurnOutput, classify_line};

/// Hard cap on any caller-supplied turn timeout. Bounds worst-case
/// staleness regardless of what the caller asks for.
pub const MAX_TURN_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Per-line callback invoked with every raw stdout line while a turn is in
/// flight, including non-terminal and non-JSON lines.
pub type LineObserver = Box<dyn Fn(&str) + Send + Sync>;

/// Bookkeeping for the one in-flight turn.
struct PendingTurn {
    tx: oneshot::Sender<TurnOutput>,
    observer: Option<LineObserver>,
}

/// Mutable session state, shared with the reader tasks.
#[derive(Default)]
struct Inner {
    child: Option<Child>,
    stdin: Option<BufWriter<ChildStdin>>,
    /// Stdout lines buffered since the last marker-path resolution.
    lines: Vec<String>,
    /// Stderr text accumulated over the lifetime of the process.
    stderr_text: String,
    pending: Option<PendingTurn>,
    stdout_task: Option<JoinHandle<()>>,
    stderr_task: Option<JoinHandle<()>>,
}

/// One worker process and the line protocol spoken with it.
///
/// Cheap to clone; clones share the same underlying process and state.
#[derive(Clone)]
pub struct WorkerSession {
    config: LaunchConfig,
    inner: Arc<Mutex<Inner>>,
}

impl WorkerSession {
    /// Create a session for the given launch configuration. The process is
    /// not spawned until the first [`prompt`](Self::prompt).
    pub fn new(config: LaunchConfig) -> Self {
        Self {
            config,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// The configuration this session was created with.
    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }

    /// Whether two handles share the same underlying session state.
    #[cfg(test)]
    pub(crate) fn shares_state_with(&self, other: &WorkerSession) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Send one user turn to the worker and wait for it to resolve.
    ///
    /// Spawns the worker process if it is not already running. The timeout
    /// is capped at [`MAX_TURN_TIMEOUT`]; when it fires, the worker is
    /// hard-killed and the session respawns it lazily on the next prompt.
    pub async fn prompt(
        &self,
        text: &str,
        timeout: Duration,
        observer: Option<LineObserver>,
    ) -> SessionResult<TurnOutput> {
        let turn_id = Uuid::new_v4();
        let line = OutboundMessage::user_prompt(text)
            .to_line()
            .map_err(SessionError::Encode)?;

        let rx = {
            let mut inner = self.inner.lock().await;
            if inner.pending.is_some() {
                return Err(SessionError::Busy);
            }
            self.start_locked(&mut inner)?;

            // Register the pending slot before writing so lines that race
            // the write are still buffered for this turn.
            let (tx, rx) = oneshot::channel();
            inner.pending = Some(PendingTurn { tx, observer });

            let stdin = inner.stdin.as_mut().expect("stdin captured at spawn");
            let write = async {
                stdin.write_all(line.as_bytes()).await?;
                stdin.write_all(b"\n").await?;
                stdin.flush().await
            };
            if let Err(e) = write.await {
                inner.pending = None;
                return Err(SessionError::Write(e));
            }
            rx
        };

        let capped = timeout.min(MAX_TURN_TIMEOUT);
        debug!(%turn_id, timeout = ?capped, "turn started");

        match tokio::time::timeout(capped, rx).await {
            Ok(Ok(output)) => {
                debug!(
                    %turn_id,
                    exit_code = output.exit_code,
                    lines = output.stdout.lines().count(),
                    "turn resolved"
                );
                Ok(output)
            }
            // Sender dropped without resolving: the session was disposed
            // out from under this turn.
            Ok(Err(_)) => Err(SessionError::Disposed),
            Err(_) => {
                warn!(%turn_id, timeout = ?capped, "turn timed out; killing worker process");
                self.kill_for_timeout().await;
                Err(SessionError::Timeout(capped))
            }
        }
    }

    /// Spawn the worker process if it is not already running. Idempotent.
    /// Must be called with the state lock held.
    fn start_locked(&self, inner: &mut Inner) -> SessionResult<()> {
        if inner.child.is_some() {
            return Ok(());
        }

        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args);
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| SessionError::Spawn {
            program: self.config.program.clone(),
            source,
        })?;

        let stdin = child.stdin.take().expect("stdin not captured");
        let stdout = child.stdout.take().expect("stdout not captured");
        let stderr = child.stderr.take().expect("stderr not captured");

        debug!(program = %self.config.program, pid = ?child.id(), "worker process started");

        inner.stdin = Some(BufWriter::new(stdin));
        inner.child = Some(child);
        inner.stdout_task = Some(tokio::spawn(read_stdout(stdout, Arc::clone(&self.inner))));
        inner.stderr_task = Some(tokio::spawn(read_stderr(stderr, Arc::clone(&self.inner))));
        Ok(())
    }

    /// Timeout path: clear the pending slot and the buffered turn output,
    /// stop the reader tasks, and hard-kill the process. The session
    /// respawns lazily on the next prompt.
    async fn kill_for_timeout(&self) {
        let (child, stdout_task, stderr_task) = {
            let mut inner = self.inner.lock().await;
            inner.pending = None;
            inner.stdin = None;
            inner.lines.clear();
            (
                inner.child.take(),
                inner.stdout_task.take(),
                inner.stderr_task.take(),
            )
        };
        // Stop the readers before killing the process: a grandchild of the
        // killed worker can hold the stdout pipe open past the kill, and a
        // stale reader reaching EOF later must not tear down state that by
        // then belongs to a respawned process.
        if let Some(task) = stdout_task {
            task.abort();
        }
        if let Some(task) = stderr_task {
            task.abort();
        }
        if let Some(mut child) = child {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }

    /// Tear down the session: stop the reader tasks, kill the process if
    /// still alive, and reset all buffers. Idempotent.
    ///
    /// An in-flight prompt, if any, resolves with
    /// [`SessionError::Disposed`].
    pub async fn dispose(&self) {
        let (child, stdout_task, stderr_task) = {
            let mut inner = self.inner.lock().await;
            inner.pending = None;
            inner.stdin = None;
            inner.lines.clear();
            inner.stderr_text.clear();
            (
                inner.child.take(),
                inner.stdout_task.take(),
                inner.stderr_task.take(),
            )
        };
        if let Some(task) = stdout_task {
            task.abort();
        }
        if let Some(task) = stderr_task {
            task.abort();
        }
        if let Some(mut child) = child {
            let _ = child.start_kill();
            let _ = child.wait().await;
            debug!(program = %self.config.program, "worker process killed on dispose");
        }
    }
}

/// Read stdout line by line until EOF, buffering and resolving turns.
async fn read_stdout(stdout: ChildStdout, inner: Arc<Mutex<Inner>>) {
    let mut lines = BufReader::new(stdout).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "error reading worker stdout; treating stream as closed");
                break;
            }
        };

        let mut guard = inner.lock().await;

        // Lines arriving with no turn in flight are dropped.
        if guard.pending.is_none() {
            trace!(line = %line, "dropping worker line with no turn in flight");
            continue;
        }

        guard.lines.push(line.clone());
        if let Some(observer) = guard.pending.as_ref().and_then(|p| p.observer.as_ref()) {
            observer(&line);
        }

        if matches!(classify_line(&line), LineEvent::EndOfTurn) {
            let Some(pending) = guard.pending.take() else {
                continue;
            };
            let stdout_text = guard.lines.join("\n");
            guard.lines.clear();
            let output = TurnOutput::completed(stdout_text, guard.stderr_text.clone());
            drop(guard);
            let _ = pending.tx.send(output);
        }
    }

    // EOF: the worker exited (or was killed). Reap it outside the lock.
    let child = {
        let mut guard = inner.lock().await;
        guard.stdin = None;
        guard.child.take()
    };
    let status = match child {
        Some(mut child) => child.wait().await.ok(),
        None => None,
    };

    let mut guard = inner.lock().await;
    if let Some(pending) = guard.pending.take() {
        // Exit is a valid completion signal, not a failure: resolve with
        // whatever was buffered. The exit code defaults to 0 when unknown.
        // Unlike marker-path resolution, the line buffer is left in place.
        let exit_code = status.as_ref().and_then(|s| s.code()).unwrap_or(0);
        let signal = exit_signal(status.as_ref());
        let output = TurnOutput {
            stdout: guard.lines.join("\n"),
            stderr: guard.stderr_text.clone(),
            exit_code,
            signal,
            killed: signal.is_some(),
        };
        debug!(exit_code, ?signal, "worker exited with a turn in flight; resolving with buffered output");
        drop(guard);
        let _ = pending.tx.send(output);
    } else {
        trace!("worker stdout closed with no turn in flight");
    }
}

/// Accumulate stderr text for the lifetime of the process.
async fn read_stderr(stderr: ChildStderr, inner: Arc<Mutex<Inner>>) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut guard = inner.lock().await;
        guard.stderr_text.push_str(&line);
        guard.stderr_text.push('\n');
    }
}

#[cfg(unix)]
fn exit_signal(status: Option<&std::process::ExitStatus>) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.and_then(|s| s.signal())
}

#[cfg(not(unix))]
fn exit_signal(_status: Option<&std::process::ExitStatus>) -> Option<i32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_failure_surfaces_as_failed_prompt() {
        let session = WorkerSession::new(LaunchConfig::new("/nonexistent/relay-worker"));
        let err = session
            .prompt("hello", Duration::from_secs(1), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Spawn { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn spawn_failure_leaves_session_usable() {
        let session = WorkerSession::new(LaunchConfig::new("/nonexistent/relay-worker"));
        for _ in 0..2 {
            let err = session
                .prompt("hello", Duration::from_secs(1), None)
                .await
                .unwrap_err();
            assert!(matches!(err, SessionError::Spawn { .. }));
        }
    }

    #[tokio::test]
    async fn dispose_is_idempotent_on_fresh_session() {
        let session = WorkerSession::new(LaunchConfig::new("worker"));
        session.dispose().await;
        session.dispose().await;
    }

    #[test]
    fn timeout_cap_is_five_minutes() {
        assert_eq!(MAX_TURN_TIMEOUT, Duration::from_secs(300));
    }
}

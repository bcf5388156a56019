//! Shared test utilities for relay integration tests.
//!
//! Provides fake worker processes: small `/bin/sh` scripts written to a
//! temp directory that speak the line-delimited JSON protocol on
//! stdin/stdout. Each helper returns the [`TempDir`] (keep it alive for
//! the duration of the test) and a [`LaunchConfig`] pointing at the
//! script.

use std::path::Path;

use tempfile::TempDir;

use relay_core::worker::LaunchConfig;

/// Write an executable shell script with the given body and return a
/// launch configuration pointing at it.
pub fn script_worker(body: &str) -> (TempDir, LaunchConfig) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("fake_worker.sh");
    let script = format!("#!/bin/sh\n{body}");
    std::fs::write(&path, script).expect("failed to write worker script");
    make_executable(&path);
    let config = LaunchConfig::new(path.to_str().expect("non-UTF-8 temp path"));
    (dir, config)
}

/// A worker that stays alive across turns. For each prompt line it reads,
/// it emits a progress event carrying a monotonically increasing
/// in-process counter, then the end-of-turn marker.
///
/// The counter makes process reuse observable: a respawned worker starts
/// counting from 1 again.
pub fn end_marker_worker() -> (TempDir, LaunchConfig) {
    script_worker(
        "n=0\n\
         while read line; do\n\
           n=$((n+1))\n\
           echo \"{\\\"type\\\":\\\"note\\\",\\\"turn\\\":$n}\"\n\
           echo '{\"type\":\"agent_end\"}'\n\
         done\n",
    )
}

/// A worker that emits a trailing line after each end-of-turn marker. The
/// trailing line arrives with no turn in flight and must be dropped.
pub fn trailing_line_worker() -> (TempDir, LaunchConfig) {
    script_worker(
        "while read line; do\n\
           echo '{\"type\":\"progress\"}'\n\
           echo '{\"type\":\"agent_end\"}'\n\
           echo 'ignored-trailing-line'\n\
         done\n",
    )
}

/// A worker that answers one prompt with plain-text lines and then exits
/// with the given code, never emitting an end-of-turn marker.
pub fn exit_worker(lines: &[&str], code: i32) -> (TempDir, LaunchConfig) {
    let echoes: String = lines
        .iter()
        .map(|l| format!("echo '{l}'\n"))
        .collect();
    script_worker(&format!("read line\n{echoes}exit {code}\n"))
}

/// A worker that reads prompts but never answers.
pub fn silent_worker() -> (TempDir, LaunchConfig) {
    script_worker("while read line; do :; done\n")
}

/// A worker that mixes non-JSON noise with JSON events before the marker.
pub fn noise_worker() -> (TempDir, LaunchConfig) {
    script_worker(
        "while read line; do\n\
           echo 'plain text, not json'\n\
           echo '{\"type\":\"progress\",\"pct\":50}'\n\
           echo '{\"type\":\"agent_end\"}'\n\
         done\n",
    )
}

/// A worker that writes diagnostics to stderr before completing each turn.
///
/// Sleeps between the stderr write and the marker so the stderr line is
/// ingested before the turn resolves (the two pipes are read
/// independently).
pub fn stderr_worker() -> (TempDir, LaunchConfig) {
    script_worker(
        "while read line; do\n\
           echo 'diagnostic output' >&2\n\
           sleep 1\n\
           echo '{\"type\":\"agent_end\"}'\n\
         done\n",
    )
}

fn make_executable(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .expect("failed to set script permissions");
    }
    #[cfg(not(unix))]
    let _ = path;
}

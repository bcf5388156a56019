//! Launch configuration: the immutable identity that keys session reuse.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// How to launch a worker process: program, arguments, and an optional
/// working directory.
///
/// Two configurations with the same [`identity_key`](Self::identity_key)
/// are interchangeable and a live session is reused between them. Any
/// difference (program, argument list, or working directory) produces a
/// different key, and the pool will dispose the old worker before starting
/// a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// Path to the worker binary (resolved via `$PATH` if bare).
    pub program: String,
    /// Arguments passed to the worker.
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory for the worker. `None` inherits the caller's.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl LaunchConfig {
    /// Create a configuration with no arguments and an inherited working
    /// directory.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Builder-style argument list.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Builder-style working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Deterministic identity for this configuration.
    ///
    /// SHA-256 over the program, each argument, and the working directory,
    /// with a NUL separator between fields so that `["ab"]` and
    /// `["a", "b"]` hash differently. Hex-encoded.
    pub fn identity_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.program.as_bytes());
        hasher.update([0u8]);
        for arg in &self.args {
            hasher.update(arg.as_bytes());
            hasher.update([0u8]);
        }
        if let Some(dir) = &self.working_dir {
            hasher.update(dir.to_string_lossy().as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_key_is_deterministic() {
        let a = LaunchConfig::new("worker").with_args(["--fast"]);
        let b = LaunchConfig::new("worker").with_args(["--fast"]);
        assert_eq!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn identity_key_changes_with_program() {
        let a = LaunchConfig::new("worker-a");
        let b = LaunchConfig::new("worker-b");
        assert_ne!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn identity_key_changes_with_args() {
        let a = LaunchConfig::new("worker").with_args(["--fast"]);
        let b = LaunchConfig::new("worker").with_args(["--slow"]);
        assert_ne!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn identity_key_changes_with_working_dir() {
        let a = LaunchConfig::new("worker");
        let b = LaunchConfig::new("worker").with_working_dir("/tmp");
        assert_ne!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn identity_key_separates_argument_boundaries() {
        let a = LaunchConfig::new("worker").with_args(["ab"]);
        let b = LaunchConfig::new("worker").with_args(["a", "b"]);
        assert_ne!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn identity_key_is_hex_sha256() {
        let key = LaunchConfig::new("worker").identity_key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

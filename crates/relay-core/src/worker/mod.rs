//! Worker process client: one session, one child process, one turn at a time.
//!
//! # Architecture
//!
//! ```text
//! caller
//!   |
//!   v
//! SessionPool --identity_key(config)--> WorkerSession (at most one held)
//!                                            |
//!                              prompt(text, timeout, observer)
//!                                            |
//!                     +----------------------+---------------------+
//!                     |                      |                     |
//!               stdin: one JSON       stdout reader task     stderr task
//!               line per turn         buffers lines,         accumulates
//!                                     resolves on            free-form text
//!                                     "agent_end" or EOF
//! ```
//!
//! A turn resolves through exactly one of three terminal events: the
//! `agent_end` marker parsed from stdout (process stays alive for reuse),
//! process exit (whatever was buffered becomes the result), or the capped
//! timeout (process is hard-killed, caller gets [`SessionError::Timeout`]).

pub mod config;
pub mod error;
pub mod pool;
pub mod protocol;
pub mod session;

pub use config::LaunchConfig;
pub use error::{SessionError, SessionResult};
pub use pool::SessionPool;
pub use protocol::{LineEvent, TurnOutput};
pub use session::{LineObserver, WorkerSession};

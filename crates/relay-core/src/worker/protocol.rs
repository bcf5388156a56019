//! Wire format spoken with the worker process.
//!
//! Outbound: one JSON object per line on the worker's stdin, carrying a
//! single user turn. Inbound: zero or more lines on stdout, each
//! *optionally* parseable as JSON. Only a parsed object whose `type` is
//! `"agent_end"` ends a turn; every other line (JSON or not) is opaque
//! content that is buffered verbatim and forwarded to the observer.

use serde::Serialize;
use serde_json::Value;

/// The inbound event type that marks the end of a turn.
pub const END_OF_TURN_TYPE: &str = "agent_end";

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Top-level message written to the worker's stdin.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// One user turn.
    Prompt { message: TurnMessage },
}

/// A chat-style message with role and content blocks.
#[derive(Debug, Clone, Serialize)]
pub struct TurnMessage {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

/// A single content block within a message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
}

impl OutboundMessage {
    /// Build the prompt envelope for one user turn.
    pub fn user_prompt(text: impl Into<String>) -> Self {
        Self::Prompt {
            message: TurnMessage {
                role: "user".to_string(),
                content: vec![ContentBlock::Text { text: text.into() }],
            },
        }
    }

    /// Serialize to a single protocol line (no trailing newline).
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Classification of one stdout line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineEvent {
    /// Parsed JSON with `type == "agent_end"`: the current turn is done.
    EndOfTurn,
    /// Any other valid JSON object: opaque progress/content.
    Event(Value),
    /// Not valid JSON. Tolerated, never an error; still buffered and
    /// forwarded to the observer.
    Raw,
}

/// Classify a single line read from the worker's stdout.
pub fn classify_line(line: &str) -> LineEvent {
    match serde_json::from_str::<Value>(line) {
        Ok(v) if v.get("type").and_then(|t| t.as_str()) == Some(END_OF_TURN_TYPE) => {
            LineEvent::EndOfTurn
        }
        Ok(v) => LineEvent::Event(v),
        Err(_) => LineEvent::Raw,
    }
}

// ---------------------------------------------------------------------------
// Turn result
// ---------------------------------------------------------------------------

/// The resolved result of one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutput {
    /// All buffered stdout lines since the last resolution, newline-joined.
    pub stdout: String,
    /// Stderr text accumulated over the lifetime of the worker process.
    pub stderr: String,
    /// Exit code when the turn resolved via process exit; `0` for
    /// marker-path resolution or when the code is unknown.
    pub exit_code: i32,
    /// Signal that terminated the process, if any (Unix only).
    pub signal: Option<i32>,
    /// Whether the process died by signal.
    pub killed: bool,
}

impl TurnOutput {
    /// A marker-path result: the worker is still alive, exit code 0.
    pub(crate) fn completed(stdout: String, stderr: String) -> Self {
        Self {
            stdout,
            stderr,
            exit_code: 0,
            signal: None,
            killed: false,
        }
    }
}

//! Core library for relay: a single-session client for long-lived
//! coding-agent worker processes.
//!
//! The only component that matters here is [`worker`]: it owns one external
//! worker process, speaks a line-delimited JSON protocol over its
//! stdin/stdout, and turns the unbounded output stream into discrete
//! completed turns. Everything else in the surrounding system (chat
//! transports, media persistence, service managers) calls into this crate
//! through [`worker::SessionPool`].

pub mod worker;

pub use worker::{LaunchConfig, SessionError, SessionPool, TurnOutput, WorkerSession};

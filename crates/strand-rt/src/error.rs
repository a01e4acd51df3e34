// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Error types surfaced by the dispatcher API.

use thiserror::Error;

/// Why an invocation could not be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnqueueError {
    #[error("dispatch queue is full ({capacity} messages)")]
    Full { capacity: usize },

    #[error("dispatcher has terminated; no further work is accepted")]
    Terminated,
}

/// Why `Turn::await_blocking` could not hand the turn back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error("await called while the task does not hold the turn")]
    NotActive,

    #[error("dispatcher terminated before the task could be resumed")]
    Terminated,
}

/// Invalid dispatcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("queue capacity must be at least 1, got {0}")]
    InvalidCapacity(usize),

    #[error("invalid value `{value}` for {key}")]
    Parse { key: &'static str, value: String },

    #[error("thread prefix must not be empty")]
    EmptyThreadPrefix,
}

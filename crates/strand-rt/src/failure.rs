// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Failure containment.
//!
//! A task body that panics never takes the dispatcher down. What happens
//! to the failure depends on whether the task held the turn at the time.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::message::TaskId;

/// Which side of an await the failure happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Panicked while holding the turn. Ends the turn; the dispatcher logs it.
    Observed,
    /// Panicked after releasing the turn. No turn ends, no resumption is
    /// queued; the task is gone.
    Abandoned,
}

/// A contained task panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub task: TaskId,
    pub kind: FailureKind,
    pub message: String,
}

impl TaskFailure {
    pub(crate) fn new(task: TaskId, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            task,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Observed => write!(f, "{} failed: {}", self.task, self.message),
            FailureKind::Abandoned => {
                write!(f, "{} abandoned in background: {}", self.task, self.message)
            }
        }
    }
}

impl std::error::Error for TaskFailure {}

/// Run `f`, converting a panic into its rendered message.
pub(crate) fn contain<R>(f: impl FnOnce() -> R) -> Result<R, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

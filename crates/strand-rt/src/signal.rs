// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Suspend signal: how a task tells the dispatcher its turn is over.
//!
//! Single slot. Only the task holding the open turn ever sends, and the
//! dispatcher takes the value before it opens another turn.

use tracing::debug;

use crate::channel::{self, Receiver, Sender};
use crate::failure::TaskFailure;
use crate::message::TaskId;

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Released in `await_blocking`; the task continues in the background.
    Suspended,
    /// The body returned.
    Completed,
    /// The body panicked while holding the turn.
    Failed(TaskFailure),
}

impl TurnOutcome {
    /// The failure carried by this outcome, if any.
    pub fn failure(&self) -> Option<&TaskFailure> {
        match self {
            TurnOutcome::Failed(f) => Some(f),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnEnd {
    pub task: TaskId,
    pub outcome: TurnOutcome,
}

/// Task-side half. Cloned into every task thread.
#[derive(Debug, Clone)]
pub(crate) struct SuspendSender {
    tx: Sender<TurnEnd>,
}

/// Dispatcher-side half.
#[derive(Debug)]
pub(crate) struct SuspendReceiver {
    rx: Receiver<TurnEnd>,
}

pub(crate) fn suspend_signal() -> (SuspendSender, SuspendReceiver) {
    let (tx, rx) = channel::buffered(1);
    (SuspendSender { tx }, SuspendReceiver { rx })
}

impl SuspendSender {
    pub(crate) fn end_turn(&self, task: TaskId, outcome: TurnOutcome) {
        if self.tx.send(TurnEnd { task, outcome }).is_err() {
            debug!(%task, "dispatcher gone; turn end dropped");
        }
    }
}

impl SuspendReceiver {
    /// Block until the open turn ends. `None` once every sender is gone.
    pub(crate) fn wait(&self) -> Option<TurnEnd> {
        self.rx.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::FailureKind;

    #[test]
    fn carries_optional_failure() {
        let (tx, rx) = suspend_signal();
        tx.end_turn(TaskId(1), TurnOutcome::Suspended);
        let end = rx.wait().unwrap();
        assert_eq!(end.task, TaskId(1));
        assert!(end.outcome.failure().is_none());

        let failure = TaskFailure::new(TaskId(2), FailureKind::Observed, "boom");
        tx.end_turn(TaskId(2), TurnOutcome::Failed(failure.clone()));
        assert_eq!(rx.wait().unwrap().outcome.failure(), Some(&failure));
    }

    #[test]
    fn wait_returns_none_without_senders() {
        let (tx, rx) = suspend_signal();
        drop(tx);
        assert!(rx.wait().is_none());
    }
}

// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Units of work on the dispatch queue.

use std::fmt;
use std::sync::Arc;

use crate::channel::Sender;
use crate::context::ExecutionContext;
use crate::turn::Turn;

/// Identifies one invocation for its whole life, across every turn it takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Caller-supplied task body. Receives its turn handle.
pub type TaskBody = Box<dyn FnOnce(&mut Turn) + Send + 'static>;

/// Wakes one parked task. Owns the sending half of that task's private
/// one-shot handshake.
pub(crate) struct Wake {
    tx: Sender<()>,
}

impl Wake {
    pub(crate) fn new(tx: Sender<()>) -> Self {
        Self { tx }
    }

    /// Unpark the task. Never blocks: the handshake has room for exactly
    /// this one signal. Returns false if the task is no longer parked.
    pub(crate) fn wake(self) -> bool {
        self.tx.try_send(()).is_ok()
    }
}

pub(crate) enum Message {
    /// Start a fresh task body.
    Invocation { task: TaskId, body: TaskBody },
    /// Give the turn back to a task parked in `await_blocking`.
    Resumption {
        task: TaskId,
        context: Arc<ExecutionContext>,
        wake: Wake,
    },
}

impl Message {
    pub(crate) fn task(&self) -> TaskId {
        match self {
            Message::Invocation { task, .. } | Message::Resumption { task, .. } => *task,
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Invocation { task, .. } => f.debug_tuple("Invocation").field(task).finish(),
            Message::Resumption { task, context, .. } => f
                .debug_struct("Resumption")
                .field("task", task)
                .field("state", &context.state())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel;

    #[test]
    fn wake_delivers_once() {
        let (tx, rx) = channel::buffered(1);
        assert!(Wake::new(tx).wake());
        assert!(rx.recv().is_ok());
    }

    #[test]
    fn wake_reports_missing_task() {
        let (tx, rx) = channel::buffered::<()>(1);
        drop(rx);
        assert!(!Wake::new(tx).wake());
    }

    #[test]
    fn task_id_display() {
        assert_eq!(TaskId(12).to_string(), "task-12");
        let msg = Message::Invocation {
            task: TaskId(1),
            body: Box::new(|_: &mut Turn| {}),
        };
        assert_eq!(msg.task(), TaskId(1));
        assert_eq!(format!("{:?}", msg), "Invocation(TaskId(1))");
    }
}

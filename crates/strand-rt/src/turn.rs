// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Task side of a turn: the body's thread and the await primitive.
//!
//! A task that awaits keeps its thread. It hands the turn back, runs the
//! blocking call on its own thread, queues a resumption behind whatever
//! else is waiting, and parks until the dispatcher reaches that
//! resumption. The queue position is the only ticket it holds.

use std::sync::Arc;

use tracing::{debug, info_span, warn};

use crate::actor::ActorHandle;
use crate::channel;
use crate::context::{ExecutionContext, TurnState};
use crate::error::TurnError;
use crate::failure::{self, FailureKind, TaskFailure};
use crate::message::{Message, TaskBody, TaskId, Wake};
use crate::signal::TurnOutcome;

/// A task's view of its own turn. Only ever lent to the running body.
pub struct Turn {
    task: TaskId,
    context: Arc<ExecutionContext>,
    handle: ActorHandle,
}

impl Turn {
    pub fn id(&self) -> TaskId {
        self.task
    }

    pub fn state(&self) -> TurnState {
        self.context.state()
    }

    /// The dispatcher this task runs on.
    pub fn handle(&self) -> &ActorHandle {
        &self.handle
    }

    /// Give up the turn, run `op` outside of it, then wait for the turn to
    /// come back in queue order and return `op`'s value.
    ///
    /// Other tasks take turns while `op` runs. A panic inside `op` abandons
    /// this task: no turn ends and no resumption is ever queued.
    pub fn await_blocking<R, F>(&mut self, op: F) -> Result<R, TurnError>
    where
        F: FnOnce() -> R,
    {
        if !self.context.suspend() {
            return Err(TurnError::NotActive);
        }
        debug!("turn released");
        self.handle
            .shared
            .suspend
            .end_turn(self.task, TurnOutcome::Suspended);

        let value = op();

        let (tx, rx) = channel::buffered(1);
        let resumption = Message::Resumption {
            task: self.task,
            context: self.context.clone(),
            wake: Wake::new(tx),
        };
        if self.handle.shared.queue.push(resumption).is_err() {
            return Err(self.abandon("dispatcher terminated before the resumption was queued"));
        }
        if rx.recv().is_err() {
            return Err(self.abandon("resumption discarded before it was processed"));
        }

        self.context.resume();
        debug!("turn reacquired");
        Ok(value)
    }

    fn abandon(&self, reason: &str) -> TurnError {
        if self.context.abandon() {
            warn!(reason, "task abandoned");
            self.handle.shared.report_abandoned(TaskFailure::new(
                self.task,
                FailureKind::Abandoned,
                reason,
            ));
        }
        TurnError::Terminated
    }
}

impl std::fmt::Debug for Turn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Turn")
            .field("task", &self.task)
            .field("state", &self.state())
            .finish()
    }
}

/// Entry point of every task thread.
pub(crate) fn run_body(
    task: TaskId,
    body: TaskBody,
    context: Arc<ExecutionContext>,
    handle: ActorHandle,
) {
    let span = info_span!("task", id = %task);
    let _entered = span.enter();

    let mut turn = Turn {
        task,
        context: context.clone(),
        handle: handle.clone(),
    };
    let suspend = &handle.shared.suspend;

    match failure::contain(|| body(&mut turn)) {
        Ok(()) => {
            if context.finish() {
                suspend.end_turn(task, TurnOutcome::Completed);
            } else {
                debug!(state = %context.state(), "body returned without holding the turn");
            }
        }
        Err(message) => match context.fail() {
            TurnState::Active => {
                let failure = TaskFailure::new(task, FailureKind::Observed, message);
                suspend.end_turn(task, TurnOutcome::Failed(failure));
            }
            TurnState::Suspended => {
                warn!(%message, "task panicked in background phase; abandoned");
                handle
                    .shared
                    .report_abandoned(TaskFailure::new(task, FailureKind::Abandoned, message));
            }
            state => {
                warn!(%state, %message, "task panicked after its turn was settled");
            }
        },
    }
}

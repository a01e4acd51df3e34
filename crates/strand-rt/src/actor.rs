// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The dispatcher.
//!
//! One loop takes messages off the queue and opens one turn at a time:
//! an invocation gets a fresh thread, a resumption wakes a parked one.
//! The loop then blocks on the suspend signal until that turn ends, by
//! returning, by awaiting, or by panicking. Only then is the next message
//! (or a quit request) looked at.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use crate::channel::{self, Receiver, Sender};
use crate::config::ActorConfig;
use crate::context::ExecutionContext;
use crate::error::{ConfigError, EnqueueError};
use crate::failure::{FailureKind, TaskFailure};
use crate::message::{Message, TaskBody, TaskId};
use crate::queue::{MessageQueue, Next, PushError};
use crate::signal::{suspend_signal, SuspendReceiver, SuspendSender, TurnEnd, TurnOutcome};
use crate::turn::{self, Turn};

/// Dispatcher lifecycle.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// No open turn; waiting on the queue or a quit request.
    Idle = 0,
    /// A task holds the turn; the loop waits for it to end.
    TurnOpen = 1,
    /// Quit requested; processing what is left in the queue.
    Draining = 2,
    /// Queue observed empty after quit. `run` has returned or is returning.
    Terminated = 3,
}

impl DispatchState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Idle,
            1 => Self::TurnOpen,
            2 => Self::Draining,
            _ => Self::Terminated,
        }
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::TurnOpen => "turn-open",
            Self::Draining => "draining",
            Self::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Counters reported when `run` returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub invocations: usize,
    pub resumptions: usize,
    pub observed_failures: usize,
    pub abandoned: usize,
}

#[derive(Default)]
struct Stats {
    invocations: AtomicUsize,
    resumptions: AtomicUsize,
    observed_failures: AtomicUsize,
    abandoned: AtomicUsize,
}

impl Stats {
    fn snapshot(&self) -> RunSummary {
        RunSummary {
            invocations: self.invocations.load(Ordering::Acquire),
            resumptions: self.resumptions.load(Ordering::Acquire),
            observed_failures: self.observed_failures.load(Ordering::Acquire),
            abandoned: self.abandoned.load(Ordering::Acquire),
        }
    }
}

/// State shared by the dispatcher, every task thread and every handle.
pub(crate) struct Shared {
    pub(crate) queue: MessageQueue,
    pub(crate) suspend: SuspendSender,
    state: AtomicU8,
    next_task: AtomicU64,
    subscribers: Mutex<Vec<Sender<TaskFailure>>>,
    stats: Stats,
    thread_prefix: String,
}

impl Shared {
    fn set_state(&self, state: DispatchState) {
        let prev = self.state.swap(state as u8, Ordering::AcqRel);
        if prev != state as u8 {
            debug!(from = %DispatchState::from_u8(prev), to = %state, "dispatcher state");
        }
    }

    fn state(&self) -> DispatchState {
        DispatchState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn next_id(&self) -> TaskId {
        TaskId(self.next_task.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn rejected(&self, err: PushError) -> EnqueueError {
        match err {
            PushError::Full(_) => EnqueueError::Full {
                capacity: self.queue.capacity(),
            },
            PushError::Terminated(_) => EnqueueError::Terminated,
        }
    }

    /// Deliver a failure to every live subscriber, forgetting dead ones.
    fn publish(&self, failure: &TaskFailure) {
        let mut subs = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subs.retain(|tx| tx.send(failure.clone()).is_ok());
    }

    /// Background-phase loss. Never touches the suspend signal.
    pub(crate) fn report_abandoned(&self, failure: TaskFailure) {
        debug_assert_eq!(failure.kind, FailureKind::Abandoned);
        self.stats.abandoned.fetch_add(1, Ordering::AcqRel);
        self.publish(&failure);
    }
}

/// Cloneable, thread-safe access to a dispatcher: submit work, request
/// shutdown, watch failures. Task bodies get one through `Turn::handle`.
#[derive(Clone)]
pub struct ActorHandle {
    pub(crate) shared: Arc<Shared>,
}

impl ActorHandle {
    /// Queue a task body, blocking while the queue is full.
    ///
    /// Calling this from inside a task's turn while the queue is full
    /// deadlocks: the dispatcher cannot drain until that turn ends. Use
    /// `try_enqueue` there.
    pub fn enqueue<F>(&self, body: F) -> Result<TaskId, EnqueueError>
    where
        F: FnOnce(&mut Turn) + Send + 'static,
    {
        let task = self.shared.next_id();
        let msg = Message::Invocation {
            task,
            body: Box::new(body),
        };
        self.shared
            .queue
            .push(msg)
            .map_err(|e| self.shared.rejected(e))?;
        debug!(%task, "invocation queued");
        Ok(task)
    }

    /// Queue a task body without blocking.
    pub fn try_enqueue<F>(&self, body: F) -> Result<TaskId, EnqueueError>
    where
        F: FnOnce(&mut Turn) + Send + 'static,
    {
        let task = self.shared.next_id();
        let msg = Message::Invocation {
            task,
            body: Box::new(body),
        };
        self.shared
            .queue
            .try_push(msg)
            .map_err(|e| self.shared.rejected(e))?;
        debug!(%task, "invocation queued");
        Ok(task)
    }

    /// Ask the dispatcher to finish what is queued and stop. Safe to call
    /// any number of times; returns true only for the call that took effect.
    pub fn quit(&self) -> bool {
        let first = self.shared.queue.request_quit();
        if first {
            info!("quit requested");
        }
        first
    }

    pub fn is_quit_requested(&self) -> bool {
        self.shared.queue.is_quit_requested()
    }

    pub fn state(&self) -> DispatchState {
        self.shared.state()
    }

    /// Messages currently waiting in the queue.
    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    /// Receive every contained failure from now on, observed and abandoned.
    pub fn subscribe_failures(&self) -> Receiver<TaskFailure> {
        let (tx, rx) = channel::unbounded();
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }
}

impl fmt::Debug for ActorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorHandle")
            .field("state", &self.state())
            .field("queued", &self.queued())
            .finish()
    }
}

/// Serialized task dispatcher. Build it, queue work through it or its
/// handles, then call `run` (or `spawn`) exactly once.
pub struct Actor {
    shared: Arc<Shared>,
    suspend: SuspendReceiver,
}

impl Actor {
    pub fn new() -> Self {
        Self::build(ActorConfig::default())
    }

    pub fn with_config(config: ActorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: ActorConfig) -> Self {
        let (suspend_tx, suspend_rx) = suspend_signal();
        let shared = Arc::new(Shared {
            queue: MessageQueue::new(config.capacity),
            suspend: suspend_tx,
            state: AtomicU8::new(DispatchState::Idle as u8),
            next_task: AtomicU64::new(0),
            subscribers: Mutex::new(Vec::new()),
            stats: Stats::default(),
            thread_prefix: config.thread_prefix,
        });
        Self {
            shared,
            suspend: suspend_rx,
        }
    }

    pub fn handle(&self) -> ActorHandle {
        ActorHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn enqueue<F>(&self, body: F) -> Result<TaskId, EnqueueError>
    where
        F: FnOnce(&mut Turn) + Send + 'static,
    {
        self.handle().enqueue(body)
    }

    pub fn quit(&self) -> bool {
        self.handle().quit()
    }

    /// Run the dispatch loop on a dedicated thread.
    pub fn spawn(self) -> io::Result<JoinHandle<RunSummary>> {
        let name = format!("{}-dispatch", self.shared.thread_prefix);
        thread::Builder::new().name(name).spawn(move || self.run())
    }

    /// Dispatch until quit has been requested and the queue has drained.
    pub fn run(self) -> RunSummary {
        info!(capacity = self.shared.queue.capacity(), "entering dispatch loop");

        loop {
            self.shared.set_state(DispatchState::Idle);
            match self.shared.queue.next() {
                Next::Message(msg) => self.dispatch(msg),
                Next::Quit => break,
            }
        }

        self.shared.set_state(DispatchState::Draining);
        debug!(remaining = self.shared.queue.len(), "draining queue");
        while let Some(msg) = self.shared.queue.pop_or_terminate() {
            self.dispatch(msg);
            self.shared.set_state(DispatchState::Draining);
        }
        self.shared.set_state(DispatchState::Terminated);

        let summary = self.shared.stats.snapshot();
        info!(?summary, "dispatch loop terminated");
        summary
    }

    /// Open one turn and wait for it to end.
    fn dispatch(&self, msg: Message) {
        let (task, context) = match msg {
            Message::Invocation { task, body } => {
                self.shared.stats.invocations.fetch_add(1, Ordering::AcqRel);
                let context = Arc::new(ExecutionContext::active());
                if let Err(err) = self.spawn_task(task, body, context.clone()) {
                    context.fail();
                    let failure = TaskFailure::new(
                        task,
                        FailureKind::Observed,
                        format!("failed to spawn task thread: {}", err),
                    );
                    self.observe_failure(&failure);
                    return;
                }
                (task, context)
            }
            Message::Resumption {
                task,
                context,
                wake,
            } => {
                self.shared.stats.resumptions.fetch_add(1, Ordering::AcqRel);
                if !wake.wake() {
                    warn!(%task, "resumed task is no longer parked; skipping its turn");
                    return;
                }
                (task, context)
            }
        };

        self.shared.set_state(DispatchState::TurnOpen);
        debug!(%task, "turn open");
        match self.suspend.wait() {
            Some(end) => self.turn_ended(task, end),
            None => error!(%task, "suspend signal closed while a turn was open"),
        }
        drop(context);
    }

    fn spawn_task(
        &self,
        task: TaskId,
        body: TaskBody,
        context: Arc<ExecutionContext>,
    ) -> io::Result<()> {
        let handle = self.handle();
        thread::Builder::new()
            .name(format!("{}-task-{}", self.shared.thread_prefix, task.0))
            .spawn(move || turn::run_body(task, body, context, handle))
            .map(|_detached| ())
    }

    fn turn_ended(&self, task: TaskId, end: TurnEnd) {
        if end.task != task {
            warn!(expected = %task, got = %end.task, "turn end from unexpected task");
        }
        match end.outcome {
            TurnOutcome::Suspended => debug!(task = %end.task, "turn released by await"),
            TurnOutcome::Completed => debug!(task = %end.task, "turn completed"),
            TurnOutcome::Failed(failure) => self.observe_failure(&failure),
        }
    }

    fn observe_failure(&self, failure: &TaskFailure) {
        error!(task = %failure.task, message = %failure.message, "task failed during its turn");
        self.shared
            .stats
            .observed_failures
            .fetch_add(1, Ordering::AcqRel);
        self.shared.publish(failure);
    }
}

impl Default for Actor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Actor {
    fn drop(&mut self) {
        // Dropped without running to completion: release anyone parked on
        // a resumption that will now never be processed.
        if !self.shared.queue.is_terminated() {
            let dropped = self.shared.queue.terminate();
            if !dropped.is_empty() {
                warn!(count = dropped.len(), "actor dropped with queued messages");
            }
        }
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("state", &self.shared.state())
            .field("queued", &self.shared.queue.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn quit_before_run_drains_then_stops() {
        let actor = Actor::new();
        let (tx, rx) = channel::unbounded();
        for i in 0..3 {
            let tx = tx.clone();
            actor.enqueue(move |_| tx.send(i).unwrap()).unwrap();
        }
        assert!(actor.quit());
        assert!(!actor.quit());
        let handle = actor.handle();
        let summary = actor.run();
        assert_eq!(summary.invocations, 3);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(handle.state(), DispatchState::Terminated);
    }

    #[test]
    fn enqueue_after_termination_is_rejected() {
        let actor = Actor::new();
        let handle = actor.handle();
        actor.quit();
        actor.run();
        assert_eq!(handle.enqueue(|_| {}), Err(EnqueueError::Terminated));
        assert_eq!(handle.try_enqueue(|_| {}), Err(EnqueueError::Terminated));
    }

    #[test]
    fn try_enqueue_reports_full() {
        let actor = Actor::with_config(ActorConfig::new().capacity(2)).unwrap();
        actor.enqueue(|_| {}).unwrap();
        actor.enqueue(|_| {}).unwrap();
        assert_eq!(
            actor.handle().try_enqueue(|_| {}),
            Err(EnqueueError::Full { capacity: 2 })
        );
    }

    #[test]
    fn task_ids_increase() {
        let actor = Actor::new();
        let a = actor.enqueue(|_| {}).unwrap();
        let b = actor.enqueue(|_| {}).unwrap();
        assert!(a < b);
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(matches!(
            Actor::with_config(ActorConfig::new().capacity(0)),
            Err(ConfigError::InvalidCapacity(0))
        ));
    }

    #[test]
    fn spawned_loop_stops_on_quit() {
        let actor = Actor::new();
        let handle = actor.handle();
        let join = actor.spawn().unwrap();
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(handle.state(), DispatchState::Idle);
        handle.quit();
        assert_eq!(join.join().unwrap(), RunSummary::default());
    }

    #[test]
    fn dropping_unrun_actor_releases_queue() {
        let actor = Actor::new();
        let handle = actor.handle();
        actor.enqueue(|_| {}).unwrap();
        drop(actor);
        assert_eq!(handle.queued(), 0);
        assert_eq!(handle.enqueue(|_| {}), Err(EnqueueError::Terminated));
    }
}

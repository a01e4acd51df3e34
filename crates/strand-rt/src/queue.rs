// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Bounded FIFO dispatch queue.
//!
//! Invocations and resumptions share one queue and one order. Producers
//! block while it is full. The quit request lives under the same lock as
//! the messages, so the dispatcher sees "quit" and "queue contents" as one
//! consistent snapshot.
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::message::Message;

/// Reason a push did not land. Hands the message back.
#[derive(Debug)]
pub(crate) enum PushError {
    Full(Message),
    Terminated(Message),
}

/// What the steady-state loop should do next.
#[derive(Debug)]
pub(crate) enum Next {
    Message(Message),
    Quit,
}

struct QueueState {
    messages: VecDeque<Message>,
    quit_requested: bool,
    terminated: bool,
}

pub(crate) struct MessageQueue {
    state: Mutex<QueueState>,
    /// Signalled on push and on quit.
    readable: Condvar,
    /// Signalled on pop and on termination.
    writable: Condvar,
    capacity: usize,
}

impl MessageQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                messages: VecDeque::with_capacity(capacity),
                quit_requested: false,
                terminated: false,
            }),
            readable: Condvar::new(),
            writable: Condvar::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append, blocking while full. Fails only once terminated.
    pub fn push(&self, msg: Message) -> Result<(), PushError> {
        let mut q = self.lock();
        while q.messages.len() >= self.capacity && !q.terminated {
            q = self.writable.wait(q).unwrap_or_else(PoisonError::into_inner);
        }
        if q.terminated {
            return Err(PushError::Terminated(msg));
        }
        q.messages.push_back(msg);
        self.readable.notify_one();
        Ok(())
    }

    /// Append without blocking.
    pub fn try_push(&self, msg: Message) -> Result<(), PushError> {
        let mut q = self.lock();
        if q.terminated {
            return Err(PushError::Terminated(msg));
        }
        if q.messages.len() >= self.capacity {
            return Err(PushError::Full(msg));
        }
        q.messages.push_back(msg);
        self.readable.notify_one();
        Ok(())
    }

    /// Wait for the next message or a quit request. Quit wins: once it is
    /// requested the remaining messages belong to the draining phase.
    pub fn next(&self) -> Next {
        let mut q = self.lock();
        loop {
            if q.quit_requested {
                return Next::Quit;
            }
            if let Some(msg) = q.messages.pop_front() {
                self.writable.notify_one();
                return Next::Message(msg);
            }
            q = self.readable.wait(q).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Pop the front message, or, when empty, terminate the queue in the
    /// same critical section so nothing can slip in behind the check.
    pub fn pop_or_terminate(&self) -> Option<Message> {
        let mut q = self.lock();
        match q.messages.pop_front() {
            Some(msg) => {
                self.writable.notify_one();
                Some(msg)
            }
            None => {
                q.terminated = true;
                // Producers parked on a full queue must see the rejection.
                self.writable.notify_all();
                None
            }
        }
    }

    /// Terminate now, handing back whatever was still queued. The caller
    /// drops the messages outside the lock.
    pub fn terminate(&self) -> Vec<Message> {
        let mut q = self.lock();
        q.terminated = true;
        self.writable.notify_all();
        q.messages.drain(..).collect()
    }

    /// Returns true only for the first request.
    pub fn request_quit(&self) -> bool {
        let mut q = self.lock();
        if q.quit_requested {
            return false;
        }
        q.quit_requested = true;
        self.readable.notify_all();
        true
    }

    pub fn is_quit_requested(&self) -> bool {
        self.lock().quit_requested
    }

    pub fn is_terminated(&self) -> bool {
        self.lock().terminated
    }

    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.lock().messages.is_empty()
    }
}

// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Hand-off channels.
//!
//! Wraps `std::sync::mpsc`. Every cross-thread hand-off in the dispatcher
//! (turn-end signal, wake handshake, failure reports) goes through one of
//! these, so send/recv is the only happens-before edge the core relies on.

use std::sync::mpsc;
use std::time::Duration;

/// Errors from channel operations.
#[derive(Debug)]
pub enum SendError<T> {
    /// All receivers dropped.
    Closed(T),
}

#[derive(Debug)]
pub enum RecvError {
    /// All senders dropped and buffer empty.
    Closed,
}

#[derive(Debug)]
pub enum TrySendError<T> {
    /// Buffer is full.
    Full(T),
    /// All receivers dropped.
    Closed(T),
}

#[derive(Debug)]
pub enum TryRecvError {
    /// No message available right now.
    Empty,
    /// All senders dropped.
    Closed,
}

/// Create a buffered channel with capacity `n`.
pub fn buffered<T>(n: usize) -> (Sender<T>, Receiver<T>) {
    let (tx, rx) = mpsc::sync_channel(n);
    (
        Sender {
            inner: Flavor::Bounded(tx),
        },
        Receiver { inner: rx },
    )
}

/// Create an unbuffered (rendezvous) channel.
pub fn unbuffered<T>() -> (Sender<T>, Receiver<T>) {
    buffered(0)
}

/// Create a channel whose sends never block.
pub fn unbounded<T>() -> (Sender<T>, Receiver<T>) {
    let (tx, rx) = mpsc::channel();
    (
        Sender {
            inner: Flavor::Unbounded(tx),
        },
        Receiver { inner: rx },
    )
}

enum Flavor<T> {
    Bounded(mpsc::SyncSender<T>),
    Unbounded(mpsc::Sender<T>),
}

/// Sending half of a channel.
pub struct Sender<T> {
    inner: Flavor<T>,
}

impl<T> Sender<T> {
    /// Blocking send. Blocks while a bounded buffer is full.
    pub fn send(&self, val: T) -> Result<(), SendError<T>> {
        match &self.inner {
            Flavor::Bounded(tx) => tx.send(val).map_err(|e| SendError::Closed(e.0)),
            Flavor::Unbounded(tx) => tx.send(val).map_err(|e| SendError::Closed(e.0)),
        }
    }

    /// Non-blocking send attempt.
    pub fn try_send(&self, val: T) -> Result<(), TrySendError<T>> {
        match &self.inner {
            Flavor::Bounded(tx) => match tx.try_send(val) {
                Ok(()) => Ok(()),
                Err(mpsc::TrySendError::Full(v)) => Err(TrySendError::Full(v)),
                Err(mpsc::TrySendError::Disconnected(v)) => Err(TrySendError::Closed(v)),
            },
            Flavor::Unbounded(tx) => tx.send(val).map_err(|e| TrySendError::Closed(e.0)),
        }
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        let inner = match &self.inner {
            Flavor::Bounded(tx) => Flavor::Bounded(tx.clone()),
            Flavor::Unbounded(tx) => Flavor::Unbounded(tx.clone()),
        };
        Sender { inner }
    }
}

impl<T> std::fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.inner {
            Flavor::Bounded(_) => "bounded",
            Flavor::Unbounded(_) => "unbounded",
        };
        f.debug_struct("Sender").field("kind", &kind).finish()
    }
}

/// Receiving half of a channel.
#[derive(Debug)]
pub struct Receiver<T> {
    inner: mpsc::Receiver<T>,
}

impl<T> Receiver<T> {
    /// Blocking receive. Blocks while the buffer is empty.
    pub fn recv(&self) -> Result<T, RecvError> {
        self.inner.recv().map_err(|_| RecvError::Closed)
    }

    /// Non-blocking receive attempt.
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        match self.inner.try_recv() {
            Ok(val) => Ok(val),
            Err(mpsc::TryRecvError::Empty) => Err(TryRecvError::Empty),
            Err(mpsc::TryRecvError::Disconnected) => Err(TryRecvError::Closed),
        }
    }

    /// Receive with timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, TryRecvError> {
        match self.inner.recv_timeout(timeout) {
            Ok(val) => Ok(val),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(TryRecvError::Empty),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(TryRecvError::Closed),
        }
    }

    /// Drain everything currently buffered without blocking.
    pub fn try_iter(&self) -> impl Iterator<Item = T> + '_ {
        self.inner.try_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_slot_full() {
        let (tx, rx) = buffered(1);
        tx.send(1).unwrap();
        assert!(matches!(tx.try_send(2), Err(TrySendError::Full(2))));
        assert_eq!(rx.recv().unwrap(), 1);
        tx.try_send(3).unwrap();
        assert_eq!(rx.recv().unwrap(), 3);
    }

    #[test]
    fn unbuffered_rendezvous() {
        let (tx, rx) = unbuffered();
        std::thread::spawn(move || {
            tx.send(99).unwrap();
        });
        assert_eq!(rx.recv().unwrap(), 99);
    }

    #[test]
    fn unbounded_never_full() {
        let (tx, rx) = unbounded();
        for i in 0..100 {
            tx.try_send(i).unwrap();
        }
        assert_eq!(rx.try_iter().count(), 100);
    }

    #[test]
    fn closed_channel() {
        let (tx, rx) = buffered::<i32>(1);
        drop(tx);
        assert!(matches!(rx.recv(), Err(RecvError::Closed)));
    }

    #[test]
    fn send_to_dropped_receiver() {
        let (tx, rx) = unbounded::<i32>();
        drop(rx);
        assert!(matches!(tx.send(5), Err(SendError::Closed(5))));
    }

    #[test]
    fn recv_timeout_empty() {
        let (_tx, rx) = buffered::<i32>(1);
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(5)),
            Err(TryRecvError::Empty)
        ));
    }
}

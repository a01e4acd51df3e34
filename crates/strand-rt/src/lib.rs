// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Strand runtime: a serialized task dispatcher.
//!
//! Task bodies run one turn at a time, in queue order. A body may give its
//! turn away around a slow call with `Turn::await_blocking` and pick up
//! where it left off once its resumption reaches the front of the queue.
//! Each task runs on its own OS thread; the dispatcher only ever treats one
//! of them as holding the turn.
//!
//! Components:
//! - actor: dispatch loop, shutdown draining, `ActorHandle`
//! - turn: `Turn` and the await primitive
//! - context: per-task turn state
//! - message: invocations and resumptions
//! - queue: bounded FIFO shared by both message kinds
//! - signal: single-slot turn-end signal
//! - failure: panic containment and failure reports
//! - channel: typed hand-off channels
//! - config: queue capacity and thread naming
//!
//! ```no_run
//! use strand_rt::Actor;
//!
//! let actor = Actor::new();
//! actor
//!     .enqueue(|turn| {
//!         let body = turn.await_blocking(|| "slow call result").unwrap();
//!         println!("{}", body);
//!         turn.handle().quit();
//!     })
//!     .unwrap();
//! actor.run();
//! ```

pub mod actor;
pub mod channel;
pub mod config;
pub mod context;
pub mod error;
pub mod failure;
pub mod message;
mod queue;
pub mod signal;
pub mod turn;

pub use actor::{Actor, ActorHandle, DispatchState, RunSummary};
pub use config::ActorConfig;
pub use context::TurnState;
pub use error::{ConfigError, EnqueueError, TurnError};
pub use failure::{FailureKind, TaskFailure};
pub use message::TaskId;
pub use turn::Turn;

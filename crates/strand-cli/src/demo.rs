// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The six-task walkthrough.
//!
//! f1/f3/f6 await a simulated remote call of 2/4/3 ticks, f2/f4 never
//! await, f5 panics in its turn, f6 panics in its background phase, and
//! f3 requests quit once resumed.

use std::thread;
use std::time::Duration;

use strand_rt::{Actor, ActorConfig, ConfigError, EnqueueError, RunSummary, Turn};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("enqueue: {0}")]
    Enqueue(#[from] EnqueueError),
}

fn remote_call(name: &str, ticks: u32, tick: Duration) {
    info!("before {} rpc", name);
    thread::sleep(tick * ticks);
    info!("after {} rpc", name);
}

fn faulty_store(slot: Option<&mut i32>, value: i32) {
    match slot {
        Some(slot) => *slot = value,
        None => panic!("store of {} through a null slot", value),
    }
}

fn awaited(turn: &mut Turn, name: &str, op: impl FnOnce()) -> bool {
    match turn.await_blocking(op) {
        Ok(()) => true,
        Err(e) => {
            info!("{} not resumed: {}", name, e);
            false
        }
    }
}

pub fn run(config: ActorConfig, tick: Duration) -> Result<RunSummary, DemoError> {
    let actor = Actor::with_config(config)?;

    actor.enqueue(move |turn| {
        info!("begin run f1");
        if awaited(turn, "f1", || remote_call("f1", 2, tick)) {
            info!("end run f1");
        }
    })?;
    actor.enqueue(|_| {
        info!("begin run f2");
        info!("end run f2");
    })?;
    actor.enqueue(move |turn| {
        info!("begin run f3");
        if awaited(turn, "f3", || remote_call("f3", 4, tick)) {
            info!("end run f3 && call quit");
            turn.handle().quit();
        }
    })?;
    actor.enqueue(|_| {
        info!("begin run f4");
        info!("end run f4");
    })?;
    actor.enqueue(|_| {
        info!("begin run f5");
        faulty_store(None, 100);
        info!("end run f5");
    })?;
    actor.enqueue(move |turn| {
        info!("begin run f6");
        if awaited(turn, "f6", || {
            remote_call("f6", 3, tick);
            faulty_store(None, 200);
        }) {
            info!("end run f6");
        }
    })?;

    info!("enter service dispatch");
    let summary = actor.run();
    info!("quit service dispatch");
    Ok(summary)
}

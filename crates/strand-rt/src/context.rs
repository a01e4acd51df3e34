// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Execution context: turn accounting for one task.
//!
//! One context is created per invocation and lives as long as the task's
//! thread. The dispatcher holds a clone only while the task's turn is
//! open; the task thread owns the rest of its lifetime.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Where a task stands relative to the dispatcher's turn accounting.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Holds the open turn.
    Active = 0,
    /// Released the turn inside `await_blocking`; background phase.
    Suspended = 1,
    /// Body returned while holding the turn.
    Ended = 2,
    /// Body panicked while holding the turn (observed failure).
    Failed = 3,
    /// Lost while suspended: panicked in the background phase or never
    /// resumed because the dispatcher terminated.
    Abandoned = 4,
}

impl TurnState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Active,
            1 => Self::Suspended,
            2 => Self::Ended,
            3 => Self::Failed,
            _ => Self::Abandoned,
        }
    }

    /// True for states no transition leaves.
    pub fn is_final(self) -> bool {
        matches!(self, Self::Ended | Self::Failed | Self::Abandoned)
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Ended => "ended",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
        };
        f.write_str(s)
    }
}

/// Per-task turn state. Every transition is a compare-and-swap, so a
/// context never leaves a final state and never skips the one it expects.
#[derive(Debug)]
pub struct ExecutionContext {
    state: AtomicU8,
}

impl ExecutionContext {
    /// Fresh context for a task that is about to take the turn.
    pub(crate) fn active() -> Self {
        Self {
            state: AtomicU8::new(TurnState::Active as u8),
        }
    }

    pub fn state(&self) -> TurnState {
        TurnState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_active(&self) -> bool {
        self.state() == TurnState::Active
    }

    /// Active -> Suspended.
    pub(crate) fn suspend(&self) -> bool {
        self.transition(TurnState::Active, TurnState::Suspended).is_ok()
    }

    /// Suspended -> Active.
    pub(crate) fn resume(&self) -> bool {
        self.transition(TurnState::Suspended, TurnState::Active).is_ok()
    }

    /// Active -> Ended.
    pub(crate) fn finish(&self) -> bool {
        self.transition(TurnState::Active, TurnState::Ended).is_ok()
    }

    /// Suspended -> Abandoned.
    pub(crate) fn abandon(&self) -> bool {
        self.transition(TurnState::Suspended, TurnState::Abandoned).is_ok()
    }

    /// Record a panic. Returns the state the panic hit: `Active` means the
    /// turn was open (now `Failed`), `Suspended` means the background phase
    /// (now `Abandoned`). Final states are left alone.
    pub(crate) fn fail(&self) -> TurnState {
        match self.transition(TurnState::Active, TurnState::Failed) {
            Ok(prev) => prev,
            Err(TurnState::Suspended) => {
                match self.transition(TurnState::Suspended, TurnState::Abandoned) {
                    Ok(prev) => prev,
                    Err(current) => current,
                }
            }
            Err(current) => current,
        }
    }

    fn transition(&self, from: TurnState, to: TurnState) -> Result<TurnState, TurnState> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(TurnState::from_u8)
            .map_err(TurnState::from_u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn await_cycle() {
        let ctx = ExecutionContext::active();
        assert!(ctx.is_active());
        assert!(ctx.suspend());
        assert_eq!(ctx.state(), TurnState::Suspended);
        assert!(!ctx.suspend());
        assert!(ctx.resume());
        assert!(ctx.finish());
        assert_eq!(ctx.state(), TurnState::Ended);
    }

    #[test]
    fn panic_while_active_is_observed() {
        let ctx = ExecutionContext::active();
        assert_eq!(ctx.fail(), TurnState::Active);
        assert_eq!(ctx.state(), TurnState::Failed);
    }

    #[test]
    fn panic_while_suspended_abandons() {
        let ctx = ExecutionContext::active();
        ctx.suspend();
        assert_eq!(ctx.fail(), TurnState::Suspended);
        assert_eq!(ctx.state(), TurnState::Abandoned);
        assert!(!ctx.resume());
    }

    #[test]
    fn final_states_stick() {
        let ctx = ExecutionContext::active();
        ctx.finish();
        assert_eq!(ctx.fail(), TurnState::Ended);
        assert!(!ctx.suspend());
        assert!(ctx.state().is_final());
    }
}

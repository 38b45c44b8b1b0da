//! Per-turn countdown driven by an external tick signal.
//!
//! The countdown never owns a wall clock: the host (a `setInterval` in the
//! page, or a test) calls `tick()` and acts on the returned `Tick`. Expiry is
//! reported exactly once per started turn, and `cancel()` takes effect
//! synchronously so a manual submission can never race an expiry.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Cancelled,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Tick {
    /// No countdown is armed; nothing happened.
    Ignored,
    Paused { remaining: u32 },
    Running { remaining: u32 },
    /// The countdown for `turn` ran out on this tick.
    Expired { turn: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    duration: u32,
    remaining: u32,
    state: TimerState,
    turn: u64,
}

impl Countdown {
    pub fn new(duration: u32) -> Self {
        Self {
            duration,
            remaining: duration,
            state: TimerState::Idle,
            turn: 0,
        }
    }

    /// Arm the countdown for `turn` at full duration.
    pub fn start(&mut self, turn: u64) {
        self.turn = turn;
        self.remaining = self.duration;
        self.state = TimerState::Running;
    }

    pub fn pause(&mut self) -> EngineResult<()> {
        match self.state {
            TimerState::Running => {
                self.state = TimerState::Paused;
                Ok(())
            }
            other => Err(EngineError::illegal(format!("Cannot pause a {other:?} timer"))),
        }
    }

    pub fn resume(&mut self) -> EngineResult<()> {
        match self.state {
            TimerState::Paused => {
                self.state = TimerState::Running;
                Ok(())
            }
            other => Err(EngineError::illegal(format!("Cannot resume a {other:?} timer"))),
        }
    }

    /// Back to full duration and running (also un-pauses).
    pub fn reset(&mut self) -> EngineResult<()> {
        match self.state {
            TimerState::Running | TimerState::Paused => {
                self.remaining = self.duration;
                self.state = TimerState::Running;
                Ok(())
            }
            other => Err(EngineError::illegal(format!("Cannot reset a {other:?} timer"))),
        }
    }

    pub fn cancel(&mut self) {
        if self.state != TimerState::Idle {
            self.state = TimerState::Cancelled;
        }
    }

    pub fn tick(&mut self) -> Tick {
        match self.state {
            TimerState::Idle | TimerState::Cancelled => Tick::Ignored,
            TimerState::Paused => Tick::Paused {
                remaining: self.remaining,
            },
            TimerState::Running => {
                self.remaining = self.remaining.saturating_sub(1);
                if self.remaining == 0 {
                    self.state = TimerState::Idle;
                    Tick::Expired { turn: self.turn }
                } else {
                    Tick::Running {
                        remaining: self.remaining,
                    }
                }
            }
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }
}

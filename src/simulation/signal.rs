//! Signal head logic for the crossing simulation
//!
//! A `SignalClock` runs an endless Stop -> Go -> Warning cycle. The cycle is
//! a cooperative task: it only advances when the host calls `tick`, and
//! stopping it simply drops the pending resumption.

use std::fmt;

use log::debug;

use super::config::{ConfigError, SignalTimings};
use super::query::SignalSnapshot;
use super::types::{Position, SignalId};

/// The right-of-way state shown by a signal head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalPhase {
    /// Traffic holds, pedestrians wait
    Stop,
    /// Traffic should stop if able, pedestrians must not start crossing
    Warning,
    /// Traffic may proceed, pedestrians may cross
    Go,
}

impl SignalPhase {
    /// The phase that follows this one in the fixed cycle
    pub fn next(self) -> SignalPhase {
        match self {
            SignalPhase::Stop => SignalPhase::Go,
            SignalPhase::Go => SignalPhase::Warning,
            SignalPhase::Warning => SignalPhase::Stop,
        }
    }

    /// Pedestrians may only cross on Go
    pub fn is_safe_to_cross(self) -> bool {
        self == SignalPhase::Go
    }

    /// Lamp pattern for this phase
    pub fn lamps(self) -> SignalLamps {
        SignalLamps {
            red: self == SignalPhase::Stop,
            amber: self == SignalPhase::Warning,
            green: self == SignalPhase::Go,
        }
    }

    /// Single-character label used by the map renderer
    pub fn symbol(self) -> char {
        match self {
            SignalPhase::Stop => 'R',
            SignalPhase::Warning => 'Y',
            SignalPhase::Go => 'G',
        }
    }
}

/// Presentation state bound to a signal head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalLamps {
    pub red: bool,
    pub amber: bool,
    pub green: bool,
}

/// A committed phase transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseChange {
    pub signal: SignalId,
    /// Phase before the transition; `None` when a fresh cycle starts
    pub from: Option<SignalPhase>,
    pub to: SignalPhase,
    /// Clock-local running time at which the transition happened
    pub at: f32,
}

/// Synchronous listener invoked on every committed transition
pub type PhaseListener = Box<dyn FnMut(&PhaseChange)>;

/// A timed signal head
pub struct SignalClock {
    pub id: SignalId,
    pub position: Position,
    phase: SignalPhase,
    timings: SignalTimings,
    /// Hold time captured when the current phase was entered
    hold: f32,
    /// Time spent in the current phase
    phase_timer: f32,
    /// Total running time since the last `start`
    clock_time: f32,
    running: bool,
    cycles_completed: u64,
    listeners: Vec<PhaseListener>,
}

impl fmt::Debug for SignalClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalClock")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("phase", &self.phase)
            .field("timings", &self.timings)
            .field("phase_timer", &self.phase_timer)
            .field("running", &self.running)
            .field("cycles_completed", &self.cycles_completed)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl SignalClock {
    /// Create a stopped clock showing Stop. Fails on non-positive durations.
    pub fn new(
        id: SignalId,
        position: Position,
        timings: SignalTimings,
    ) -> Result<Self, ConfigError> {
        timings.validate()?;
        Ok(Self {
            id,
            position,
            phase: SignalPhase::Stop,
            hold: timings.stop,
            timings,
            phase_timer: 0.0,
            clock_time: 0.0,
            running: false,
            cycles_completed: 0,
            listeners: Vec::new(),
        })
    }

    /// Register a listener for phase changes
    pub fn subscribe(&mut self, listener: impl FnMut(&PhaseChange) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Cancel any running cycle and launch a fresh one from Stop
    pub fn start(&mut self) -> PhaseChange {
        self.running = true;
        self.clock_time = 0.0;
        self.cycles_completed = 0;
        self.enter(SignalPhase::Stop, None)
    }

    /// Cancel the running cycle; the last committed phase stays visible
    pub fn stop(&mut self) {
        if self.running {
            debug!("{} halted in {:?}", self.id, self.phase);
        }
        self.running = false;
    }

    /// Advance the cycle by `delta_secs`, committing every transition whose
    /// hold time has fully elapsed
    pub fn tick(&mut self, delta_secs: f32) -> Vec<PhaseChange> {
        let mut changes = Vec::new();
        if !self.running || !delta_secs.is_finite() || delta_secs <= 0.0 {
            return changes;
        }

        self.phase_timer += delta_secs;
        self.clock_time += delta_secs;

        // Whole cycles past the current hold are skipped unpublished
        let cycle = self.timings.cycle_length();
        if self.phase_timer >= self.hold + cycle {
            let excess = self.phase_timer - self.hold;
            self.cycles_completed += (excess / cycle) as u64;
            self.phase_timer = self.hold + excess % cycle;
        }

        while self.phase_timer >= self.hold {
            let remaining = self.phase_timer - self.hold;
            if remaining == self.phase_timer {
                // Hold below f32 resolution of the timer
                self.phase_timer = 0.0;
            } else {
                self.phase_timer = remaining;
            }
            let next = self.phase.next();
            if next == SignalPhase::Stop {
                self.cycles_completed += 1;
            }
            let change = self.enter(next, Some(self.phase));
            changes.push(change);
        }

        changes
    }

    fn enter(&mut self, phase: SignalPhase, from: Option<SignalPhase>) -> PhaseChange {
        if from.is_none() {
            self.phase_timer = 0.0;
        }
        self.phase = phase;
        self.hold = self.timings.duration(phase);

        let change = PhaseChange {
            signal: self.id,
            from,
            to: phase,
            at: self.clock_time - self.phase_timer,
        };
        debug!("{} -> {:?} at {:.2}s", self.id, phase, change.at);

        for listener in &mut self.listeners {
            listener(&change);
        }
        change
    }

    /// Replace the phase durations. Takes effect on the next phase entry.
    pub fn set_timings(&mut self, timings: SignalTimings) -> Result<(), ConfigError> {
        timings.validate()?;
        self.timings = timings;
        Ok(())
    }

    pub fn timings(&self) -> SignalTimings {
        self.timings
    }

    pub fn phase(&self) -> SignalPhase {
        self.phase
    }

    /// True iff the phase is Go
    pub fn is_safe_to_cross(&self) -> bool {
        self.phase.is_safe_to_cross()
    }

    pub fn lamps(&self) -> SignalLamps {
        self.phase.lamps()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn time_in_phase(&self) -> f32 {
        self.phase_timer
    }

    /// Seconds until the next transition (for a countdown display)
    pub fn time_remaining(&self) -> f32 {
        (self.hold - self.phase_timer).max(0.0)
    }

    /// Number of full cycles completed since the last `start`
    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    /// Immutable view used by vehicles during a tick
    pub fn snapshot(&self) -> SignalSnapshot {
        SignalSnapshot {
            id: self.id,
            position: self.position,
            phase: self.phase,
        }
    }
}

//! Pedestrian-facing pieces of the intersection
//!
//! The pedestrian controller itself lives outside the simulation. It only
//! needs the crossing predicate and the push-button state kept here.

use super::signal::SignalPhase;
use super::types::{ButtonId, Position, SignalId};

/// Gate that answers "may a pedestrian cross now?" for one signal head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossingGate {
    pub signal: SignalId,
}

impl CrossingGate {
    pub fn new(signal: SignalId) -> Self {
        Self { signal }
    }

    /// True iff the phase is Go. Warning is not safe for pedestrians.
    pub fn is_safe_to_cross(phase: SignalPhase) -> bool {
        phase.is_safe_to_cross()
    }

    /// Evaluate against an observed phase; an absent signal is never safe
    pub fn permits(&self, phase: Option<SignalPhase>) -> bool {
        phase.is_some_and(Self::is_safe_to_cross)
    }
}

/// Press/release transition reported by a button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonTransition {
    Pressed,
    Released,
}

/// A crossing request button next to a signal
#[derive(Debug, Clone, PartialEq)]
pub struct CrossingButton {
    pub id: ButtonId,
    pub signal: SignalId,
    pub position: Position,
    pressed: bool,
    press_count: u32,
}

impl CrossingButton {
    pub fn new(id: ButtonId, signal: SignalId, position: Position) -> Self {
        Self {
            id,
            signal,
            position,
            pressed: false,
            press_count: 0,
        }
    }

    /// Returns the transition, or `None` if the button was already down
    pub fn press(&mut self) -> Option<ButtonTransition> {
        if self.pressed {
            return None;
        }
        self.pressed = true;
        self.press_count += 1;
        Some(ButtonTransition::Pressed)
    }

    /// Returns the transition, or `None` if the button was already up
    pub fn release(&mut self) -> Option<ButtonTransition> {
        if !self.pressed {
            return None;
        }
        self.pressed = false;
        Some(ButtonTransition::Released)
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn press_count(&self) -> u32 {
        self.press_count
    }
}

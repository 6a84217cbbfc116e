//! Events published to presentation, audio and haptic collaborators
//!
//! The simulation pushes events into sinks and never waits on them.

use std::cell::RefCell;
use std::rc::Rc;

use log::info;

use super::crossing::ButtonTransition;
use super::signal::PhaseChange;
use super::types::{ButtonId, SignalId, VehicleId};
use super::vehicle::VehicleState;

/// Something external collaborators may want to react to
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    PhaseChanged(PhaseChange),
    ButtonPressed { button: ButtonId, signal: SignalId },
    ButtonReleased { button: ButtonId, signal: SignalId },
    VehicleStateChanged {
        vehicle: VehicleId,
        from: VehicleState,
        to: VehicleState,
    },
    EmergencyStop { vehicle: VehicleId },
    Resumed { vehicle: VehicleId },
}

impl SimEvent {
    pub(crate) fn from_button(button: ButtonId, signal: SignalId, transition: ButtonTransition) -> Self {
        match transition {
            ButtonTransition::Pressed => SimEvent::ButtonPressed { button, signal },
            ButtonTransition::Released => SimEvent::ButtonReleased { button, signal },
        }
    }
}

/// Receiver of simulation events
pub trait EventSink {
    fn emit(&mut self, event: &SimEvent);
}

/// Writes every event to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&mut self, event: &SimEvent) {
        match event {
            SimEvent::PhaseChanged(change) => {
                info!("{} now {:?} (t={:.1}s)", change.signal, change.to, change.at)
            }
            SimEvent::ButtonPressed { button, signal } => {
                info!("{} pressed at {}", button, signal)
            }
            SimEvent::ButtonReleased { button, signal } => {
                info!("{} released at {}", button, signal)
            }
            SimEvent::VehicleStateChanged { vehicle, from, to } => {
                info!("{}: {:?} -> {:?}", vehicle, from, to)
            }
            SimEvent::EmergencyStop { vehicle } => info!("{} halted", vehicle),
            SimEvent::Resumed { vehicle } => info!("{} resumed", vehicle),
        }
    }
}

/// Keeps every event in a shared buffer; clones observe the same buffer
#[derive(Debug, Default, Clone)]
pub struct EventRecorder {
    events: Rc<RefCell<Vec<SimEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl EventSink for EventRecorder {
    fn emit(&mut self, event: &SimEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

//! Crosswalk Simulation Library
//!
//! The traffic core of a pedestrian-safety trainer: a cyclic signal and
//! autonomous vehicles that obey it, independent of any rendering host.

pub mod simulation;

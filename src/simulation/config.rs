//! Tuning parameters for signals and vehicles
//!
//! Everything here is supplied at construction time. Values are checked
//! once at setup; the per-tick code assumes they are valid.

use thiserror::Error;

use super::signal::SignalPhase;

/// Setup-time configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{phase:?} duration must be positive, got {value}")]
    NonPositiveDuration { phase: SignalPhase, value: f32 },

    #[error("{field} must be positive, got {value}")]
    NonPositiveSpeed { field: &'static str, value: f32 },

    #[error("{field} must not be negative, got {value}")]
    NegativeValue { field: &'static str, value: f32 },

    #[error("{field} must lie in (-1, 1], got {value}")]
    InvalidCone { field: &'static str, value: f32 },

    #[error("signal scan interval must be positive, got {value}")]
    NonPositiveInterval { value: f32 },
}

/// How long each signal phase is held, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalTimings {
    pub stop: f32,
    pub go: f32,
    pub warning: f32,
}

impl Default for SignalTimings {
    fn default() -> Self {
        Self {
            stop: 30.0,
            go: 15.0,
            warning: 5.0,
        }
    }
}

impl SignalTimings {
    pub fn new(stop: f32, go: f32, warning: f32) -> Self {
        Self { stop, go, warning }
    }

    /// Hold time for a phase
    pub fn duration(&self, phase: SignalPhase) -> f32 {
        match phase {
            SignalPhase::Stop => self.stop,
            SignalPhase::Go => self.go,
            SignalPhase::Warning => self.warning,
        }
    }

    /// Length of one full Stop -> Go -> Warning cycle
    pub fn cycle_length(&self) -> f32 {
        self.stop + self.go + self.warning
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for phase in [SignalPhase::Stop, SignalPhase::Go, SignalPhase::Warning] {
            let value = self.duration(phase);
            // `!(x > 0)` also rejects NaN
            if !(value > 0.0) {
                return Err(ConfigError::NonPositiveDuration { phase, value });
            }
        }
        Ok(())
    }
}

/// Driving parameters for a single vehicle agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleConfig {
    /// Cruising speed and hard upper bound on current speed
    pub normal_speed: f32,
    /// Speed gained per second when below target
    pub acceleration_rate: f32,
    /// Speed shed per second when above target
    pub deceleration_rate: f32,
    /// Range at which a red light or obstacle forces a stop
    pub stopping_distance: f32,
    /// Gap to a leader at which the vehicle stops outright
    pub follow_distance: f32,
    /// Length of the forward probe used to find a leader
    pub detection_range: f32,
    /// Seconds between nearest-signal rescans
    pub signal_scan_interval: f32,
    /// Minimum dot(forward, dir-to-light) for a light to be tracked
    pub signal_detection_cone: f32,
    /// Minimum dot(forward, dir-to-light) for a light to force a stop
    pub signal_ahead_cone: f32,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            normal_speed: 5.0,
            acceleration_rate: 2.0,
            deceleration_rate: 5.0,
            stopping_distance: 5.0,
            follow_distance: 4.0,
            detection_range: 10.0,
            signal_scan_interval: 0.5,
            signal_detection_cone: 0.3,
            signal_ahead_cone: 0.5,
        }
    }
}

impl VehicleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("normal_speed", self.normal_speed),
            ("acceleration_rate", self.acceleration_rate),
            ("deceleration_rate", self.deceleration_rate),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositiveSpeed { field, value });
            }
        }

        for (field, value) in [
            ("stopping_distance", self.stopping_distance),
            ("follow_distance", self.follow_distance),
            ("detection_range", self.detection_range),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::NegativeValue { field, value });
            }
        }

        for (field, value) in [
            ("signal_detection_cone", self.signal_detection_cone),
            ("signal_ahead_cone", self.signal_ahead_cone),
        ] {
            if !(value > -1.0 && value <= 1.0) {
                return Err(ConfigError::InvalidCone { field, value });
            }
        }

        if !(self.signal_scan_interval > 0.0) {
            return Err(ConfigError::NonPositiveInterval {
                value: self.signal_scan_interval,
            });
        }

        Ok(())
    }
}

/// Top-level configuration for a simulated intersection
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimConfig {
    pub signal: SignalTimings,
    pub vehicle: VehicleConfig,
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.signal.validate()?;
        self.vehicle.validate()
    }
}

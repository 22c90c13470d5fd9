//! Vehicle engine configuration
//!
//! Every constant of the dynamics model and the intrusion state machine lives
//! here. All fields have defaults so a scenario file only needs to name the
//! ones it overrides.

use crate::types::{Result, SimError};
use serde::{Deserialize, Serialize};

/// Nominal CAN 2.0B data rate in bits per second
pub const CAN_DATA_RATE: f64 = 1e6;

/// Extended frame length in bits
pub const CAN_FRAME_LEN: f64 = 128.0;

/// Nominal share of bus capacity in use
pub const BUS_LOAD: f64 = 0.3;

/// Share of bus traffic carrying brake events while braking
pub const BRAKE_LOAD_RATIO: f64 = 0.03;

/// Configuration for the vehicle engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper engine speed limit (RPM)
    #[serde(default = "default_max_engine_speed")]
    pub max_engine_speed: f64,

    /// Lower engine speed limit while running (RPM)
    #[serde(default = "default_min_engine_speed")]
    pub min_engine_speed: f64,

    /// Torque ceiling (N·m)
    #[serde(default = "default_max_torque")]
    pub max_torque: f64,

    /// Largest speed gain per gas event (km/h)
    #[serde(default = "default_max_accel")]
    pub max_accel: f64,

    /// Power at full pedal (kW)
    #[serde(default = "default_gas_to_power_ratio")]
    pub gas_to_power_ratio: f64,

    /// Wheel torque to speed gain per event
    #[serde(default = "default_torque_to_accel_ratio")]
    pub torque_to_accel_ratio: f64,

    /// Vehicle speed × gear ratio to engine speed
    #[serde(default = "default_speed_to_engine_ratio")]
    pub speed_to_engine_ratio: f64,

    /// Share of speed shed per full-intensity brake event
    #[serde(default = "default_brake_normalization")]
    pub brake_normalization: f64,

    /// Upper bound of the relative road-load drift per idle tick
    #[serde(default = "default_idle_drift")]
    pub idle_drift: f64,

    /// Speed change per idle tick once the engine is shut down (km/h, negative)
    #[serde(default = "default_shutdown_drag")]
    pub shutdown_drag: f64,

    /// Messages per window that trip the intrusion state machine
    #[serde(default = "default_invalid_msg_threshold")]
    pub invalid_msg_threshold: u32,

    /// Accounting window length (seconds)
    #[serde(default = "default_window_length")]
    pub window_length: f64,

    /// Minimum spacing between synthesized status queries (seconds)
    #[serde(default = "default_query_interval")]
    pub query_interval: f64,

    /// Seed for the road-load noise
    #[serde(default)]
    pub noise_seed: u64,
}

fn default_max_engine_speed() -> f64 {
    5000.0
}

fn default_min_engine_speed() -> f64 {
    100.0
}

fn default_max_torque() -> f64 {
    250.0
}

fn default_max_accel() -> f64 {
    0.1
}

fn default_gas_to_power_ratio() -> f64 {
    100.0
}

fn default_torque_to_accel_ratio() -> f64 {
    1e-4
}

fn default_speed_to_engine_ratio() -> f64 {
    40.0
}

/// Inverse of the brake events expected per second of braking
fn default_brake_normalization() -> f64 {
    1.0 / (CAN_DATA_RATE / CAN_FRAME_LEN * BUS_LOAD * BRAKE_LOAD_RATIO)
}

fn default_idle_drift() -> f64 {
    2e-4
}

fn default_shutdown_drag() -> f64 {
    -0.005
}

fn default_invalid_msg_threshold() -> u32 {
    100
}

fn default_window_length() -> f64 {
    1.0
}

fn default_query_interval() -> f64 {
    0.01
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_engine_speed: default_max_engine_speed(),
            min_engine_speed: default_min_engine_speed(),
            max_torque: default_max_torque(),
            max_accel: default_max_accel(),
            gas_to_power_ratio: default_gas_to_power_ratio(),
            torque_to_accel_ratio: default_torque_to_accel_ratio(),
            speed_to_engine_ratio: default_speed_to_engine_ratio(),
            brake_normalization: default_brake_normalization(),
            idle_drift: default_idle_drift(),
            shutdown_drag: default_shutdown_drag(),
            invalid_msg_threshold: default_invalid_msg_threshold(),
            window_length: default_window_length(),
            query_interval: default_query_interval(),
            noise_seed: 0,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default constants
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the intrusion threshold
    pub fn with_invalid_msg_threshold(mut self, threshold: u32) -> Self {
        self.invalid_msg_threshold = threshold;
        self
    }

    /// Builder method: set the noise seed
    pub fn with_noise_seed(mut self, seed: u64) -> Self {
        self.noise_seed = seed;
        self
    }

    /// Builder method: set the idle drift magnitude (0 disables road-load noise)
    pub fn with_idle_drift(mut self, drift: f64) -> Self {
        self.idle_drift = drift;
        self
    }

    /// Builder method: set the query interval
    pub fn with_query_interval(mut self, interval: f64) -> Self {
        self.query_interval = interval;
        self
    }

    /// Check the constants are usable together
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("max_engine_speed", self.max_engine_speed),
            ("min_engine_speed", self.min_engine_speed),
            ("max_torque", self.max_torque),
            ("max_accel", self.max_accel),
            ("gas_to_power_ratio", self.gas_to_power_ratio),
            ("torque_to_accel_ratio", self.torque_to_accel_ratio),
            ("speed_to_engine_ratio", self.speed_to_engine_ratio),
            ("brake_normalization", self.brake_normalization),
            ("window_length", self.window_length),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        if self.min_engine_speed >= self.max_engine_speed {
            return Err(SimError::InvalidConfig(format!(
                "min_engine_speed {} must be below max_engine_speed {}",
                self.min_engine_speed, self.max_engine_speed
            )));
        }

        if !(self.idle_drift.is_finite() && (0.0..1.0).contains(&self.idle_drift)) {
            return Err(SimError::InvalidConfig(format!(
                "idle_drift must be in [0, 1), got {}",
                self.idle_drift
            )));
        }

        if !(self.shutdown_drag.is_finite() && self.shutdown_drag < 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "shutdown_drag must be negative, got {}",
                self.shutdown_drag
            )));
        }

        if self.invalid_msg_threshold == 0 {
            return Err(SimError::InvalidConfig(
                "invalid_msg_threshold must be at least 1".to_string(),
            ));
        }

        if !(self.query_interval.is_finite() && self.query_interval >= 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "query_interval must be non-negative, got {}",
                self.query_interval
            )));
        }

        Ok(())
    }
}

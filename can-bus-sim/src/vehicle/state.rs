//! Vehicle state types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete operating mode of the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// Driver inputs are honoured
    #[default]
    Normal,
    /// High-priority flood detected; driver inputs are ignored until it clears
    DosDetected,
    /// Fuel supply cut; terminal
    EngineShutdown,
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatingMode::Normal => write!(f, "Normal"),
            OperatingMode::DosDetected => write!(f, "DosDetected"),
            OperatingMode::EngineShutdown => write!(f, "EngineShutdown"),
        }
    }
}

/// Continuous physical state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    /// Vehicle speed (km/h), never negative
    pub speed_kmph: f64,
    /// Engine speed (RPM)
    pub engine_speed_rpm: f64,
    /// Engine torque (N·m)
    pub torque_nm: f64,
    /// Engine power (kW)
    pub power_kw: f64,
}

impl VehicleState {
    /// A vehicle at rest with the engine idling at `idle_rpm`
    pub fn at_rest(idle_rpm: f64) -> Self {
        Self {
            speed_kmph: 0.0,
            engine_speed_rpm: idle_rpm,
            torque_nm: 0.0,
            power_kw: 0.0,
        }
    }
}

/// One row of the telemetry series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub timestamp: f64,
    pub speed_kmph: f64,
    pub engine_speed_rpm: f64,
    pub torque_nm: f64,
    pub mode: OperatingMode,
}

/// A change of operating mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeTransition {
    /// Timestamp of the event that caused the change
    pub timestamp: f64,
    pub from: OperatingMode,
    pub to: OperatingMode,
}

//! Vehicle dynamics and intrusion state machine

pub mod engine;
pub mod gear;
pub mod monitor;
pub mod state;

pub use engine::VehicleEngine;
pub use gear::{gear_for_speed, gear_ratio};
pub use monitor::{IntrusionMonitor, FUEL_KILL_ENGAGE_LEVEL};
pub use state::{ModeTransition, OperatingMode, TelemetrySample, VehicleState};

//! Core types for the CAN bus simulator
//!
//! This module defines the event type that flows through the whole pipeline:
//! generated by the driver, consumed by the vehicle engine, framed by the
//! writer and recovered by the reader.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for simulator operations
pub type Result<T> = std::result::Result<T, SimError>;

/// Logical kind of a bus event
///
/// `Unknown` is a decode-only sentinel. It is never produced by the simulation
/// side and is rejected by the codec and the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Accelerator pedal position, 0..1
    GasPedal,
    /// Brake pedal intensity, 0..1
    BrakePedal,
    /// No driver action during this tick
    Idle,
    /// High-priority diagnostic traffic, raw payload
    BusDiagnostic,
    /// Vendor command that cuts fuel to the combustion engine
    FuelKill,
    /// Broadcast of the current gear index
    GearStatus,
    /// Vehicle speed status, km/h
    QuerySpeed,
    /// Engine speed status, RPM
    QueryRpm,
    /// Engine torque status, N·m
    QueryTorque,
    /// Steering wheel angle, degrees
    SteeringAngle,
    /// Pre-collision system status
    PreCollision,
    /// Decoded record whose channel id has no known kind
    Unknown,
}

impl EventKind {
    /// Every kind, in declaration order
    pub const ALL: [EventKind; 12] = [
        EventKind::GasPedal,
        EventKind::BrakePedal,
        EventKind::Idle,
        EventKind::BusDiagnostic,
        EventKind::FuelKill,
        EventKind::GearStatus,
        EventKind::QuerySpeed,
        EventKind::QueryRpm,
        EventKind::QueryTorque,
        EventKind::SteeringAngle,
        EventKind::PreCollision,
        EventKind::Unknown,
    ];

    /// True for status queries, which the engine emits but never consumes
    pub fn is_query(self) -> bool {
        matches!(
            self,
            EventKind::QuerySpeed | EventKind::QueryRpm | EventKind::QueryTorque
        )
    }

    /// True for traffic counted against the high-priority rate threshold
    pub fn is_high_priority(self) -> bool {
        matches!(self, EventKind::BusDiagnostic)
    }

    /// Short stable name used in logs and reports
    pub fn name(self) -> &'static str {
        match self {
            EventKind::GasPedal => "gas_pedal",
            EventKind::BrakePedal => "brake_pedal",
            EventKind::Idle => "idle",
            EventKind::BusDiagnostic => "bus_diagnostic",
            EventKind::FuelKill => "fuel_kill",
            EventKind::GearStatus => "gear_status",
            EventKind::QuerySpeed => "query_speed",
            EventKind::QueryRpm => "query_rpm",
            EventKind::QueryTorque => "query_torque",
            EventKind::SteeringAngle => "steering_angle",
            EventKind::PreCollision => "pre_collision",
            EventKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single bus event
///
/// Only `kind`, `timestamp` and `value` survive the record format; the
/// description is informational and comes back empty after decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event kind
    pub kind: EventKind,
    /// Simulated time in seconds
    pub timestamp: f64,
    /// Physical value, unit depends on `kind`
    pub value: f64,
    /// Free-text label
    #[serde(default)]
    pub description: String,
}

impl Event {
    /// Create an event without a description
    pub fn new(kind: EventKind, timestamp: f64, value: f64) -> Self {
        Self {
            kind,
            timestamp,
            value,
            description: String::new(),
        }
    }

    /// Builder method: attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Stable sort of an event stream by timestamp
///
/// Ties keep their relative order.
pub fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
}

/// Errors that can occur while simulating, encoding or decoding
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("No signal descriptor for event kind '{0}'")]
    UnknownKind(EventKind),

    #[error("Value {value} for '{kind}' does not fit in {bit_width} bits")]
    ValueOutOfRange {
        kind: EventKind,
        value: f64,
        bit_width: u8,
    },

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Invalid signal definition: {0}")]
    InvalidSignalDefinition(String),

    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert!(EventKind::QueryRpm.is_query());
        assert!(!EventKind::GasPedal.is_query());
        assert!(EventKind::BusDiagnostic.is_high_priority());
        assert!(!EventKind::FuelKill.is_high_priority());
        assert_eq!(EventKind::ALL.len(), 12);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut events = vec![
            Event::new(EventKind::Idle, 2.0, 0.0),
            Event::new(EventKind::GasPedal, 1.0, 0.1),
            Event::new(EventKind::BrakePedal, 1.0, 0.2),
        ];
        sort_events(&mut events);
        assert_eq!(events[0].kind, EventKind::GasPedal);
        assert_eq!(events[1].kind, EventKind::BrakePedal);
        assert_eq!(events[2].kind, EventKind::Idle);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(format!("{}", EventKind::FuelKill), "fuel_kill");
        assert_eq!(EventKind::Unknown.to_string(), "unknown");
    }
}

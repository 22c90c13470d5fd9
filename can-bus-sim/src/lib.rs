//! CAN Bus Simulation Library
//!
//! A library for simulating a vehicle on a CAN bus under attack: events are
//! encoded into CAN payloads, stored as fixed-size records, and folded into a
//! vehicle model that watches the bus for intrusion.
//!
//! # Architecture
//!
//! - [`signals`]: per-kind wire layout (channel id, bit field, scale, offset)
//! - [`codec`]: physical value ↔ big-endian bit field in a payload
//! - [`formats`]: 24-byte record store writer and reader
//! - [`vehicle`]: dynamics, gear model and the intrusion state machine
//!
//! The library does NOT:
//! - Generate driving scenarios or attacks
//! - Plot or export telemetry
//!
//! Scenario generation and reporting live in the application layer (can-sim-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use can_bus_sim::{EngineConfig, Event, EventKind, FrameReader, FrameWriter, SignalCodec, VehicleEngine};
//! use std::path::Path;
//!
//! let events = vec![
//!     Event::new(EventKind::GasPedal, 0.000, 0.6),
//!     Event::new(EventKind::Idle, 0.001, 0.0),
//!     Event::new(EventKind::BrakePedal, 0.002, 0.4),
//! ];
//!
//! // Drive the vehicle and collect the status broadcasts it provokes
//! let mut engine = VehicleEngine::new(EngineConfig::new()).unwrap();
//! let status = engine.drive(&events).unwrap();
//!
//! // Store everything on the bus
//! let codec = SignalCodec::standard().unwrap();
//! let mut writer = FrameWriter::create(Path::new("trace.canrec"), codec.clone()).unwrap();
//! writer.write_events(events.iter().chain(status.iter())).unwrap();
//! writer.finish().unwrap();
//!
//! // Read it back
//! let reader = FrameReader::open(Path::new("trace.canrec"), codec).unwrap();
//! let (decoded, summary) = reader.read_all().unwrap();
//! println!("{} events, {} malformed", decoded.len(), summary.malformed);
//! ```

pub mod codec;
pub mod config;
pub mod formats;
pub mod signals;
pub mod types;
pub mod vehicle;

// Re-export main types for convenience
pub use codec::{EncodedSignal, SignalCodec};
pub use config::EngineConfig;
pub use formats::{FrameReader, FrameRecord, FrameWriter, ReadSummary};
pub use signals::{SignalDescriptor, SignalTable};
pub use types::{sort_events, Event, EventKind, Result, SimError};
pub use vehicle::{
    gear_for_speed, ModeTransition, OperatingMode, TelemetrySample, VehicleEngine, VehicleState,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

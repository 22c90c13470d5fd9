//! Signal descriptors and the signal table
//!
//! This module contains the static wire-layout metadata used by the codec
//! and the record format.

pub mod descriptor;
pub mod table;

// Re-export key types for convenience
pub use descriptor::{SignalDescriptor, MAX_PAYLOAD_BYTES};
pub use table::{SignalTable, HIGH_PRIORITY_ID_LIMIT};

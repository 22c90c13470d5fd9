//! Record file format
//!
//! Every event is stored as a fixed 24-byte record, independent of its
//! payload length. Multi-byte header fields are big-endian.
//!
//! ```text
//! offset  size  field
//! 0       4     timestamp ms, high 32 bits
//! 4       4     timestamp ms, low 32 bits
//! 8       4     channel id
//! 12      1     record type (0 = data)
//! 13      1     info A (0x05)
//! 14      1     info B (0x05)
//! 15      1     payload length
//! 16      8     payload, zero padded
//! ```

use crate::types::EventKind;

pub mod reader;
pub mod record;
pub mod writer;

// Re-export record I/O types
pub use reader::{FrameReader, ReadSummary};
pub use record::FrameRecord;
pub use writer::FrameWriter;

/// Size of one record in bytes
pub const RECORD_LEN: usize = 24;

/// Record type of data records
pub const RECORD_TYPE_DATA: u8 = 0;

/// Fixed info bytes of data records
pub const RECORD_INFO_A: u8 = 0x05;
pub const RECORD_INFO_B: u8 = 0x05;

/// Command prefix of the vendor fuel-kill request
pub const FUEL_KILL_COMMAND_BASE: f64 = (0x58u32 << 16) as f64;

/// Fuel-kill request level per unit of logical value
pub const FUEL_KILL_COMMAND_SCALE: f64 = 0xFFFF as f64;

/// Logical value → value handed to the codec
pub fn to_wire_value(kind: EventKind, value: f64) -> f64 {
    match kind {
        EventKind::FuelKill => FUEL_KILL_COMMAND_BASE + value * FUEL_KILL_COMMAND_SCALE,
        _ => value,
    }
}

/// Codec value → logical value
pub fn from_wire_value(kind: EventKind, value: f64) -> f64 {
    match kind {
        EventKind::FuelKill => (value - FUEL_KILL_COMMAND_BASE) / FUEL_KILL_COMMAND_SCALE,
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuel_kill_command_value() {
        assert_eq!(to_wire_value(EventKind::FuelKill, 1.0), 0x58FFFF as f64);
        assert_eq!(to_wire_value(EventKind::FuelKill, 0.0), 0x580000 as f64);
        assert_eq!(from_wire_value(EventKind::FuelKill, 0x58FFFF as f64), 1.0);
    }

    #[test]
    fn test_other_kinds_untouched() {
        assert_eq!(to_wire_value(EventKind::QuerySpeed, 42.5), 42.5);
        assert_eq!(from_wire_value(EventKind::GasPedal, 0.3), 0.3);
    }
}

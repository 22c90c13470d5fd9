//! Signal descriptors
//!
//! A descriptor tells the codec where a physical value lives inside a
//! payload and how it is scaled.

use crate::types::{Result, SimError};
use serde::{Deserialize, Serialize};

/// Largest payload a single record can carry
pub const MAX_PAYLOAD_BYTES: u8 = 8;

/// Wire layout of one event kind
///
/// Bit positions count from the most significant bit of byte 0 (bit 0) towards
/// the least significant bit of the last byte. The field occupies
/// `[bit_start - bit_width + 1, bit_start]`, most significant raw bit first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalDescriptor {
    /// Numeric bus identifier
    pub channel_id: u32,
    /// Payload length in bytes (1..=8)
    pub byte_length: u8,
    /// Position of the least significant raw bit
    pub bit_start: u8,
    /// Field width in bits (1..=64)
    pub bit_width: u8,
    /// Physical value per raw unit
    pub scale: f64,
    /// Physical value at raw zero
    pub offset: f64,
}

impl SignalDescriptor {
    /// Create a descriptor, validating the layout
    pub fn new(
        channel_id: u32,
        byte_length: u8,
        bit_start: u8,
        bit_width: u8,
        scale: f64,
        offset: f64,
    ) -> Result<Self> {
        let descriptor = Self {
            channel_id,
            byte_length,
            bit_start,
            bit_width,
            scale,
            offset,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Check that the field fits inside the payload and the transform is usable
    pub fn validate(&self) -> Result<()> {
        if self.byte_length == 0 || self.byte_length > MAX_PAYLOAD_BYTES {
            return Err(SimError::InvalidSignalDefinition(format!(
                "channel 0x{:X}: byte length {} outside 1..={}",
                self.channel_id, self.byte_length, MAX_PAYLOAD_BYTES
            )));
        }

        if self.bit_width == 0 || self.bit_width > 64 {
            return Err(SimError::InvalidSignalDefinition(format!(
                "channel 0x{:X}: bit width {} outside 1..=64",
                self.channel_id, self.bit_width
            )));
        }

        if u16::from(self.bit_start) >= u16::from(self.byte_length) * 8 {
            return Err(SimError::InvalidSignalDefinition(format!(
                "channel 0x{:X}: bit start {} beyond {}-byte payload",
                self.channel_id, self.bit_start, self.byte_length
            )));
        }

        // bit_start - bit_width >= -1
        if u16::from(self.bit_start) + 1 < u16::from(self.bit_width) {
            return Err(SimError::InvalidSignalDefinition(format!(
                "channel 0x{:X}: {}-bit field ending at bit {} starts before bit 0",
                self.channel_id, self.bit_width, self.bit_start
            )));
        }

        if !self.scale.is_finite() || self.scale == 0.0 {
            return Err(SimError::InvalidSignalDefinition(format!(
                "channel 0x{:X}: scale must be finite and nonzero, got {}",
                self.channel_id, self.scale
            )));
        }

        if !self.offset.is_finite() {
            return Err(SimError::InvalidSignalDefinition(format!(
                "channel 0x{:X}: offset must be finite, got {}",
                self.channel_id, self.offset
            )));
        }

        Ok(())
    }

    /// Position of the most significant raw bit
    pub fn first_bit(&self) -> u8 {
        self.bit_start + 1 - self.bit_width
    }

    /// Largest raw value the field can hold
    ///
    /// Encoding goes through `f64`, so above 2^53 not every raw value is reachable.
    pub fn max_raw(&self) -> u64 {
        if self.bit_width >= 64 {
            u64::MAX
        } else {
            (1u64 << self.bit_width) - 1
        }
    }

    /// Physical value to quantized raw value (not range checked)
    pub fn to_raw(&self, value: f64) -> f64 {
        ((value - self.offset) / self.scale).round()
    }

    /// Raw value to physical value
    pub fn to_physical(&self, raw: u64) -> f64 {
        raw as f64 * self.scale + self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_descriptor() {
        let desc = SignalDescriptor::new(0xB4, 8, 47, 16, 0.01, 0.0).unwrap();
        assert_eq!(desc.first_bit(), 32);
        assert_eq!(desc.max_raw(), 0xFFFF);
    }

    #[test]
    fn test_full_width_descriptor() {
        let desc = SignalDescriptor::new(0x0, 8, 63, 64, 1.0, 0.0).unwrap();
        assert_eq!(desc.first_bit(), 0);
        assert_eq!(desc.max_raw(), u64::MAX);
    }

    #[test]
    fn test_field_before_first_bit_rejected() {
        // 12 bits cannot end at bit 3
        let result = SignalDescriptor::new(0x25, 8, 3, 12, 1.5, 0.0);
        assert!(matches!(result, Err(SimError::InvalidSignalDefinition(_))));
    }

    #[test]
    fn test_field_beyond_payload_rejected() {
        let result = SignalDescriptor::new(0x245, 5, 40, 8, 1.0, 0.0);
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_lengths_and_scale_rejected() {
        assert!(SignalDescriptor::new(0x1, 0, 0, 1, 1.0, 0.0).is_err());
        assert!(SignalDescriptor::new(0x1, 9, 7, 8, 1.0, 0.0).is_err());
        assert!(SignalDescriptor::new(0x1, 1, 7, 0, 1.0, 0.0).is_err());
        assert!(SignalDescriptor::new(0x1, 1, 7, 8, 0.0, 0.0).is_err());
        assert!(SignalDescriptor::new(0x1, 1, 7, 8, 1.0, f64::NAN).is_err());
    }

    #[test]
    fn test_physical_conversion() {
        let rpm = SignalDescriptor::new(0x1C4, 8, 15, 16, 1.0, -400.0).unwrap();
        assert_eq!(rpm.to_raw(1600.0), 2000.0);
        assert_eq!(rpm.to_physical(2000), 1600.0);
    }
}

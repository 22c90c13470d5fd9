//! Signal codec
//!
//! Maps a physical value to a bit field inside a payload and back, following
//! the descriptor registered for the event kind. Bit numbering is big-endian:
//! bit 0 is the most significant bit of byte 0.

use crate::signals::{SignalDescriptor, SignalTable};
use crate::types::{EventKind, Result, SimError};

/// Payload produced by the encoder
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedSignal {
    /// Payload bytes, exactly `descriptor.byte_length` long
    pub data: Vec<u8>,
    /// Descriptor used for encoding
    pub descriptor: SignalDescriptor,
    /// True if the kind had no descriptor and the fallback layout was used
    pub used_fallback: bool,
}

/// Encoder/decoder over a signal table
#[derive(Debug, Clone)]
pub struct SignalCodec {
    table: SignalTable,
    fallback: Option<SignalDescriptor>,
}

impl SignalCodec {
    /// Create a codec without a fallback descriptor
    pub fn new(table: SignalTable) -> Self {
        Self {
            table,
            fallback: None,
        }
    }

    /// Codec over the standard signal table
    pub fn standard() -> Result<Self> {
        Ok(Self::new(SignalTable::standard()?))
    }

    /// Builder method: encode kinds without a descriptor using this layout
    ///
    /// Encodings that took this path are flagged with `used_fallback`.
    pub fn with_fallback(mut self, descriptor: SignalDescriptor) -> Result<Self> {
        descriptor.validate()?;
        self.fallback = Some(descriptor);
        Ok(self)
    }

    /// The underlying signal table
    pub fn table(&self) -> &SignalTable {
        &self.table
    }

    /// Encode a physical value into a zero-initialized payload
    pub fn encode(&self, kind: EventKind, value: f64) -> Result<EncodedSignal> {
        if kind == EventKind::Unknown {
            return Err(SimError::UnknownKind(kind));
        }

        let (descriptor, used_fallback) = match self.table.get(kind) {
            Some(descriptor) => (*descriptor, false),
            None => match self.fallback {
                Some(fallback) => {
                    log::debug!("No descriptor for '{}', using fallback layout", kind);
                    (fallback, true)
                }
                None => return Err(SimError::UnknownKind(kind)),
            },
        };

        let raw = Self::quantize(kind, value, &descriptor)?;
        let mut data = vec![0u8; descriptor.byte_length as usize];
        Self::insert_big_endian(&mut data, &descriptor, raw);

        Ok(EncodedSignal {
            data,
            descriptor,
            used_fallback,
        })
    }

    /// Decode the physical value of `kind` from a payload
    ///
    /// Missing trailing bytes read as zero.
    pub fn decode(&self, kind: EventKind, data: &[u8]) -> Result<f64> {
        let descriptor = self.table.get(kind).ok_or(SimError::UnknownKind(kind))?;
        Ok(Self::decode_with(descriptor, data))
    }

    /// Decode a payload with an explicit descriptor
    pub fn decode_with(descriptor: &SignalDescriptor, data: &[u8]) -> f64 {
        let raw = Self::extract_big_endian(data, descriptor);
        descriptor.to_physical(raw)
    }

    /// Physical value → raw integer, rejecting values the field cannot hold
    ///
    /// The raw value goes through `f64`, so fields wider than 53 bits cannot
    /// carry every raw value exactly. A 64-bit field tops out below `2^64 - 1`.
    fn quantize(kind: EventKind, value: f64, descriptor: &SignalDescriptor) -> Result<u64> {
        let raw = descriptor.to_raw(value);
        let limit = 2f64.powi(i32::from(descriptor.bit_width));

        if !(raw >= 0.0 && raw < limit) {
            return Err(SimError::ValueOutOfRange {
                kind,
                value,
                bit_width: descriptor.bit_width,
            });
        }

        Ok(raw as u64)
    }

    /// Write `raw` into the field, most significant bit at `first_bit`
    fn insert_big_endian(data: &mut [u8], descriptor: &SignalDescriptor, raw: u64) {
        let first_bit = descriptor.first_bit() as usize;
        let length = descriptor.bit_width as usize;

        for i in 0..length {
            let bit_pos = first_bit + i;
            let byte_idx = bit_pos / 8;
            let bit_in_byte = 7 - (bit_pos % 8);

            let bit_value = ((raw >> (length - 1 - i)) & 0x01) as u8;
            if let Some(byte) = data.get_mut(byte_idx) {
                *byte |= bit_value << bit_in_byte;
            }
        }
    }

    /// Read the field back as an unsigned integer
    fn extract_big_endian(data: &[u8], descriptor: &SignalDescriptor) -> u64 {
        let first_bit = descriptor.first_bit() as usize;
        let length = descriptor.bit_width as usize;
        let mut result: u64 = 0;

        for i in 0..length {
            let bit_pos = first_bit + i;
            let byte_idx = bit_pos / 8;
            let bit_in_byte = 7 - (bit_pos % 8);

            if byte_idx < data.len() {
                let bit_value = (data[byte_idx] >> bit_in_byte) & 0x01;
                result |= (bit_value as u64) << (length - 1 - i);
            }
        }

        result
    }
}

//! Single 24-byte record

use crate::codec::SignalCodec;
use crate::formats::{
    to_wire_value, RECORD_INFO_A, RECORD_INFO_B, RECORD_LEN, RECORD_TYPE_DATA,
};
use crate::signals::MAX_PAYLOAD_BYTES;
use crate::types::{Event, EventKind, Result, SimError};
use byteorder::{BigEndian, ByteOrder};

/// One framed event as laid out in the record file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRecord {
    /// Timestamp in whole milliseconds
    pub timestamp_ms: u64,
    /// Channel id from the signal descriptor
    pub channel_id: u32,
    /// Record type, 0 for data
    pub record_type: u8,
    pub info_a: u8,
    pub info_b: u8,
    /// Number of meaningful payload bytes
    pub payload_len: u8,
    /// Payload, zero padded to 8 bytes
    pub payload: [u8; 8],
}

impl FrameRecord {
    /// Frame an event
    ///
    /// Returns `None` for kinds without an on-wire representation (idle ticks).
    /// Timestamps are rounded to millisecond resolution.
    pub fn from_event(codec: &SignalCodec, event: &Event) -> Result<Option<Self>> {
        if event.kind == EventKind::Idle {
            return Ok(None);
        }

        let timestamp_ms = seconds_to_ms(event.timestamp)?;
        let encoded = codec.encode(event.kind, to_wire_value(event.kind, event.value))?;

        if encoded.used_fallback {
            log::debug!(
                "'{}' at t={:.3}s framed with fallback channel 0x{:X}",
                event.kind,
                event.timestamp,
                encoded.descriptor.channel_id
            );
        }

        let mut payload = [0u8; 8];
        payload[..encoded.data.len()].copy_from_slice(&encoded.data);

        Ok(Some(Self {
            timestamp_ms,
            channel_id: encoded.descriptor.channel_id,
            record_type: RECORD_TYPE_DATA,
            info_a: RECORD_INFO_A,
            info_b: RECORD_INFO_B,
            payload_len: encoded.descriptor.byte_length,
            payload,
        }))
    }

    /// Serialize to the 24-byte layout
    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let mut buf = [0u8; RECORD_LEN];
        BigEndian::write_u32(&mut buf[0..4], (self.timestamp_ms >> 32) as u32);
        BigEndian::write_u32(&mut buf[4..8], self.timestamp_ms as u32);
        BigEndian::write_u32(&mut buf[8..12], self.channel_id);
        buf[12] = self.record_type;
        buf[13] = self.info_a;
        buf[14] = self.info_b;
        buf[15] = self.payload_len;
        buf[16..24].copy_from_slice(&self.payload);
        buf
    }

    /// Parse the 24-byte layout
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < RECORD_LEN {
            return Err(SimError::MalformedRecord(format!(
                "record has {} bytes, expected {}",
                bytes.len(),
                RECORD_LEN
            )));
        }

        let high = u64::from(BigEndian::read_u32(&bytes[0..4]));
        let low = u64::from(BigEndian::read_u32(&bytes[4..8]));
        let payload_len = bytes[15];

        if payload_len > MAX_PAYLOAD_BYTES {
            return Err(SimError::MalformedRecord(format!(
                "payload length {} exceeds {} bytes",
                payload_len, MAX_PAYLOAD_BYTES
            )));
        }

        let mut payload = [0u8; 8];
        payload.copy_from_slice(&bytes[16..24]);

        Ok(Self {
            timestamp_ms: (high << 32) | low,
            channel_id: BigEndian::read_u32(&bytes[8..12]),
            record_type: bytes[12],
            info_a: bytes[13],
            info_b: bytes[14],
            payload_len,
            payload,
        })
    }

    /// Timestamp in seconds
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp_ms as f64 / 1000.0
    }

    /// The meaningful part of the payload
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.payload_len as usize]
    }
}

fn seconds_to_ms(timestamp: f64) -> Result<u64> {
    if !(timestamp.is_finite() && timestamp >= 0.0) {
        return Err(SimError::ContractViolation(format!(
            "timestamp {} cannot be framed",
            timestamp
        )));
    }
    Ok((timestamp * 1000.0).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> SignalCodec {
        SignalCodec::standard().unwrap()
    }

    #[test]
    fn test_layout_of_speed_record() {
        let event = Event::new(EventKind::QuerySpeed, 1.5, 123.45);
        let record = FrameRecord::from_event(&codec(), &event).unwrap().unwrap();
        let bytes = record.to_bytes();

        assert_eq!(&bytes[0..4], &[0, 0, 0, 0]);
        assert_eq!(&bytes[4..8], &1500u32.to_be_bytes());
        assert_eq!(&bytes[8..12], &0xB4u32.to_be_bytes());
        assert_eq!(&bytes[12..16], &[0x00, 0x05, 0x05, 0x08]);
        assert_eq!(&bytes[16..24], &[0, 0, 0, 0, 0x30, 0x39, 0, 0]);
    }

    #[test]
    fn test_short_payload_is_padded() {
        let event = Event::new(EventKind::GasPedal, 0.0, 1.0);
        let record = FrameRecord::from_event(&codec(), &event).unwrap().unwrap();
        assert_eq!(record.payload_len, 5);
        assert_eq!(record.payload(), &[0, 200, 0, 0, 0]);
        assert_eq!(&record.payload[5..], &[0, 0, 0]);
    }

    #[test]
    fn test_fuel_kill_command_bytes() {
        let event = Event::new(EventKind::FuelKill, 0.0, 1.0);
        let record = FrameRecord::from_event(&codec(), &event).unwrap().unwrap();
        assert_eq!(record.channel_id, 0x7E0);
        assert_eq!(record.payload(), &[0x00, 0x58, 0xFF, 0xFF, 0, 0, 0, 0]);
    }

    #[test]
    fn test_idle_is_not_framed() {
        let event = Event::new(EventKind::Idle, 0.2, 0.0);
        assert!(FrameRecord::from_event(&codec(), &event).unwrap().is_none());
    }

    #[test]
    fn test_large_timestamp_uses_high_word() {
        let record = FrameRecord {
            timestamp_ms: 0x1_0000_0002,
            channel_id: 0x245,
            record_type: 0,
            info_a: 5,
            info_b: 5,
            payload_len: 5,
            payload: [0; 8],
        };
        let bytes = record.to_bytes();
        assert_eq!(&bytes[0..8], &[0, 0, 0, 1, 0, 0, 0, 2]);
        assert_eq!(FrameRecord::parse(&bytes).unwrap(), record);
    }

    #[test]
    fn test_millisecond_resolution() {
        let event = Event::new(EventKind::QueryRpm, 2.0017, 1000.0);
        let record = FrameRecord::from_event(&codec(), &event).unwrap().unwrap();
        assert_eq!(record.timestamp_ms, 2002);
        assert_eq!(record.timestamp_secs(), 2.002);
    }

    #[test]
    fn test_negative_timestamp_rejected() {
        let event = Event::new(EventKind::QueryRpm, -1.0, 1000.0);
        assert!(FrameRecord::from_event(&codec(), &event).is_err());
    }

    #[test]
    fn test_parse_rejects_short_and_oversized() {
        assert!(matches!(
            FrameRecord::parse(&[0u8; 23]),
            Err(SimError::MalformedRecord(_))
        ));

        let mut bytes = [0u8; RECORD_LEN];
        bytes[15] = 9;
        assert!(FrameRecord::parse(&bytes).is_err());
    }
}

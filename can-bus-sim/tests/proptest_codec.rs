//! Property-based tests for the signal codec and the record layout.

use can_bus_sim::{
    Event, EventKind, FrameReader, FrameRecord, FrameWriter, SignalCodec, SignalDescriptor,
};
use proptest::collection::{btree_set, vec};
use proptest::prelude::*;
use proptest::sample::subsequence;
use std::io::Cursor;

const ENCODABLE: [EventKind; 10] = [
    EventKind::BusDiagnostic,
    EventKind::SteeringAngle,
    EventKind::QuerySpeed,
    EventKind::QueryRpm,
    EventKind::QueryTorque,
    EventKind::BrakePedal,
    EventKind::GasPedal,
    EventKind::PreCollision,
    EventKind::GearStatus,
    EventKind::FuelKill,
];

fn descriptor(codec: &SignalCodec, kind: EventKind) -> SignalDescriptor {
    *codec.table().get(kind).expect("standard kind")
}

/// Raw values representable exactly as f64 and inside the field
fn raw_limit(descriptor: &SignalDescriptor) -> u64 {
    if descriptor.bit_width >= 40 {
        1u64 << 40
    } else {
        1u64 << descriptor.bit_width
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Any on-grid value decodes back to itself.
    #[test]
    fn prop_value_survives_encoding(index in 0usize..ENCODABLE.len(), seed in any::<u64>()) {
        let codec = SignalCodec::standard().unwrap();
        let kind = ENCODABLE[index];
        let desc = descriptor(&codec, kind);
        let raw = seed % raw_limit(&desc);
        let value = desc.to_physical(raw);

        let encoded = codec.encode(kind, value).unwrap();
        let decoded = codec.decode(kind, &encoded.data).unwrap();

        prop_assert!((decoded - value).abs() <= desc.scale.abs() / 2.0,
            "{kind}: {value} decoded as {decoded}");
    }

    /// Bits outside the signal field stay zero.
    #[test]
    fn prop_field_is_isolated(index in 0usize..ENCODABLE.len(), seed in any::<u64>()) {
        let codec = SignalCodec::standard().unwrap();
        let kind = ENCODABLE[index];
        let desc = descriptor(&codec, kind);
        let value = desc.to_physical(seed % raw_limit(&desc));

        let encoded = codec.encode(kind, value).unwrap();
        prop_assert_eq!(encoded.data.len(), desc.byte_length as usize);

        let first = desc.first_bit() as usize;
        let last = desc.bit_start as usize;
        for bit in 0..encoded.data.len() * 8 {
            if bit < first || bit > last {
                let set = encoded.data[bit / 8] >> (7 - bit % 8) & 1;
                prop_assert_eq!(set, 0, "{} sets bit {} outside [{}, {}]", kind, bit, first, last);
            }
        }
    }

    /// Values past the field width are rejected, never wrapped.
    #[test]
    fn prop_overflow_rejected(excess in 1u64..1000) {
        let codec = SignalCodec::standard().unwrap();
        let desc = descriptor(&codec, EventKind::GearStatus);
        let value = (desc.max_raw() + excess) as f64;
        prop_assert!(codec.encode(EventKind::GearStatus, value).is_err());
    }

    /// Records serialize to 24 bytes and parse back to the same record.
    #[test]
    fn prop_record_layout_is_stable(
        ms in 0u64..10_000_000_000,
        rpm in 0u32..60_000,
    ) {
        let codec = SignalCodec::standard().unwrap();
        let event = Event::new(EventKind::QueryRpm, ms as f64 / 1000.0, f64::from(rpm) - 400.0);
        let record = FrameRecord::from_event(&codec, &event).unwrap().unwrap();

        prop_assert_eq!(record.timestamp_ms, ms);
        let bytes = record.to_bytes();
        prop_assert_eq!(FrameRecord::parse(&bytes).unwrap(), record);
    }

    /// Events written to a store read back with the same kind, value and timestamp.
    #[test]
    fn prop_store_round_trip(
        kinds in subsequence(ENCODABLE.to_vec(), 1..=ENCODABLE.len()),
        slots in btree_set(0u64..=1_000_000, ENCODABLE.len()),
        seeds in vec(any::<u64>(), ENCODABLE.len()),
    ) {
        let codec = SignalCodec::standard().unwrap();
        let written: Vec<Event> = kinds
            .iter()
            .zip(&slots)
            .zip(&seeds)
            .map(|((&kind, &ms), &seed)| {
                let value = if kind == EventKind::FuelKill {
                    (seed % 0x1_0000) as f64 / f64::from(0xFFFF_u32)
                } else {
                    let desc = descriptor(&codec, kind);
                    desc.to_physical(seed % raw_limit(&desc))
                };
                Event::new(kind, ms as f64 / 1000.0, value)
            })
            .collect();

        let mut writer = FrameWriter::new(Vec::new(), codec.clone());
        prop_assert_eq!(writer.write_events(&written).unwrap(), written.len());
        let bytes = writer.finish().unwrap();
        prop_assert_eq!(bytes.len(), written.len() * 24);

        let (read, summary) = FrameReader::new(Cursor::new(bytes), codec.clone())
            .read_all()
            .unwrap();
        prop_assert_eq!(summary.malformed, 0);
        prop_assert_eq!(read.len(), written.len());

        for (before, after) in written.iter().zip(&read) {
            let tolerance = if before.kind == EventKind::FuelKill {
                0.5 / f64::from(0xFFFF_u32)
            } else {
                descriptor(&codec, before.kind).scale.abs() / 2.0
            };
            prop_assert_eq!(after.kind, before.kind);
            prop_assert!((after.value - before.value).abs() <= tolerance + 1e-9,
                "{}: {} read back as {}", before.kind, before.value, after.value);
            prop_assert!((after.timestamp - before.timestamp).abs() <= 0.001,
                "{}: t={} read back as t={}", before.kind, before.timestamp, after.timestamp);
        }
    }
}

//! Signal table
//!
//! Enum-keyed registry of signal descriptors with a reverse channel lookup.
//! The table is validated once when it is built and never mutated afterwards.

use crate::signals::descriptor::SignalDescriptor;
use crate::types::{EventKind, Result, SimError};
use std::collections::HashMap;

/// Channel ids below this limit are reserved for high-priority traffic
pub const HIGH_PRIORITY_ID_LIMIT: u32 = 0x010;

/// Layout rows of the standard table: (kind, channel, bytes, bit start, width, scale, offset)
///
/// Pedal rows carry a 0..1 position rather than a sensor reading, so their
/// scales are sized for that range.
const STANDARD_LAYOUT: [(EventKind, u32, u8, u8, u8, f64, f64); 10] = [
    (EventKind::BusDiagnostic, 0x000, 8, 63, 64, 1.0, 0.0),
    (EventKind::SteeringAngle, 0x025, 8, 15, 12, 1.5, -1536.0),
    (EventKind::QuerySpeed, 0x0B4, 8, 47, 16, 0.01, 0.0),
    (EventKind::QueryRpm, 0x1C4, 8, 15, 16, 1.0, -400.0),
    (EventKind::QueryTorque, 0x1C5, 8, 31, 16, 0.01, 0.0),
    (EventKind::BrakePedal, 0x224, 8, 47, 16, 0.001, 0.0),
    (EventKind::GasPedal, 0x245, 5, 15, 8, 0.005, 0.0),
    (EventKind::PreCollision, 0x283, 7, 23, 8, 1.0, 0.0),
    (EventKind::GearStatus, 0x3BC, 8, 13, 6, 1.0, 0.0),
    (EventKind::FuelKill, 0x7E0, 8, 31, 24, 1.0, 0.0),
];

/// Immutable kind → descriptor registry
#[derive(Debug, Clone)]
pub struct SignalTable {
    /// Descriptors by event kind
    descriptors: HashMap<EventKind, SignalDescriptor>,
    /// Reverse lookup: channel id → event kind
    channels: HashMap<u32, EventKind>,
}

impl SignalTable {
    /// Build a table from (kind, descriptor) pairs
    ///
    /// Fails if a descriptor is invalid, a kind appears twice, two kinds share
    /// a channel id, a decode-only or wire-less kind is given a descriptor, or a
    /// high-priority kind sits outside the reserved id range.
    pub fn from_descriptors<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (EventKind, SignalDescriptor)>,
    {
        let mut descriptors = HashMap::new();
        let mut channels = HashMap::new();

        for (kind, descriptor) in entries {
            if matches!(kind, EventKind::Unknown | EventKind::Idle) {
                return Err(SimError::InvalidSignalDefinition(format!(
                    "'{}' has no on-wire representation",
                    kind
                )));
            }

            descriptor.validate()?;

            if kind.is_high_priority() && descriptor.channel_id >= HIGH_PRIORITY_ID_LIMIT {
                return Err(SimError::InvalidSignalDefinition(format!(
                    "high-priority kind '{}' uses channel 0x{:X}, outside the reserved range",
                    kind, descriptor.channel_id
                )));
            }

            if let Some(existing) = channels.insert(descriptor.channel_id, kind) {
                return Err(SimError::InvalidSignalDefinition(format!(
                    "channel 0x{:X} assigned to both '{}' and '{}'",
                    descriptor.channel_id, existing, kind
                )));
            }

            if descriptors.insert(kind, descriptor).is_some() {
                return Err(SimError::InvalidSignalDefinition(format!(
                    "duplicate descriptor for '{}'",
                    kind
                )));
            }
        }

        log::debug!("Signal table built with {} descriptors", descriptors.len());

        Ok(Self {
            descriptors,
            channels,
        })
    }

    /// The vehicle's standard signal layout
    pub fn standard() -> Result<Self> {
        let mut entries = Vec::with_capacity(STANDARD_LAYOUT.len());
        for (kind, channel_id, byte_length, bit_start, bit_width, scale, offset) in STANDARD_LAYOUT {
            let descriptor =
                SignalDescriptor::new(channel_id, byte_length, bit_start, bit_width, scale, offset)?;
            entries.push((kind, descriptor));
        }
        Self::from_descriptors(entries)
    }

    /// Descriptor for an event kind
    pub fn get(&self, kind: EventKind) -> Option<&SignalDescriptor> {
        self.descriptors.get(&kind)
    }

    /// Reverse lookup; unmapped channels resolve to `EventKind::Unknown`
    pub fn kind_for_channel(&self, channel_id: u32) -> EventKind {
        self.channels
            .get(&channel_id)
            .copied()
            .unwrap_or(EventKind::Unknown)
    }

    /// Number of descriptors
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// True if the table holds no descriptors
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// All (kind, descriptor) pairs, sorted by channel id
    pub fn entries(&self) -> Vec<(EventKind, &SignalDescriptor)> {
        let mut entries: Vec<_> = self
            .descriptors
            .iter()
            .map(|(kind, desc)| (*kind, desc))
            .collect();
        entries.sort_unstable_by_key(|(_, desc)| desc.channel_id);
        entries
    }
}

//! Record file reader
//!
//! Reads the 24-byte records back into events. Records are checked one at a
//! time; anything that does not match the signal table is counted and
//! skipped rather than aborting the whole read:
//!
//! - short trailing record (truncated file)
//! - payload length above 8 bytes, or different from the descriptor's
//! - non-data record type
//! - channel id that no descriptor claims

use crate::codec::SignalCodec;
use crate::formats::record::FrameRecord;
use crate::formats::{from_wire_value, RECORD_LEN, RECORD_TYPE_DATA};
use crate::types::{Event, EventKind, Result, SimError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

/// Counters collected while reading a record store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadSummary {
    /// Records (complete or truncated) seen
    pub records: usize,
    /// Events produced
    pub events: usize,
    /// Records skipped as malformed
    pub malformed: usize,
    /// Records on channels without a descriptor
    pub unknown_channel: usize,
}

/// Streams events out of a record store
pub struct FrameReader<R: Read> {
    reader: R,
    codec: SignalCodec,
    summary: ReadSummary,
    finished: bool,
}

impl FrameReader<BufReader<File>> {
    /// Open a record file
    pub fn open(path: &Path, codec: SignalCodec) -> Result<Self> {
        log::info!("Opening record file: {:?}", path);
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), codec))
    }
}

impl<R: Read> FrameReader<R> {
    /// Wrap any byte source
    pub fn new(reader: R, codec: SignalCodec) -> Self {
        Self {
            reader,
            codec,
            summary: ReadSummary::default(),
            finished: false,
        }
    }

    /// Counters so far
    pub fn summary(&self) -> ReadSummary {
        self.summary
    }

    /// Drain the store into a vector
    pub fn read_all(mut self) -> Result<(Vec<Event>, ReadSummary)> {
        let mut events = Vec::new();
        for event in self.by_ref() {
            events.push(event?);
        }

        let summary = self.summary;
        log::info!(
            "Read {} records: {} events, {} unknown channel",
            summary.records,
            summary.events,
            summary.unknown_channel
        );
        if summary.malformed > 0 {
            log::warn!("Skipped {} malformed records", summary.malformed);
        }

        Ok((events, summary))
    }

    /// Fill `buf` as far as the source allows, returning bytes read
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(SimError::IoError(e)),
            }
        }
        Ok(filled)
    }

    /// Turn one well-formed record into an event, or explain why not
    fn decode_record(&self, record: &FrameRecord) -> std::result::Result<Event, Skip> {
        if record.record_type != RECORD_TYPE_DATA {
            return Err(Skip::Malformed(format!(
                "record type {} at {} ms",
                record.record_type, record.timestamp_ms
            )));
        }

        let kind = self.codec.table().kind_for_channel(record.channel_id);
        if kind == EventKind::Unknown {
            return Err(Skip::UnknownChannel(record.channel_id));
        }

        let descriptor = self
            .codec
            .table()
            .get(kind)
            .ok_or(Skip::UnknownChannel(record.channel_id))?;
        if record.payload_len != descriptor.byte_length {
            return Err(Skip::Malformed(format!(
                "channel 0x{:X} carries {} bytes, expected {}",
                record.channel_id, record.payload_len, descriptor.byte_length
            )));
        }

        let value = SignalCodec::decode_with(descriptor, record.payload());
        Ok(Event::new(
            kind,
            record.timestamp_secs(),
            from_wire_value(kind, value),
        ))
    }
}

enum Skip {
    Malformed(String),
    UnknownChannel(u32),
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = [0u8; RECORD_LEN];

        while !self.finished {
            let n = match self.fill(&mut buf) {
                Ok(n) => n,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            };

            if n == 0 {
                self.finished = true;
                break;
            }

            self.summary.records += 1;

            if n < RECORD_LEN {
                log::warn!("Truncated trailing record: {} of {} bytes", n, RECORD_LEN);
                self.summary.malformed += 1;
                self.finished = true;
                break;
            }

            let record = match FrameRecord::parse(&buf) {
                Ok(record) => record,
                Err(e) => {
                    log::debug!("Skipping record {}: {}", self.summary.records, e);
                    self.summary.malformed += 1;
                    continue;
                }
            };

            match self.decode_record(&record) {
                Ok(event) => {
                    self.summary.events += 1;
                    return Some(Ok(event));
                }
                Err(Skip::Malformed(reason)) => {
                    log::debug!("Skipping malformed record: {}", reason);
                    self.summary.malformed += 1;
                }
                Err(Skip::UnknownChannel(id)) => {
                    log::trace!("No descriptor for channel 0x{:X}", id);
                    self.summary.unknown_channel += 1;
                }
            }
        }

        None
    }
}

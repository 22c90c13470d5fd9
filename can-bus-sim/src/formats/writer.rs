//! Record file writer

use crate::codec::SignalCodec;
use crate::formats::record::FrameRecord;
use crate::types::{Event, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Appends framed events to a record store
pub struct FrameWriter<W: Write> {
    writer: W,
    codec: SignalCodec,
    written: usize,
    skipped: usize,
}

impl FrameWriter<BufWriter<File>> {
    /// Create (or truncate) a record file
    pub fn create(path: &Path, codec: SignalCodec) -> Result<Self> {
        log::info!("Creating record file: {:?}", path);
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), codec))
    }

    /// Open a record file for appending, creating it if needed
    pub fn append(path: &Path, codec: SignalCodec) -> Result<Self> {
        log::info!("Appending to record file: {:?}", path);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file), codec))
    }
}

impl<W: Write> FrameWriter<W> {
    /// Wrap any byte sink
    pub fn new(writer: W, codec: SignalCodec) -> Self {
        Self {
            writer,
            codec,
            written: 0,
            skipped: 0,
        }
    }

    /// Codec used for framing
    pub fn codec(&self) -> &SignalCodec {
        &self.codec
    }

    /// Frame and append one event
    ///
    /// Returns `false` if the event kind has no on-wire representation.
    pub fn write_event(&mut self, event: &Event) -> Result<bool> {
        match FrameRecord::from_event(&self.codec, event)? {
            Some(record) => {
                self.write_record(&record)?;
                Ok(true)
            }
            None => {
                self.skipped += 1;
                Ok(false)
            }
        }
    }

    /// Frame and append a stream of events, returning how many were written
    pub fn write_events<'a, I>(&mut self, events: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a Event>,
    {
        let before = self.written;
        for event in events {
            self.write_event(event)?;
        }
        Ok(self.written - before)
    }

    /// Append an already framed record
    pub fn write_record(&mut self, record: &FrameRecord) -> Result<()> {
        self.writer.write_all(&record.to_bytes())?;
        self.written += 1;
        Ok(())
    }

    /// Records written so far
    pub fn records_written(&self) -> usize {
        self.written
    }

    /// Events skipped because they have no on-wire form
    pub fn events_skipped(&self) -> usize {
        self.skipped
    }

    /// Flush and hand back the underlying sink
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        log::info!(
            "Record store closed: {} records written, {} events without wire form",
            self.written,
            self.skipped
        );
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::RECORD_LEN;
    use crate::types::{EventKind, SimError};

    fn writer() -> FrameWriter<Vec<u8>> {
        FrameWriter::new(Vec::new(), SignalCodec::standard().unwrap())
    }

    #[test]
    fn test_fixed_record_size() {
        let mut writer = writer();
        let events = vec![
            Event::new(EventKind::GasPedal, 0.001, 0.4),
            Event::new(EventKind::Idle, 0.002, 0.0),
            Event::new(EventKind::PreCollision, 0.003, 1.0),
        ];

        let written = writer.write_events(&events).unwrap();
        assert_eq!(written, 2);
        assert_eq!(writer.events_skipped(), 1);

        let bytes = writer.finish().unwrap();
        assert_eq!(bytes.len(), 2 * RECORD_LEN);
    }

    #[test]
    fn test_out_of_range_value_is_surfaced() {
        let mut writer = writer();
        let result = writer.write_event(&Event::new(EventKind::QueryTorque, 0.0, 1000.0));
        assert!(matches!(result, Err(SimError::ValueOutOfRange { .. })));
        assert_eq!(writer.records_written(), 0);
    }

    #[test]
    fn test_append_mode_keeps_existing_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.canrec");
        let codec = SignalCodec::standard().unwrap();

        let mut first = FrameWriter::create(&path, codec.clone()).unwrap();
        first.write_event(&Event::new(EventKind::QuerySpeed, 0.0, 10.0)).unwrap();
        first.finish().unwrap();

        let mut second = FrameWriter::append(&path, codec).unwrap();
        second.write_event(&Event::new(EventKind::QuerySpeed, 1.0, 11.0)).unwrap();
        second.finish().unwrap();

        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len, 2 * RECORD_LEN as u64);
    }
}

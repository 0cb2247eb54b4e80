//! Boundary traits between the selection core and the external framework.
//!
//! The core never opens files or decides which events to read: a driver
//! pulls from an [`EventSource`] and pushes emitted records into a
//! [`RecordSink`]. Both calls are synchronous from the core's point of view.

use crate::{Event, ReducedRecord, Result};

/// Ordered sequence of events supplied by an external data source.
pub trait EventSource {
    /// Next event, `None` at the end of the sequence.
    ///
    /// An `Err` item is a malformed record: the driver counts it and moves on.
    fn next_event(&mut self) -> Option<Result<Event>>;

    /// Source name for log messages.
    fn name(&self) -> &str;
}

/// Destination for reduced records.
pub trait RecordSink {
    /// Write one completed record.
    fn write_record(&mut self, record: &ReducedRecord) -> Result<()>;

    /// Flush buffered records at the end of a run.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// In-memory event source.
#[derive(Debug, Default)]
pub struct VecSource {
    events: std::vec::IntoIter<Result<Event>>,
}

impl VecSource {
    /// Source over well-formed events.
    pub fn new(events: Vec<Event>) -> Self {
        Self::from_results(events.into_iter().map(Ok).collect())
    }

    /// Source that may also yield malformed entries.
    pub fn from_results(events: Vec<Result<Event>>) -> Self {
        Self { events: events.into_iter() }
    }
}

impl EventSource for VecSource {
    fn next_event(&mut self) -> Option<Result<Event>> {
        self.events.next()
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// In-memory record sink.
#[derive(Debug, Default)]
pub struct VecSink {
    /// Records written so far, in order.
    pub records: Vec<ReducedRecord>,
}

impl RecordSink for VecSink {
    fn write_record(&mut self, record: &ReducedRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

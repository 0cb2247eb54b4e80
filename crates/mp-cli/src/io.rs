//! JSON-lines adapters for the event source and record sink.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use mp_core::{Error, Event, EventSource, RecordSink, ReducedRecord, Result};

/// One event per line; blank lines are skipped.
///
/// Lines are read as raw bytes, so a line that is not valid UTF-8 is a
/// malformed record rather than an I/O failure.
pub struct JsonlEventSource<R> {
    reader: R,
    name: String,
    line_no: usize,
    buf: Vec<u8>,
}

impl JsonlEventSource<BufReader<File>> {
    /// Open `path` for reading.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), path.display().to_string()))
    }
}

impl<R: BufRead> JsonlEventSource<R> {
    /// Source over an already-open reader.
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self { reader, name: name.into(), line_no: 0, buf: Vec::new() }
    }
}

impl<R: BufRead> EventSource for JsonlEventSource<R> {
    fn next_event(&mut self) -> Option<Result<Event>> {
        loop {
            self.buf.clear();
            self.line_no += 1;
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(Error::Io(e))),
            }
            let line = self.buf.trim_ascii();
            if line.is_empty() {
                continue;
            }
            return Some(serde_json::from_slice(line).map_err(|e| {
                Error::MalformedRecord(format!("{}:{}: {e}", self.name, self.line_no))
            }));
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Writes one JSON record per line.
pub struct JsonlRecordSink<W: Write> {
    writer: BufWriter<W>,
}

impl JsonlRecordSink<File> {
    /// Create (or truncate) `path`.
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> JsonlRecordSink<W> {
    /// Sink over an arbitrary writer.
    pub fn new(writer: W) -> Self {
        Self { writer: BufWriter::new(writer) }
    }
}

impl<W: Write> RecordSink for JsonlRecordSink<W> {
    fn write_record(&mut self, record: &ReducedRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

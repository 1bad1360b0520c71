//! JSONL event log - one serialized `TrafficEvent` per line

use super::sink::{EventSink, SinkError};
use crate::stats_core::TrafficEvent;
use async_trait::async_trait;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

pub struct JsonlSink {
    path: PathBuf,
    writer: BufWriter<std::fs::File>,
    last_flush: Instant,
}

impl JsonlSink {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: PathBuf) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        log::info!("📝 Writing traffic events to: {}", path.display());

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            last_flush: Instant::now(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_event(&mut self, event: &TrafficEvent) -> Result<(), SinkError> {
        let json = serde_json::to_string(event)?;
        writeln!(self.writer, "{}", json)?;

        if self.last_flush.elapsed() > FLUSH_INTERVAL {
            self.flush_now()?;
        }
        Ok(())
    }

    pub fn flush_now(&mut self) -> std::io::Result<()> {
        self.writer.flush()?;
        self.last_flush = Instant::now();
        Ok(())
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

#[async_trait]
impl EventSink for JsonlSink {
    async fn emit(&mut self, event: &TrafficEvent) -> Result<(), SinkError> {
        self.write_event(event)
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        self.flush_now()?;
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "jsonl"
    }
}

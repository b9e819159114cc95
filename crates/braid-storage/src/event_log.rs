//! Append-only event log
//!
//! Events are written in insertion order, which is a topological order of
//! the DAG, so replaying the log through the engine rebuilds its state.
//!
//! Record layout: `u32` little-endian length followed by the bincode
//! encoding of the signed event. Annotations are never written.

use braid_core::{BraidError, Event, Result};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File-backed log of signed events
pub struct EventLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl EventLog {
    /// Open (creating if needed) the log at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| BraidError::Storage(format!("open {}: {}", path.display(), e)))?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event and flush
    pub fn append(&self, event: &Event) -> Result<()> {
        let bytes =
            bincode::serialize(event).map_err(|e| BraidError::Serialization(e.to_string()))?;
        let len = u32::try_from(bytes.len())
            .map_err(|_| BraidError::Storage(format!("event {} too large", event.hash())))?;

        let io = |e: std::io::Error| BraidError::Storage(e.to_string());
        let mut writer = self.writer.lock();
        writer.write_all(&len.to_le_bytes()).map_err(io)?;
        writer.write_all(&bytes).map_err(io)?;
        writer.flush().map_err(io)
    }

    /// Read every event in log order
    pub fn read_all(&self) -> Result<Vec<Event>> {
        let file = File::open(&self.path).map_err(|e| BraidError::Storage(e.to_string()))?;
        let mut reader = BufReader::new(file);
        let mut events = Vec::new();

        loop {
            let mut len = [0u8; 4];
            match reader.read_exact(&mut len) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(BraidError::Storage(e.to_string())),
            }
            let mut bytes = vec![0u8; u32::from_le_bytes(len) as usize];
            reader
                .read_exact(&mut bytes)
                .map_err(|e| BraidError::Storage(format!("truncated record: {}", e)))?;
            let event: Event =
                bincode::deserialize(&bytes).map_err(|e| BraidError::Serialization(e.to_string()))?;
            events.push(event);
        }

        debug!(path = %self.path.display(), events = events.len(), "Read event log");
        Ok(events)
    }
}

//! NDJSON (newline-delimited JSON) stream listener.
//!
//! Each delivered snapshot is serialized directly to the writer via
//! `serde_json::to_writer` and flushed, so a reader tailing the stream sees
//! every update as soon as it is delivered.
//!
//! ```ignore
//! let sink: Arc<dyn DataChangedListener> = Arc::new(JsonStreamListener::stdout("settings"));
//! listeners.add_listener(sink, UserId(0));
//! ```

use super::SnapshotRow;
use crate::callback::RemoteCallback;
use crate::data::SafetyCenterData;
use crate::listeners::DataChangedListener;
use std::io::{self, BufWriter, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use warden_core::error::{WardenError, WardenResult};

/// Listener that appends every snapshot it receives as one NDJSON row.
pub struct JsonStreamListener<W: Write + Send> {
    name: String,
    writer: Mutex<BufWriter<W>>,
    rows_written: AtomicUsize,
}

impl JsonStreamListener<io::Stdout> {
    /// Write NDJSON to stdout.
    pub fn stdout(name: impl Into<String>) -> Self {
        Self::new(name, io::stdout())
    }
}

impl<W: Write + Send> JsonStreamListener<W> {
    /// Create a listener wrapping any writer (file, Vec<u8>, etc.).
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer: Mutex::new(BufWriter::with_capacity(64 * 1024, writer)),
            rows_written: AtomicUsize::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows written so far.
    pub fn rows_written(&self) -> usize {
        self.rows_written.load(Ordering::SeqCst)
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> WardenResult<W> {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_inner()
            .map_err(|e| WardenError::Delivery(format!("flush failed: {}", e.error())))
    }
}

impl<W: Write + Send> RemoteCallback for JsonStreamListener<W> {}

impl<W: Write + Send> DataChangedListener for JsonStreamListener<W> {
    fn on_data_changed(&self, data: &SafetyCenterData) -> WardenResult<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let row = SnapshotRow {
            listener: &self.name,
            seq: self.rows_written(),
            highest_severity: data.highest_severity(),
            data,
        };

        serde_json::to_writer(&mut *writer, &row)
            .map_err(|e| WardenError::Delivery(format!("{}: {e}", self.name)))?;
        writer
            .write_all(b"\n")
            .and_then(|()| writer.flush())
            .map_err(|e| WardenError::Delivery(format!("{}: {e}", self.name)))?;

        self.rows_written.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

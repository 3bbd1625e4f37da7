//! Append-only feedback capture

use crate::errors::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// One piece of sales feedback about a scored lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Milliseconds since the Unix epoch
    pub received_at_ms: u64,
    pub payload: Value,
}

impl FeedbackRecord {
    pub fn now(payload: Value) -> Self {
        let received_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            received_at_ms,
            payload,
        }
    }
}

pub trait FeedbackSink: Send + Sync {
    fn record(&self, record: &FeedbackRecord) -> Result<()>;
}

/// Writes one JSON object per line, never rewriting earlier lines
#[derive(Debug)]
pub struct JsonLinesFeedbackSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonLinesFeedbackSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every record, skipping blank lines
    pub fn read_all(&self) -> Result<Vec<FeedbackRecord>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}

impl FeedbackSink for JsonLinesFeedbackSink {
    fn record(&self, record: &FeedbackRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        // Lock guards no data; recover from poisoning.
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        debug!(path = %self.path.display(), "recorded feedback");
        Ok(())
    }
}

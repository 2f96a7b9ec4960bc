//! JSONL feed sources and sinks.
//!
//! Sources load the whole file up front and replay records in file
//! order. They deliberately do not sort by event time: disorder between
//! arrival and event time is the pipeline's concern, not the feed's.

use anyhow::{Context, Result};
use async_trait::async_trait;
use betflow_core::events::{Bet, EventScore, Fraud, TotalUpdate};
use betflow_core::traits::{BetSource, ChangelogSink, FraudSink, ScoreSource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

fn load_jsonl<T: DeserializeOwned>(path: &Path) -> Result<VecDeque<T>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading feed {}", path.display()))?;
    let mut records = VecDeque::new();
    let mut skipped = 0u64;
    for (number, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push_back(record),
            Err(err) => {
                skipped += 1;
                tracing::warn!("skipping {}:{}: {}", path.display(), number + 1, err);
            }
        }
    }
    if skipped > 0 {
        tracing::warn!("skipped {} unparsable lines in {}", skipped, path.display());
    }
    Ok(records)
}

/// Replays a wager feed from a JSONL file.
pub struct JsonlBetSource {
    records: VecDeque<Bet>,
}

impl JsonlBetSource {
    /// Loads the feed, skipping unparsable lines with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            records: load_jsonl(path.as_ref())?,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl BetSource for JsonlBetSource {
    async fn next_bet(&mut self) -> Result<Option<Bet>> {
        Ok(self.records.pop_front())
    }
}

/// Replays a score feed from a JSONL file.
pub struct JsonlScoreSource {
    records: VecDeque<EventScore>,
}

impl JsonlScoreSource {
    /// Loads the feed, skipping unparsable lines with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            records: load_jsonl(path.as_ref())?,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ScoreSource for JsonlScoreSource {
    async fn next_score(&mut self) -> Result<Option<EventScore>> {
        Ok(self.records.pop_front())
    }
}

/// Appends one JSON object per published record.
///
/// The same sink type serves both changelog streams and the fraud
/// stream; the record type decides the line shape.
pub struct JsonlSink {
    writer: BufWriter<Box<dyn Write + Send>>,
}

impl JsonlSink {
    /// Opens the sink. The path `-` writes to stdout; any other path
    /// creates the file, truncating any previous run's output. Parent
    /// directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path == Path::new("-") {
            return Ok(Self {
                writer: BufWriter::new(Box::new(io::stdout())),
            });
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let file =
            File::create(path).with_context(|| format!("creating sink {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(Box::new(file)),
        })
    }

    fn write_line<T: Serialize>(&mut self, record: &T) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        if let Err(err) = self.writer.flush() {
            tracing::error!("flushing sink failed: {}", err);
        }
    }
}

#[async_trait]
impl ChangelogSink for JsonlSink {
    async fn publish_total(&mut self, update: &TotalUpdate) -> Result<()> {
        self.write_line(update)
    }
}

#[async_trait]
impl FraudSink for JsonlSink {
    async fn publish_fraud(&mut self, fraud: &Fraud) -> Result<()> {
        self.write_line(fraud)
    }
}

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::config::PartitionConfig;
use crate::errors::{ConfigError, SinkError};
use crate::traits::TraceSink;
use crate::types::TraceRecord;

/// Appends JSON lines to log files partitioned by block number
///
/// The file for a record is chosen from its `block_number` through
/// [`PartitionConfig::path_for_block`]. Directories are created on demand
/// and files are opened in append mode, so restarts continue existing logs.
#[derive(Debug)]
pub struct PartitionedFileSink {
    config: PartitionConfig,
    current: Mutex<Option<OpenLog>>,
}

#[derive(Debug)]
struct OpenLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl PartitionedFileSink {
    pub fn new(config: PartitionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            current: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &PartitionConfig {
        &self.config
    }

    fn open(path: &Path) -> Result<OpenLog, SinkError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        debug!(path = %path.display(), "opened trace log");
        Ok(OpenLog {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }
}

impl TraceSink for PartitionedFileSink {
    fn write_record(&self, record: &TraceRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let path = self.config.path_for_block(record.block_number);
        let mut current = self.current.lock().map_err(|_| SinkError::Poisoned)?;
        if current.as_ref().map(|log| log.path != path).unwrap_or(true) {
            if let Some(mut previous) = current.take() {
                previous.writer.flush()?;
            }
            *current = Some(Self::open(&path)?);
        }
        if let Some(log) = current.as_mut() {
            log.writer.write_all(&line)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        let mut current = self.current.lock().map_err(|_| SinkError::Poisoned)?;
        if let Some(log) = current.as_mut() {
            log.writer.flush()?;
        }
        Ok(())
    }
}

//! Append-only result log
//!
//! One JSON object per line, `{"run": "<index>", "record": {...}}`. Each
//! append is flushed to disk before the next run starts, so an interrupted
//! sweep loses at most the run in flight. Reopening the log rebuilds the
//! run-index mapping and acts as the resume cursor.

use crate::bench::record::BenchmarkRecord;
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Serialize, Deserialize)]
struct LogLine {
    run: String,
    record: BenchmarkRecord,
}

/// The loaded log plus a handle for appending to it
#[derive(Debug)]
pub struct ResultStore {
    path: PathBuf,
    records: BTreeMap<usize, BenchmarkRecord>,
}

impl ResultStore {
    /// Open the log at `path`, creating it if needed
    ///
    /// A torn last line left by an interrupted write is cut off; a bad line
    /// anywhere else is an error.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let io_error = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(io_error(e)),
        };

        let mut records = BTreeMap::new();
        let mut offset = 0;
        let mut missing_newline = false;

        for (index, chunk) in bytes.split_inclusive(|b| *b == b'\n').enumerate() {
            let complete = chunk.ends_with(b"\n");
            let text = chunk.trim_ascii();
            if text.is_empty() {
                offset += chunk.len();
                continue;
            }

            let line: LogLine = match serde_json::from_slice(text) {
                Ok(line) => line,
                Err(_) if !complete => {
                    warn!(path = %path.display(), line = index + 1, "dropping torn last line of result log");
                    let file = OpenOptions::new().write(true).open(path).map_err(io_error)?;
                    file.set_len(offset as u64).map_err(io_error)?;
                    file.sync_all().map_err(io_error)?;
                    break;
                }
                Err(source) => {
                    return Err(StoreError::Corrupt {
                        path: path.to_path_buf(),
                        line: index + 1,
                        source,
                    });
                }
            };

            let run = parse_run(&line.run).ok_or_else(|| StoreError::Corrupt {
                path: path.to_path_buf(),
                line: index + 1,
                source: serde::de::Error::custom(format!("invalid run index `{}`", line.run)),
            })?;
            if records.insert(run, line.record).is_some() {
                warn!(path = %path.display(), run, "run recorded twice, keeping the later record");
            }
            missing_newline = !complete;
            offset += chunk.len();
        }

        let store = Self {
            path: path.to_path_buf(),
            records,
        };
        if missing_newline {
            store.write_line(b"\n")?;
        }
        debug!(path = %path.display(), records = store.len(), "result log loaded");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, run: usize) -> Option<&BenchmarkRecord> {
        self.records.get(&run)
    }

    /// Records in run order
    pub fn records(&self) -> impl Iterator<Item = (usize, &BenchmarkRecord)> {
        self.records.iter().map(|(run, record)| (*run, record))
    }

    /// Whether run `run` on `conffile` is already done
    ///
    /// A record for the same run index but another configuration means the
    /// dataset changed under the log.
    pub fn is_recorded(&self, run: usize, conffile: &str) -> Result<bool, StoreError> {
        match self.records.get(&run) {
            None => Ok(false),
            Some(record) if record.conffile == conffile => Ok(true),
            Some(record) => Err(StoreError::Conflict {
                run,
                recorded: record.conffile.clone(),
                expected: conffile.to_string(),
            }),
        }
    }

    /// Append the record of a run not yet in the log
    pub fn append(&mut self, run: usize, record: BenchmarkRecord) -> Result<(), StoreError> {
        if let Some(existing) = self.records.get(&run) {
            return Err(StoreError::Conflict {
                run,
                recorded: existing.conffile.clone(),
                expected: record.conffile,
            });
        }

        let line = LogLine {
            run: run.to_string(),
            record,
        };
        let mut bytes =
            serde_json::to_vec(&line).map_err(|source| StoreError::Serialize { run, source })?;
        bytes.push(b'\n');
        self.write_line(&bytes)?;

        self.records.insert(run, line.record);
        Ok(())
    }

    fn write_line(&self, bytes: &[u8]) -> Result<(), StoreError> {
        let io_error = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let mut file: File = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_error)?;
        file.write_all(bytes).map_err(io_error)?;
        file.sync_data().map_err(io_error)
    }
}

fn parse_run(run: &str) -> Option<usize> {
    run.trim().parse().ok()
}

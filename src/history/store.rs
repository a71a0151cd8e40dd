use crate::core::clock::Clock;
use crate::core::duration::ValidationError;
use crate::core::models::{Sample, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tempfile::NamedTempFile;
use thiserror::Error;

const TIMESTAMP_LABEL: &str = "Timestamp: ";
const DURATION_LABEL: &str = "Duration: ";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("History log unavailable at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write history log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Append-only travel time log. Every append rewrites the file through a
/// temporary sibling and a rename, dropping records older than the retention
/// window.
pub struct SampleStore {
    path: PathBuf,
    retention: chrono::Duration,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl SampleStore {
    pub fn new(path: PathBuf, retention: chrono::Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            path,
            retention,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, duration_text: &str) -> Result<Sample, StoreError> {
        let now = self.clock.now();
        let sample = Sample::parse(now, duration_text)?;

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let existing = match read_lines(&self.path) {
            Ok(lines) => lines,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(self.io_error(source)),
        };

        let cutoff = now.checked_sub_signed(self.retention);
        let mut evicted = 0usize;
        let mut retained: Vec<&str> = Vec::new();

        for line in &existing {
            match parse_line(line) {
                Some((timestamp, _)) if cutoff.map_or(true, |c| timestamp >= c) => {
                    retained.push(line.as_str())
                }
                Some(_) => evicted += 1,
                None => {
                    tracing::warn!(line = %line, "Dropping unreadable history record");
                    evicted += 1;
                }
            }
        }

        let new_line = format_line(&sample.timestamp, duration_text.trim());
        self.rewrite(&retained, &new_line)
            .map_err(|source| self.io_error(source))?;

        tracing::debug!(
            path = %self.path.display(),
            minutes = sample.duration_minutes,
            retained = retained.len() + 1,
            evicted,
            "Appended travel sample"
        );

        Ok(sample)
    }

    pub fn load_all(&self) -> Result<Vec<Sample>, StoreError> {
        let lines = read_lines(&self.path).map_err(|source| StoreError::Unavailable {
            path: self.path.clone(),
            source,
        })?;

        let samples = lines
            .iter()
            .filter_map(|line| {
                let (timestamp, duration_text) = parse_line(line)?;
                match Sample::parse(timestamp, duration_text) {
                    Ok(sample) => Some(sample),
                    Err(e) => {
                        tracing::warn!(error = %e, line = %line, "Skipping history record");
                        None
                    }
                }
            })
            .collect();

        Ok(samples)
    }

    fn rewrite(&self, retained: &[&str], new_line: &str) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = io::BufWriter::new(tmp.as_file_mut());
            for line in retained {
                writeln!(writer, "{line}")?;
            }
            writeln!(writer, "{new_line}")?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Reads the non-blank lines of the log. Lines that are not valid UTF-8 are
/// skipped with a warning, so they never reach a rewrite.
fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    let lines = bytes
        .split(|&b| b == b'\n')
        .enumerate()
        .filter_map(|(index, raw)| match std::str::from_utf8(raw) {
            Ok(line) => Some(line.trim_end_matches('\r')),
            Err(e) => {
                tracing::warn!(
                    line_number = index + 1,
                    error = %e,
                    "Skipping undecodable history record"
                );
                None
            }
        })
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect();
    Ok(lines)
}

fn format_line(timestamp: &NaiveDateTime, duration_text: &str) -> String {
    format!(
        "{TIMESTAMP_LABEL}{}, {DURATION_LABEL}{duration_text}",
        timestamp.format(TIMESTAMP_FORMAT)
    )
}

/// Splits a record into its timestamp and raw duration text. The label of the
/// second field is not checked.
fn parse_line(line: &str) -> Option<(NaiveDateTime, &str)> {
    let (stamp, rest) = line.trim().split_once(", ")?;
    let stamp = stamp.strip_prefix(TIMESTAMP_LABEL)?;
    let timestamp = NaiveDateTime::parse_from_str(stamp.trim(), TIMESTAMP_FORMAT).ok()?;
    let duration_text = rest.split_once(": ").map_or(rest, |(_, value)| value);
    Some((timestamp, duration_text.trim()))
}

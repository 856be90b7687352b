//! Append-only CSV ledger of completed sessions.
//!
//! Row layout, no header:
//! `date,task_description,start_epoch_seconds,end_epoch_seconds,duration_hours`

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::errors::{AppError, AppResult};
use crate::utils::time::format_float;

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRecord {
    pub date: String,
    pub task_description: String,
    pub start: f64,
    pub end: f64,
    pub duration_hours: f64,
}

impl LedgerRecord {
    fn to_row(&self) -> [String; 5] {
        [
            self.date.clone(),
            self.task_description.clone(),
            format_float(self.start),
            format_float(self.end),
            format_float(self.duration_hours),
        ]
    }

    fn from_row(row: &StringRecord, line: u64) -> AppResult<Self> {
        if row.len() != 5 {
            return Err(AppError::Ledger {
                line,
                reason: format!("expected 5 columns, found {}", row.len()),
            });
        }

        let float = |idx: usize, name: &str| -> AppResult<f64> {
            row[idx].trim().parse::<f64>().map_err(|_| AppError::Ledger {
                line,
                reason: format!("invalid {name} '{}'", &row[idx]),
            })
        };

        Ok(Self {
            date: row[0].to_string(),
            task_description: row[1].to_string(),
            start: float(2, "start")?,
            end: float(3, "end")?,
            duration_hours: float(4, "duration")?,
        })
    }
}

/// True when the file is non-empty and its last byte is not a newline.
fn ends_mid_line(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

pub struct LocalLedger {
    path: PathBuf,
}

impl LocalLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row and force it to disk before returning.
    ///
    /// The file is opened in append mode for every record, so a crash can at
    /// worst leave a truncated last line; earlier rows are never rewritten.
    /// A truncated last line is terminated first so the new row starts on its own.
    pub fn append(&self, record: &LedgerRecord) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        if ends_mid_line(&mut file)? {
            warn!(path = %self.path.display(), "ledger ends with a partial row, starting a new line");
            file.write_all(b"\n")?;
        }

        let mut wtr = WriterBuilder::new().has_headers(false).from_writer(file);
        wtr.write_record(record.to_row())?;
        wtr.flush()?;

        let file = wtr
            .into_inner()
            .map_err(|e| AppError::Io(io::Error::other(e.to_string())))?;
        file.sync_data()?;

        info!(
            path = %self.path.display(),
            task = %record.task_description,
            hours = record.duration_hours,
            "ledger row appended"
        );
        Ok(())
    }

    /// Lazily read every row in append order.
    ///
    /// A ledger that does not exist yet reads as empty; any other failure to
    /// open it is an I/O error. Each call starts from the first row again.
    pub fn read_all(&self) -> AppResult<LedgerReader> {
        let file = match File::open(&self.path) {
            Ok(f) => Some(f),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "ledger not found, reading as empty");
                None
            }
            Err(e) => return Err(AppError::Io(e)),
        };

        let inner = file.map(|f| {
            ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_reader(f)
                .into_records()
        });

        Ok(LedgerReader { inner, line: 0 })
    }

    /// Convenience for callers that want everything in memory.
    pub fn load(&self) -> AppResult<Vec<LedgerRecord>> {
        self.read_all()?.collect()
    }
}

/// Iterator over ledger rows; yields an error for a malformed row.
pub struct LedgerReader {
    inner: Option<csv::StringRecordsIntoIter<File>>,
    line: u64,
}

impl Iterator for LedgerReader {
    type Item = AppResult<LedgerRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let records = self.inner.as_mut()?;
        let row = records.next()?;
        self.line += 1;

        let line = row
            .as_ref()
            .ok()
            .and_then(|r| r.position())
            .map(|p| p.line())
            .unwrap_or(self.line);

        Some(
            row.map_err(AppError::from)
                .and_then(|r| LedgerRecord::from_row(&r, line)),
        )
    }
}

//! Append-only IGC file writer
//!
//! Every record is flushed as soon as it is written so a power loss costs at
//! most the record in flight.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{NavLoggerError, Result};

/// Exclusive handle on one flight log
pub struct IgcWriter {
    path: PathBuf,
    sink: Box<dyn Write + Send>,
    records: usize,
}

impl std::fmt::Debug for IgcWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IgcWriter")
            .field("path", &self.path)
            .field("records", &self.records)
            .finish_non_exhaustive()
    }
}

impl IgcWriter {
    /// Create a new log file; an existing file is never overwritten
    ///
    /// # Errors
    ///
    /// Returns `LogFile` if the file exists or cannot be created.
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|source| NavLoggerError::LogFile {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            sink: Box::new(file),
            records: 0,
        })
    }

    /// Route records to `sink` instead of the file
    #[cfg(test)]
    pub(crate) fn with_sink(mut self, sink: Box<dyn Write + Send>) -> Self {
        self.sink = sink;
        self
    }

    /// Append one complete record (CRLF included) and flush it
    pub fn append(&mut self, record: &str) -> Result<()> {
        self.sink
            .write_all(record.as_bytes())
            .and_then(|_| self.sink.flush())
            .map_err(|source| NavLoggerError::LogFile {
                path: self.path.clone(),
                source,
            })?;
        self.records += 1;
        Ok(())
    }

    /// Append records in order, stopping at the first failure
    pub fn append_all<I, S>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for record in records {
            self.append(record.as_ref())?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records written so far
    pub fn records(&self) -> usize {
        self.records
    }

    /// Close and delete the file, for a log that could not be completed
    pub fn discard(self) -> io::Result<()> {
        let Self { path, sink, .. } = self;
        drop(sink);
        fs::remove_file(path)
    }
}

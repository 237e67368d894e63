//! Run-scoped record of locally confirmed downloads.
//!
//! The ledger is a plain-text file with one filename per line. A pipeline
//! run truncates it on open and appends a name only after the
//! corresponding file is fully materialized on disk. Reconciliation reads
//! it back to decide which remote objects are safe to delete, so every
//! recorded name is a deletion candidate.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Append-only record of filenames confirmed present on local disk.
///
/// One ledger belongs to one pipeline run; creating it truncates any
/// previous run's file.
pub struct TransferLedger {
    path: PathBuf,
}

impl TransferLedger {
    /// Creates (or truncates) the ledger file at `path`.
    pub fn create(path: &Path) -> Result<Self, LedgerError> {
        File::create(path)?;
        tracing::debug!(path = %path.display(), "ledger initialized");
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Appends one confirmed filename.
    ///
    /// Must only be called after the file's bytes are confirmed complete
    /// on local disk.
    pub fn append(&self, name: &str) -> Result<(), LedgerError> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{name}")?;
        file.flush()?;
        Ok(())
    }

    /// Returns the recorded names in append order.
    ///
    /// Lines are whitespace-trimmed; blank lines are skipped.
    pub fn read_names(&self) -> Result<Vec<String>, LedgerError> {
        let file = File::open(&self.path)?;
        let mut names = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                names.push(trimmed.to_string());
            }
        }
        Ok(names)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn create_truncates_previous_run() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transferred.txt");
        std::fs::write(&path, "stale.mp4\n").unwrap();

        let ledger = TransferLedger::create(&path).unwrap();
        assert!(ledger.read_names().unwrap().is_empty());
    }

    #[test]
    fn append_preserves_order() {
        let dir = TempDir::new().unwrap();
        let ledger = TransferLedger::create(&dir.path().join("t.txt")).unwrap();

        ledger.append("a.mp4").unwrap();
        ledger.append("b.mp4").unwrap();
        ledger.append("c.mp4").unwrap();

        assert_eq!(ledger.read_names().unwrap(), vec!["a.mp4", "b.mp4", "c.mp4"]);
    }

    #[test]
    fn read_trims_whitespace_and_skips_blanks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.txt");
        let ledger = TransferLedger::create(&path).unwrap();
        std::fs::write(&path, "  a.mp4  \n\n\tb.mp4\n").unwrap();

        assert_eq!(ledger.read_names().unwrap(), vec!["a.mp4", "b.mp4"]);
    }

    #[test]
    fn fresh_ledger_is_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = TransferLedger::create(&dir.path().join("t.txt")).unwrap();
        assert!(ledger.read_names().unwrap().is_empty());
    }

    #[test]
    fn path_accessor() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.txt");
        let ledger = TransferLedger::create(&path).unwrap();
        assert_eq!(ledger.path(), path.as_path());
    }
}

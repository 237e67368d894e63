//! Chunked download pipeline.
//!
//! Streams remote objects to local disk in fixed-size chunks, verifies
//! the result, materializes it atomically and records it in the
//! transfer ledger. The ledger append happens strictly after the local
//! write is complete; that ordering is what makes remote deletion safe.

mod download;
mod progress;
mod validation;

pub use download::{Downloader, FetchEvent, FetchOutcome, FetchRecord};
pub use progress::ProgressGauge;
pub use validation::validate_destination_name;

use mediarelay_ledger::LedgerError;
use mediarelay_remote::RemoteError;

/// Default transfer chunk size: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024;

/// Errors produced by the fetch pipeline.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("invalid destination name: {0}")]
    InvalidName(String),

    #[error("size mismatch for {name}: expected {expected} bytes, wrote {actual}")]
    SizeMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },

    #[error("checksum mismatch for {0}")]
    ChecksumMismatch(String),

    #[error("cancelled")]
    Cancelled,
}

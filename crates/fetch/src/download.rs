//! The downloader: chunked transfer, verification, atomic
//! materialization and ledger recording.

use std::path::{Path, PathBuf};

use mediarelay_ledger::TransferLedger;
use mediarelay_remote::{RemoteError, RemoteObject, RemoteStore, TypeFilter};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::progress::ProgressGauge;
use crate::validation::validate_destination_name;
use crate::{FetchError, DEFAULT_CHUNK_SIZE};

/// Progress and outcome events emitted while fetching.
#[derive(Debug, Clone)]
pub enum FetchEvent {
    Progress { name: String, percent: u8 },
    Completed { name: String },
    Failed { name: String, error: String },
}

/// Per-file outcome of a fetch batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Completed,
    SkippedType,
    Failed(String),
}

/// One file's result within a batch.
#[derive(Debug, Clone)]
pub struct FetchRecord {
    pub name: String,
    pub outcome: FetchOutcome,
}

/// Streams remote objects to a destination directory.
///
/// Files are fetched one at a time, in the order given. A failed file
/// is logged and skipped; it never aborts the batch.
pub struct Downloader<'a> {
    store: &'a dyn RemoteStore,
    ledger: &'a TransferLedger,
    filter: TypeFilter,
    dest_dir: PathBuf,
    chunk_size: u64,
    cancel: CancellationToken,
}

impl<'a> Downloader<'a> {
    pub fn new(
        store: &'a dyn RemoteStore,
        ledger: &'a TransferLedger,
        filter: TypeFilter,
        dest_dir: &Path,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            ledger,
            filter,
            dest_dir: dest_dir.to_path_buf(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            cancel,
        }
    }

    /// Overrides the transfer chunk size (0 keeps the default).
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        if chunk_size > 0 {
            self.chunk_size = chunk_size;
        }
        self
    }

    /// Fetches one object to `dest_dir/<name>`.
    ///
    /// A name that does not match the pipeline's type filter is a
    /// warn-level skip, not an error: no network traffic, no ledger
    /// mutation. On success the name is appended to the ledger only
    /// after the file is fully on disk under its final name.
    pub async fn fetch(
        &self,
        object: &RemoteObject,
        events_tx: &mpsc::Sender<FetchEvent>,
    ) -> Result<FetchOutcome, FetchError> {
        if !self.filter.matches_name(&object.name) {
            warn!(
                name = %object.name,
                expected = self.filter.extension(),
                "skipping object with unexpected type"
            );
            return Ok(FetchOutcome::SkippedType);
        }
        validate_destination_name(&object.name)?;

        info!(name = %object.name, id = %object.id, "starting download");

        match self.transfer(object, events_tx).await {
            Ok(()) => {
                self.ledger.append(&object.name)?;
                let _ = events_tx
                    .send(FetchEvent::Completed {
                        name: object.name.clone(),
                    })
                    .await;
                info!(name = %object.name, "download complete");
                Ok(FetchOutcome::Completed)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(self.part_path(&object.name)).await;
                let _ = events_tx
                    .send(FetchEvent::Failed {
                        name: object.name.clone(),
                        error: e.to_string(),
                    })
                    .await;
                Err(e)
            }
        }
    }

    /// Fetches every object in order, skipping failures.
    ///
    /// Returns a record per object. Only cancellation stops the batch
    /// early.
    pub async fn fetch_all(
        &self,
        objects: &[RemoteObject],
        events_tx: &mpsc::Sender<FetchEvent>,
    ) -> Result<Vec<FetchRecord>, FetchError> {
        let mut records = Vec::with_capacity(objects.len());

        for object in objects {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            match self.fetch(object, events_tx).await {
                Ok(outcome) => records.push(FetchRecord {
                    name: object.name.clone(),
                    outcome,
                }),
                Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
                Err(e) => {
                    error!(
                        name = %object.name,
                        error = %e,
                        "download failed, continuing with next file"
                    );
                    records.push(FetchRecord {
                        name: object.name.clone(),
                        outcome: FetchOutcome::Failed(e.to_string()),
                    });
                }
            }
        }

        Ok(records)
    }

    async fn transfer(
        &self,
        object: &RemoteObject,
        events_tx: &mpsc::Sender<FetchEvent>,
    ) -> Result<(), FetchError> {
        let (total, expected_checksum) = self.resolve_meta(object).await?;
        let part_path = self.part_path(&object.name);
        let final_path = self.dest_dir.join(&object.name);

        if let Some(parent) = part_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(&part_path).await?;
        let mut gauge = ProgressGauge::new();
        let mut hasher = expected_checksum.as_ref().map(|_| Sha256::new());
        let mut offset: u64 = 0;

        while offset < total {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let len = (total - offset).min(self.chunk_size);
            let data = self.store.read_range(&object.id, offset, len).await?;
            if data.is_empty() {
                break;
            }

            file.write_all(&data).await?;
            if let Some(hasher) = hasher.as_mut() {
                hasher.update(&data);
            }
            offset += data.len() as u64;

            let percent = gauge.update(offset, total);
            debug!(name = %object.name, percent, "download progress");
            let _ = events_tx
                .send(FetchEvent::Progress {
                    name: object.name.clone(),
                    percent,
                })
                .await;
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        if offset != total {
            return Err(FetchError::SizeMismatch {
                name: object.name.clone(),
                expected: total,
                actual: offset,
            });
        }

        if let (Some(expected), Some(hasher)) = (expected_checksum, hasher) {
            let actual = hex::encode(hasher.finalize());
            if !actual.eq_ignore_ascii_case(&expected) {
                return Err(FetchError::ChecksumMismatch(object.name.clone()));
            }
        }

        // The final name only ever refers to a complete file.
        tokio::fs::rename(&part_path, &final_path).await?;
        Ok(())
    }

    /// Resolves the object's total size and expected digest, falling
    /// back to a metadata lookup when the listing omitted the size.
    async fn resolve_meta(
        &self,
        object: &RemoteObject,
    ) -> Result<(u64, Option<String>), FetchError> {
        if let Some(size) = object.size {
            return Ok((size, object.checksum.clone()));
        }

        let meta = self.store.metadata(&object.id).await?;
        let size = meta
            .size
            .ok_or_else(|| RemoteError::Remote(format!("no size reported for {}", object.id)))?;
        Ok((size, meta.checksum.or_else(|| object.checksum.clone())))
    }

    fn part_path(&self, name: &str) -> PathBuf {
        self.dest_dir.join(format!("{name}.part"))
    }
}

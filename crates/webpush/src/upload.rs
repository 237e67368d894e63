//! The upload driver: submit, confirm, then delete the confirmed.

use std::path::Path;

use mediarelay_remote::TypeFilter;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::scan::scan_candidates;
use crate::session::{WebError, WebSession};
use crate::DEFAULT_SIZE_CEILING;

/// Errors that abort an upload batch.
///
/// Per-file intake/confirm failures are NOT here; those are recorded
/// in the batch results and the batch continues.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Web(#[from] WebError),

    #[error("cancelled")]
    Cancelled,
}

/// Per-file upload outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Uploaded,
    SkippedSize,
    Failed(String),
}

/// One file's record within a batch.
#[derive(Debug, Clone)]
pub struct UploadRecord {
    pub name: String,
    pub status: UploadStatus,
}

/// Pushes local files to the web destination and deletes the confirmed
/// ones.
pub struct Uploader<'a> {
    session: &'a dyn WebSession,
    filter: TypeFilter,
    size_ceiling: u64,
    cancel: CancellationToken,
}

impl<'a> Uploader<'a> {
    pub fn new(session: &'a dyn WebSession, filter: TypeFilter, cancel: CancellationToken) -> Self {
        Self {
            session,
            filter,
            size_ceiling: DEFAULT_SIZE_CEILING,
            cancel,
        }
    }

    /// Overrides the size ceiling (0 keeps the default).
    pub fn with_size_ceiling(mut self, ceiling: u64) -> Self {
        if ceiling > 0 {
            self.size_ceiling = ceiling;
        }
        self
    }

    /// Uploads every eligible file in `local_dir`, then deletes the
    /// ones confirmed uploaded.
    ///
    /// Deletion is batched after the whole scan has been attempted, so
    /// a late failure cannot cause partial deletion of files whose
    /// outcome isn't finalized. A file exceeding the size ceiling is a
    /// warn-level skip: never submitted, never deleted. A navigation
    /// failure aborts before anything is attempted.
    pub async fn upload_all(
        &self,
        destination_url: &str,
        local_dir: &Path,
    ) -> Result<Vec<UploadRecord>, UploadError> {
        let candidates = scan_candidates(local_dir, &self.filter)?;
        if candidates.is_empty() {
            info!(dir = %local_dir.display(), "no upload candidates");
            return Ok(Vec::new());
        }

        self.session.navigate(destination_url).await?;
        info!(
            url = destination_url,
            candidates = candidates.len(),
            "upload batch starting"
        );

        let mut records = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            if self.cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }

            if candidate.size > self.size_ceiling {
                warn!(
                    name = %candidate.name,
                    size = candidate.size,
                    ceiling = self.size_ceiling,
                    "exceeds size ceiling, skipping"
                );
                records.push(UploadRecord {
                    name: candidate.name.clone(),
                    status: UploadStatus::SkippedSize,
                });
                continue;
            }

            match self.submit_one(&candidate.path).await {
                Ok(()) => {
                    info!(name = %candidate.name, "upload confirmed");
                    records.push(UploadRecord {
                        name: candidate.name.clone(),
                        status: UploadStatus::Uploaded,
                    });
                }
                Err(e) => {
                    error!(name = %candidate.name, error = %e, "upload failed");
                    records.push(UploadRecord {
                        name: candidate.name.clone(),
                        status: UploadStatus::Failed(e.to_string()),
                    });
                }
            }
        }

        self.delete_confirmed(local_dir, &records);
        Ok(records)
    }

    async fn submit_one(&self, path: &Path) -> Result<(), WebError> {
        self.session.submit_file(path).await?;
        self.session.confirm().await?;
        Ok(())
    }

    /// Deletes the files recorded as uploaded. Local delete failure is
    /// a warning; the file stays recorded as uploaded.
    fn delete_confirmed(&self, local_dir: &Path, records: &[UploadRecord]) {
        for record in records {
            if record.status != UploadStatus::Uploaded {
                continue;
            }
            let path = local_dir.join(&record.name);
            match std::fs::remove_file(&path) {
                Ok(()) => info!(name = %record.name, "deleted local copy"),
                Err(e) => {
                    warn!(name = %record.name, error = %e, "failed to delete local copy");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Mock session recording calls, with scripted per-file failures.
    struct MockSession {
        submitted: Mutex<Vec<String>>,
        confirms: Mutex<usize>,
        fail_submit_for: Vec<String>,
        fail_confirm_for: Vec<String>,
        fail_navigate: bool,
    }

    impl MockSession {
        fn new() -> Self {
            Self {
                submitted: Mutex::new(Vec::new()),
                confirms: Mutex::new(0),
                fail_submit_for: Vec::new(),
                fail_confirm_for: Vec::new(),
                fail_navigate: false,
            }
        }

        fn failing_submit(mut self, name: &str) -> Self {
            self.fail_submit_for.push(name.to_string());
            self
        }

        fn failing_confirm(mut self, name: &str) -> Self {
            self.fail_confirm_for.push(name.to_string());
            self
        }

        fn failing_navigate(mut self) -> Self {
            self.fail_navigate = true;
            self
        }

        fn submitted(&self) -> Vec<String> {
            self.submitted.lock().unwrap().clone()
        }
    }

    impl WebSession for MockSession {
        fn navigate(
            &self,
            _url: &str,
        ) -> Pin<Box<dyn Future<Output = Result<(), WebError>> + Send + '_>> {
            let fail = self.fail_navigate;
            Box::pin(async move {
                if fail {
                    Err(WebError::Navigation("page did not load".into()))
                } else {
                    Ok(())
                }
            })
        }

        fn submit_file(
            &self,
            path: &Path,
        ) -> Pin<Box<dyn Future<Output = Result<(), WebError>> + Send + '_>> {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.submitted.lock().unwrap().push(name.clone());
            let fail = self.fail_submit_for.contains(&name);
            Box::pin(async move {
                if fail {
                    Err(WebError::Automation(format!("intake rejected {name}")))
                } else {
                    Ok(())
                }
            })
        }

        fn confirm(&self) -> Pin<Box<dyn Future<Output = Result<(), WebError>> + Send + '_>> {
            let last = self.submitted.lock().unwrap().last().cloned();
            *self.confirms.lock().unwrap() += 1;
            let fail = last.is_some_and(|name| self.fail_confirm_for.contains(&name));
            Box::pin(async move {
                if fail {
                    Err(WebError::Automation("confirm action failed".into()))
                } else {
                    Ok(())
                }
            })
        }
    }

    fn uploader<'a>(session: &'a MockSession) -> Uploader<'a> {
        Uploader::new(session, TypeFilter::png(), CancellationToken::new())
    }

    fn write_file(dir: &Path, name: &str, len: usize) {
        std::fs::write(dir.join(name), vec![0u8; len]).unwrap();
    }

    #[tokio::test]
    async fn uploads_and_deletes_confirmed_files() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.png", 10);
        write_file(dir.path(), "b.png", 10);

        let session = MockSession::new();
        let records = uploader(&session)
            .upload_all("https://dest.example", dir.path())
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.status == UploadStatus::Uploaded));
        assert!(!dir.path().join("a.png").exists());
        assert!(!dir.path().join("b.png").exists());
    }

    #[tokio::test]
    async fn oversized_file_never_submitted_never_deleted() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "big.png", 2 * 1024 * 1024);

        let session = MockSession::new();
        let records = uploader(&session)
            .upload_all("https://dest.example", dir.path())
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, UploadStatus::SkippedSize);
        assert!(session.submitted().is_empty());
        assert!(dir.path().join("big.png").exists());
    }

    #[tokio::test]
    async fn batch_continues_past_one_failure() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.png", 10);
        write_file(dir.path(), "b.png", 10);
        write_file(dir.path(), "c.png", 10);

        let session = MockSession::new().failing_submit("b.png");
        let records = uploader(&session)
            .upload_all("https://dest.example", dir.path())
            .await
            .unwrap();

        // All three attempted, in scan order.
        assert_eq!(session.submitted(), vec!["a.png", "b.png", "c.png"]);
        assert_eq!(records[0].status, UploadStatus::Uploaded);
        assert!(matches!(records[1].status, UploadStatus::Failed(_)));
        assert_eq!(records[2].status, UploadStatus::Uploaded);
        // Only confirmed uploads deleted.
        assert!(!dir.path().join("a.png").exists());
        assert!(dir.path().join("b.png").exists());
        assert!(!dir.path().join("c.png").exists());
    }

    #[tokio::test]
    async fn confirm_failure_keeps_local_file() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.png", 10);

        let session = MockSession::new().failing_confirm("a.png");
        let records = uploader(&session)
            .upload_all("https://dest.example", dir.path())
            .await
            .unwrap();

        assert!(matches!(records[0].status, UploadStatus::Failed(_)));
        assert!(dir.path().join("a.png").exists());
    }

    #[tokio::test]
    async fn navigation_failure_aborts_before_any_submission() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.png", 10);

        let session = MockSession::new().failing_navigate();
        let result = uploader(&session)
            .upload_all("https://dest.example", dir.path())
            .await;

        assert!(matches!(result, Err(UploadError::Web(_))));
        assert!(session.submitted().is_empty());
        assert!(dir.path().join("a.png").exists());
    }

    #[tokio::test]
    async fn empty_dir_skips_navigation() {
        let dir = TempDir::new().unwrap();

        let session = MockSession::new().failing_navigate();
        let records = uploader(&session)
            .upload_all("https://dest.example", dir.path())
            .await
            .unwrap();

        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn non_matching_files_ignored() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "notes.txt", 10);

        let session = MockSession::new();
        let records = uploader(&session)
            .upload_all("https://dest.example", dir.path())
            .await
            .unwrap();

        assert!(records.is_empty());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn cancelled_batch_deletes_nothing() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.png", 10);

        let session = MockSession::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let uploader = Uploader::new(&session, TypeFilter::png(), cancel);

        let result = uploader.upload_all("https://dest.example", dir.path()).await;

        assert!(matches!(result, Err(UploadError::Cancelled)));
        assert!(dir.path().join("a.png").exists());
    }
}

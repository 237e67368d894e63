//! Verify-then-delete reconciliation.
//!
//! Cross-references the transfer ledger against local disk presence and
//! a fresh remote listing, then issues remote deletions only for
//! entries verified present locally. Every failure is log-and-continue;
//! reconciliation never aborts the run.

use std::path::{Path, PathBuf};

use mediarelay_ledger::{LedgerError, TransferLedger};
use mediarelay_remote::{RemoteCatalog, RemoteStore, TypeFilter};
use tracing::{error, info, warn};

/// Counts of the per-name outcomes of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Remote copies deleted after local verification.
    pub deleted: usize,
    /// Ledger names absent from local disk; remote copy kept.
    pub skipped: usize,
    /// Names present locally but with no resolvable remote id.
    pub not_found: usize,
    /// Remote deletions that were issued but failed.
    pub delete_failed: usize,
}

/// Issues remote deletions for ledger entries verified on local disk.
pub struct ReconciliationDeleter<'a> {
    store: &'a dyn RemoteStore,
    ledger: &'a TransferLedger,
    filter: TypeFilter,
    local_dir: PathBuf,
}

impl<'a> ReconciliationDeleter<'a> {
    pub fn new(
        store: &'a dyn RemoteStore,
        ledger: &'a TransferLedger,
        filter: TypeFilter,
        local_dir: &Path,
    ) -> Self {
        Self {
            store,
            ledger,
            filter,
            local_dir: local_dir.to_path_buf(),
        }
    }

    /// Runs one reconciliation pass over the ledger, in ledger order.
    ///
    /// A remote deletion is only issued for a name that exists on local
    /// disk at check time. Names are resolved to ids via a fresh
    /// listing per entry; duplicate remote names resolve to the first
    /// match in listing order. A failed deletion (including an id the
    /// store no longer knows) is logged and counted, never fatal.
    pub async fn reconcile(&self, container_id: &str) -> Result<ReconcileSummary, LedgerError> {
        let names = self.ledger.read_names()?;
        let catalog = RemoteCatalog::new(self.store);
        let mut summary = ReconcileSummary::default();

        info!(
            container = container_id,
            entries = names.len(),
            "reconciling ledger against local disk"
        );

        for name in names {
            if !self.local_dir.join(&name).exists() {
                warn!(name = %name, "not present locally, keeping remote copy");
                summary.skipped += 1;
                continue;
            }

            let Some(id) = catalog.find_by_name(container_id, &self.filter, &name).await else {
                warn!(name = %name, "no remote id resolved");
                summary.not_found += 1;
                continue;
            };

            match self.store.delete(&id).await {
                Ok(()) => {
                    info!(name = %name, id = %id, "deleted remote copy");
                    summary.deleted += 1;
                }
                Err(e) => {
                    error!(name = %name, id = %id, error = %e, "remote delete failed");
                    summary.delete_failed += 1;
                }
            }
        }

        info!(
            deleted = summary.deleted,
            skipped = summary.skipped,
            not_found = summary.not_found,
            delete_failed = summary.delete_failed,
            "reconciliation finished"
        );
        Ok(summary)
    }
}

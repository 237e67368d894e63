//! In-process run orchestration.
//!
//! The pipelines execute sequentially inside one process (authorize,
//! list, fetch, reconcile, upload, notify) with each step's outcome
//! recorded in a report. Only an authorization failure stops the run;
//! everything downstream is log-and-continue.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mediarelay_fetch::{Downloader, FetchEvent, FetchOutcome};
use mediarelay_ledger::TransferLedger;
use mediarelay_notify::{MailRelay, Notifier};
use mediarelay_reconcile::ReconciliationDeleter;
use mediarelay_remote::{CredentialProvider, HttpStore, RemoteCatalog, TypeFilter};
use mediarelay_webpush::{UploadStatus, Uploader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::web::FormSession;

/// Name of the ledger file inside the destination directory.
const LEDGER_FILE: &str = "transferred.txt";

/// Outcome of one orchestration step.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: &'static str,
    pub ok: bool,
    pub detail: String,
}

impl StepReport {
    fn ok(step: &'static str, detail: impl Into<String>) -> Self {
        Self {
            step,
            ok: true,
            detail: detail.into(),
        }
    }

    fn failed(step: &'static str, detail: impl Into<String>) -> Self {
        Self {
            step,
            ok: false,
            detail: detail.into(),
        }
    }
}

/// Executes one full pipeline run.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let run_id = Uuid::new_v4();
    info!(run_id = %run_id, agent = %config.name, container = %config.store.container_id, "pipeline run starting");

    let cancel = CancellationToken::new();
    if let Some(secs) = config.deadline_secs {
        let deadline_cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            warn!(deadline_secs = secs, "run deadline reached, cancelling");
            deadline_cancel.cancel();
        });
    }

    let mut steps: Vec<StepReport> = Vec::new();

    // Authorization is the only fatal step.
    let provider = CredentialProvider::new(
        Path::new(&config.store.token_path),
        &config.store.refresh_url,
        &config.store.client_id,
        &config.store.client_secret,
    );
    let session = match provider.authorize().await {
        Ok(session) => {
            steps.push(StepReport::ok("authorize", "session ready"));
            session
        }
        Err(e) => {
            error!(error = %e, "authorization failed, aborting run");
            steps.push(StepReport::failed("authorize", e.to_string()));
            send_report(&config, run_id, &steps).await;
            return Err(e.into());
        }
    };

    let store = HttpStore::new(&config.store.base_url, session);
    let fetch_filter = TypeFilter::new(&config.fetch.mime, &config.fetch.extension);
    let dest_dir = PathBuf::from(&config.fetch.dest_dir);
    std::fs::create_dir_all(&dest_dir)?;
    let ledger = TransferLedger::create(&dest_dir.join(LEDGER_FILE))?;

    // Stage 1: enumerate the container.
    let catalog = RemoteCatalog::new(&store);
    let objects = catalog
        .list(&config.store.container_id, &fetch_filter)
        .await;
    steps.push(StepReport::ok("list", format!("{} objects", objects.len())));

    // Stage 2: download with progress logging.
    let (events_tx, events_rx) = mpsc::channel(64);
    let progress_task = tokio::spawn(log_fetch_events(events_rx));

    let downloader = Downloader::new(
        &store,
        &ledger,
        fetch_filter.clone(),
        &dest_dir,
        cancel.clone(),
    );
    match downloader.fetch_all(&objects, &events_tx).await {
        Ok(records) => {
            let completed = records
                .iter()
                .filter(|r| r.outcome == FetchOutcome::Completed)
                .count();
            let failed = records
                .iter()
                .filter(|r| matches!(r.outcome, FetchOutcome::Failed(_)))
                .count();
            steps.push(StepReport::ok(
                "fetch",
                format!("{completed} downloaded, {failed} failed"),
            ));
        }
        Err(e) => steps.push(StepReport::failed("fetch", e.to_string())),
    }
    drop(events_tx);
    let _ = progress_task.await;

    // Stage 3: verify locally, then delete remotely.
    let deleter = ReconciliationDeleter::new(&store, &ledger, fetch_filter, &dest_dir);
    match deleter.reconcile(&config.store.container_id).await {
        Ok(summary) => steps.push(StepReport::ok(
            "reconcile",
            format!(
                "{} deleted, {} skipped, {} not found, {} delete failures",
                summary.deleted, summary.skipped, summary.not_found, summary.delete_failed
            ),
        )),
        Err(e) => steps.push(StepReport::failed("reconcile", e.to_string())),
    }

    // Second pipeline: push local files to the web destination.
    let upload_filter = TypeFilter::new(&config.upload.mime, &config.upload.extension);
    let web = FormSession::new();
    let uploader = Uploader::new(&web, upload_filter, cancel.clone())
        .with_size_ceiling(config.upload.size_ceiling_bytes);
    match uploader
        .upload_all(
            &config.upload.destination_url,
            Path::new(&config.upload.source_dir),
        )
        .await
    {
        Ok(records) => {
            let uploaded = records
                .iter()
                .filter(|r| r.status == UploadStatus::Uploaded)
                .count();
            let failed = records
                .iter()
                .filter(|r| matches!(r.status, UploadStatus::Failed(_)))
                .count();
            steps.push(StepReport::ok(
                "upload",
                format!("{uploaded} uploaded, {failed} failed"),
            ));
        }
        Err(e) => steps.push(StepReport::failed("upload", e.to_string())),
    }

    send_report(&config, run_id, &steps).await;

    for step in &steps {
        info!(step = step.step, ok = step.ok, detail = %step.detail, "step finished");
    }
    Ok(())
}

async fn log_fetch_events(mut rx: mpsc::Receiver<FetchEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            FetchEvent::Progress { name, percent } => {
                info!(name = %name, percent, "download progress");
            }
            FetchEvent::Completed { name } => info!(name = %name, "downloaded"),
            FetchEvent::Failed { name, error } => {
                warn!(name = %name, error = %error, "download failed");
            }
        }
    }
}

/// Sends the run report through the configured relay; failures are
/// logged and swallowed.
async fn send_report(config: &Config, run_id: Uuid, steps: &[StepReport]) {
    let Some(notify) = &config.notify else {
        return;
    };

    let relay = MailRelay::new(
        &notify.endpoint,
        &notify.api_key,
        &notify.subject,
        notify.recipients.clone(),
    );
    let body = report_body(&config.name, run_id, steps);
    let attachment = config.log_file.as_deref().map(Path::new);

    if let Err(e) = relay.send(&body, attachment).await {
        warn!(error = %e, "failed to send run report");
    }
}

fn report_body(agent: &str, run_id: Uuid, steps: &[StepReport]) -> String {
    let mut body = format!("agent: {agent}\nrun: {run_id}\n\n");
    for step in steps {
        let status = if step.ok { "ok" } else { "FAILED" };
        body.push_str(&format!("{} {}: {}\n", step.step, status, step.detail));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_body_lists_steps_in_order() {
        let steps = vec![
            StepReport::ok("authorize", "session ready"),
            StepReport::failed("fetch", "remote error: HTTP 503"),
        ];
        let run_id = Uuid::new_v4();
        let body = report_body("relay-1", run_id, &steps);

        assert!(body.starts_with("agent: relay-1\n"));
        assert!(body.contains(&run_id.to_string()));
        let authorize_pos = body.find("authorize").unwrap();
        let fetch_pos = body.find("fetch").unwrap();
        assert!(authorize_pos < fetch_pos);
        assert!(body.contains("FAILED"));
    }

    #[test]
    fn step_report_constructors() {
        let ok = StepReport::ok("list", "30 objects");
        assert!(ok.ok);
        let failed = StepReport::failed("upload", "cancelled");
        assert!(!failed.ok);
        assert_eq!(failed.detail, "cancelled");
    }
}

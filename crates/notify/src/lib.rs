//! Run-report notification.
//!
//! The pipelines treat notification as a fire-and-forget side effect:
//! the runner builds a report body, attaches the run log, and any
//! failure here is a logged warning, never a run failure. Mail
//! transport itself is opaque; the relay endpoint owns it.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use base64::Engine;
use serde::Serialize;
use tracing::debug;

/// Errors surfaced by notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("relay rejected message: HTTP {0}")]
    Status(u16),
}

/// Abstract notification capability.
pub trait Notifier: Send + Sync {
    /// Sends one message with an optional file attachment.
    fn send(
        &self,
        body: &str,
        attachment: Option<&Path>,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>>;
}

/// Wire shape of a relay submission.
#[derive(Debug, Serialize)]
struct RelayMessage {
    subject: String,
    recipients: Vec<String>,
    body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachment: Option<Attachment>,
}

#[derive(Debug, Serialize)]
struct Attachment {
    filename: String,
    content_base64: String,
}

/// Notifier posting to an authenticated mail-relay endpoint.
///
/// The subject and recipient list are fixed per relay instance; every
/// run sends the same kind of message.
pub struct MailRelay {
    endpoint: String,
    api_key: String,
    subject: String,
    recipients: Vec<String>,
    http: reqwest::Client,
}

impl MailRelay {
    pub fn new(endpoint: &str, api_key: &str, subject: &str, recipients: Vec<String>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            subject: subject.to_string(),
            recipients,
            http: reqwest::Client::new(),
        }
    }

    fn build_message(
        &self,
        body: &str,
        attachment: Option<&Path>,
    ) -> Result<RelayMessage, NotifyError> {
        let attachment = match attachment {
            Some(path) => {
                let bytes = std::fs::read(path)?;
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "attachment".to_string());
                Some(Attachment {
                    filename,
                    content_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
                })
            }
            None => None,
        };

        Ok(RelayMessage {
            subject: self.subject.clone(),
            recipients: self.recipients.clone(),
            body: body.to_string(),
            attachment,
        })
    }

    async fn post(&self, message: RelayMessage) -> Result<(), NotifyError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&message)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        debug!(recipients = message.recipients.len(), "notification sent");
        Ok(())
    }
}

impl Notifier for MailRelay {
    fn send(
        &self,
        body: &str,
        attachment: Option<&Path>,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>> {
        let message = self.build_message(body, attachment);
        Box::pin(async move { self.post(message?).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn relay() -> MailRelay {
        MailRelay::new(
            "https://relay.example/send",
            "key-1",
            "Mediarelay run report",
            vec!["ops@example.com".into(), "oncall@example.com".into()],
        )
    }

    #[test]
    fn message_carries_fixed_subject_and_recipients() {
        let message = relay().build_message("all good", None).unwrap();
        assert_eq!(message.subject, "Mediarelay run report");
        assert_eq!(message.recipients.len(), 2);
        assert_eq!(message.body, "all good");
        assert!(message.attachment.is_none());
    }

    #[test]
    fn attachment_is_base64_of_file_content() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("run.log");
        std::fs::write(&log_path, b"log line\n").unwrap();

        let message = relay().build_message("body", Some(&log_path)).unwrap();
        let attachment = message.attachment.unwrap();

        assert_eq!(attachment.filename, "run.log");
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(attachment.content_base64)
            .unwrap();
        assert_eq!(decoded, b"log line\n");
    }

    #[test]
    fn missing_attachment_file_is_an_error() {
        let result = relay().build_message("body", Some(Path::new("/nonexistent/run.log")));
        assert!(matches!(result, Err(NotifyError::Io(_))));
    }

    #[test]
    fn message_serializes_without_null_attachment() {
        let message = relay().build_message("body", None).unwrap();
        let json = serde_json::to_string(&message).unwrap();
        assert!(!json.contains("attachment"));
        assert!(json.contains("Mediarelay run report"));
    }
}

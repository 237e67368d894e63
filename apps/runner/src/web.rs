//! HTTP-form implementation of the web session.
//!
//! The destination's intake mechanism is a multipart form POST against
//! the page opened by `navigate`; the confirm action is a second POST
//! to the save endpoint.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Mutex;

use mediarelay_webpush::{WebError, WebSession};

pub struct FormSession {
    http: reqwest::Client,
    base: Mutex<Option<String>>,
}

impl FormSession {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base: Mutex::new(None),
        }
    }

    fn base_url(&self) -> Result<String, WebError> {
        self.base
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| WebError::Automation("no page open, navigate first".into()))
    }

    async fn open(&self, url: String) -> Result<(), WebError> {
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| WebError::Navigation(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(WebError::Navigation(format!(
                "destination returned HTTP {}",
                status.as_u16()
            )));
        }

        *self.base.lock().unwrap() = Some(url);
        Ok(())
    }

    async fn intake(&self, path: std::path::PathBuf) -> Result<(), WebError> {
        let base = self.base_url()?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| WebError::Automation(format!("read {}: {e}", path.display())))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .http
            .post(format!("{base}/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| WebError::Automation(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(WebError::Automation(format!(
                "intake returned HTTP {}",
                status.as_u16()
            )));
        }
        Ok(())
    }

    async fn save(&self) -> Result<(), WebError> {
        let base = self.base_url()?;
        let resp = self
            .http
            .post(format!("{base}/save"))
            .send()
            .await
            .map_err(|e| WebError::Automation(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(WebError::Automation(format!(
                "save returned HTTP {}",
                status.as_u16()
            )));
        }
        Ok(())
    }
}

impl Default for FormSession {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSession for FormSession {
    fn navigate(
        &self,
        url: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), WebError>> + Send + '_>> {
        let url = url.trim_end_matches('/').to_string();
        Box::pin(async move { self.open(url).await })
    }

    fn submit_file(
        &self,
        path: &Path,
    ) -> Pin<Box<dyn Future<Output = Result<(), WebError>> + Send + '_>> {
        let path = path.to_path_buf();
        Box::pin(async move { self.intake(path).await })
    }

    fn confirm(&self) -> Pin<Box<dyn Future<Output = Result<(), WebError>> + Send + '_>> {
        Box::pin(async move { self.save().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn submit_before_navigate_is_rejected() {
        let session = FormSession::new();
        let result = session.submit_file(Path::new("shot.png")).await;
        assert!(matches!(result, Err(WebError::Automation(_))));
    }

    #[tokio::test]
    async fn confirm_before_navigate_is_rejected() {
        let session = FormSession::new();
        let result = session.confirm().await;
        assert!(matches!(result, Err(WebError::Automation(_))));
    }
}

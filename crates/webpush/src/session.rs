//! Web destination capability trait.
//!
//! `WebSession` is implemented by the runner on top of whatever drives
//! the destination (scripted HTTP, a browser driver). Using a trait
//! keeps the upload pipeline decoupled from automation mechanics and
//! testable with mocks.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

/// Errors surfaced by web destination operations.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("automation error: {0}")]
    Automation(String),
}

/// Abstract session against the web destination.
pub trait WebSession: Send + Sync {
    /// Opens the destination page.
    fn navigate(
        &self,
        url: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), WebError>> + Send + '_>>;

    /// Submits one file through the destination's intake mechanism.
    fn submit_file(
        &self,
        path: &Path,
    ) -> Pin<Box<dyn Future<Output = Result<(), WebError>> + Send + '_>>;

    /// Triggers the destination's confirmation action for the last
    /// submitted file.
    fn confirm(&self) -> Pin<Box<dyn Future<Output = Result<(), WebError>> + Send + '_>>;
}

//! Upload pipeline to a scripted web destination.
//!
//! The destination is reached through the opaque [`WebSession`]
//! capability (navigation, file intake, confirm action), which keeps the
//! timing-sensitive automation out of the pipeline's decision logic.
//! Local files are deleted only after the whole batch has been
//! attempted, and only those whose upload was confirmed.

mod scan;
mod session;
mod upload;

pub use scan::{scan_candidates, Candidate};
pub use session::{WebError, WebSession};
pub use upload::{UploadError, UploadRecord, UploadStatus, Uploader};

/// Default upload size ceiling: 1 MiB.
///
/// Files above the ceiling are skipped to stay inside destination-side
/// limits.
pub const DEFAULT_SIZE_CEILING: u64 = 1024 * 1024;

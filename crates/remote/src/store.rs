//! The remote store capability trait.
//!
//! `RemoteStore` is the seam between the pipelines and the actual cloud
//! service. Using an object-safe trait keeps the fetch/reconcile logic
//! decoupled from transport and testable with mocks.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::types::{RemoteObject, TypeFilter};
use crate::RemoteError;

/// One page of a listing, with the token for the next page (if any).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectPage {
    pub objects: Vec<RemoteObject>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Abstract cloud file store.
///
/// Implementations own the page size, the wire protocol and the
/// authentication; all errors surface as [`RemoteError`].
pub trait RemoteStore: Send + Sync {
    /// Lists one page of objects in `container_id` matching `filter`.
    fn list_page(
        &self,
        container_id: &str,
        filter: &TypeFilter,
        page_token: Option<&str>,
    ) -> Pin<Box<dyn Future<Output = Result<ObjectPage, RemoteError>> + Send + '_>>;

    /// Fetches the metadata of a single object.
    fn metadata(
        &self,
        object_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<RemoteObject, RemoteError>> + Send + '_>>;

    /// Reads up to `len` bytes of an object's content starting at
    /// `offset`.
    fn read_range(
        &self,
        object_id: &str,
        offset: u64,
        len: u64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, RemoteError>> + Send + '_>>;

    /// Deletes an object by id.
    ///
    /// Deleting an id that no longer exists is an error like any other;
    /// callers decide whether that is fatal.
    fn delete(
        &self,
        object_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), RemoteError>> + Send + '_>>;
}

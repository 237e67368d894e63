//! Transparent pagination over a remote store listing.

use tracing::warn;

use crate::store::RemoteStore;
use crate::types::{RemoteObject, TypeFilter};

/// Flattens the store's paginated listing into a single sequence.
///
/// Callers never see page tokens. A listing error mid-pagination is not
/// fatal: whatever was accumulated so far is returned, so one bad page
/// cannot block processing of the rest of the batch.
pub struct RemoteCatalog<'a> {
    store: &'a dyn RemoteStore,
}

impl<'a> RemoteCatalog<'a> {
    pub fn new(store: &'a dyn RemoteStore) -> Self {
        Self { store }
    }

    /// Lists all objects in `container_id` matching `filter`, in page
    /// order.
    pub async fn list(&self, container_id: &str, filter: &TypeFilter) -> Vec<RemoteObject> {
        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .store
                .list_page(container_id, filter, page_token.as_deref())
                .await;

            match page {
                Ok(page) => {
                    objects.extend(page.objects);
                    match page.next_page_token {
                        Some(token) => page_token = Some(token),
                        None => break,
                    }
                }
                Err(e) => {
                    warn!(
                        container = container_id,
                        accumulated = objects.len(),
                        error = %e,
                        "listing aborted, returning partial results"
                    );
                    break;
                }
            }
        }

        objects
    }

    /// Resolves a filename to a remote id via a fresh listing.
    ///
    /// Remote names are not unique; the first match in listing order
    /// wins. This tie-break is a known ambiguity of name-based lookup.
    pub async fn find_by_name(
        &self,
        container_id: &str,
        filter: &TypeFilter,
        name: &str,
    ) -> Option<String> {
        self.list(container_id, filter)
            .await
            .into_iter()
            .find(|obj| obj.name == name)
            .map(|obj| obj.id)
    }
}

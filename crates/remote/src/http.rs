//! HTTP implementation of the remote store.
//!
//! Talks to a generic media-store REST API:
//! - `GET    {base}/containers/{container}/objects` (paginated listing)
//! - `GET    {base}/objects/{id}` (metadata)
//! - `GET    {base}/objects/{id}/content` (ranged content reads)
//! - `DELETE {base}/objects/{id}` (deletion)
//!
//! Requests carry the session's bearer token.

use std::future::Future;
use std::pin::Pin;

use crate::auth::Session;
use crate::store::{ObjectPage, RemoteStore};
use crate::types::{RemoteObject, TypeFilter};
use crate::RemoteError;

/// Default listing page size requested from the store.
const DEFAULT_PAGE_SIZE: u32 = 10;

/// Remote store backed by an HTTP media-store API.
pub struct HttpStore {
    http: reqwest::Client,
    base_url: String,
    session: Session,
    page_size: u32,
}

impl HttpStore {
    /// Creates a store client for `base_url` using `session` for auth.
    pub fn new(base_url: &str, session: Session) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Overrides the listing page size (0 keeps the default).
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        if page_size > 0 {
            self.page_size = page_size;
        }
        self
    }

    async fn get_page(
        &self,
        container_id: String,
        mime: String,
        page_token: Option<String>,
    ) -> Result<ObjectPage, RemoteError> {
        let url = format!("{}/containers/{}/objects", self.base_url, container_id);
        let mut query = vec![
            ("mime".to_string(), mime),
            ("page_size".to_string(), self.page_size.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("page_token".to_string(), token));
        }

        let resp = self
            .http
            .get(&url)
            .bearer_auth(self.session.bearer())
            .query(&query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }
        Ok(resp.json::<ObjectPage>().await?)
    }

    async fn get_metadata(&self, object_id: String) -> Result<RemoteObject, RemoteError> {
        let url = format!("{}/objects/{}", self.base_url, object_id);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(self.session.bearer())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }
        Ok(resp.json::<RemoteObject>().await?)
    }

    async fn get_range(
        &self,
        object_id: String,
        offset: u64,
        len: u64,
    ) -> Result<Vec<u8>, RemoteError> {
        let url = format!("{}/objects/{}/content", self.base_url, object_id);
        let end = offset + len.saturating_sub(1);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(self.session.bearer())
            .header(reqwest::header::RANGE, format!("bytes={offset}-{end}"))
            .send()
            .await?;

        let status = resp.status();
        // Stores answer ranged reads with 206, or 200 for a full body.
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }
        Ok(resp.bytes().await?.to_vec())
    }

    async fn do_delete(&self, object_id: String) -> Result<(), RemoteError> {
        let url = format!("{}/objects/{}", self.base_url, object_id);
        let resp = self
            .http
            .delete(&url)
            .bearer_auth(self.session.bearer())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }
        Ok(())
    }
}

impl RemoteStore for HttpStore {
    fn list_page(
        &self,
        container_id: &str,
        filter: &TypeFilter,
        page_token: Option<&str>,
    ) -> Pin<Box<dyn Future<Output = Result<ObjectPage, RemoteError>> + Send + '_>> {
        let container_id = container_id.to_string();
        let mime = filter.mime().to_string();
        let page_token = page_token.map(String::from);
        Box::pin(async move { self.get_page(container_id, mime, page_token).await })
    }

    fn metadata(
        &self,
        object_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<RemoteObject, RemoteError>> + Send + '_>> {
        let object_id = object_id.to_string();
        Box::pin(async move { self.get_metadata(object_id).await })
    }

    fn read_range(
        &self,
        object_id: &str,
        offset: u64,
        len: u64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, RemoteError>> + Send + '_>> {
        let object_id = object_id.to_string();
        Box::pin(async move { self.get_range(object_id, offset, len).await })
    }

    fn delete(
        &self,
        object_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), RemoteError>> + Send + '_>> {
        let object_id = object_id.to_string();
        Box::pin(async move { self.do_delete(object_id).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let store = HttpStore::new("https://store.example/api/", Session::new("tok"));
        assert_eq!(store.base_url, "https://store.example/api");
    }

    #[test]
    fn page_size_override() {
        let store = HttpStore::new("https://store.example", Session::new("tok"));
        assert_eq!(store.page_size, DEFAULT_PAGE_SIZE);

        let store = store.with_page_size(100);
        assert_eq!(store.page_size, 100);

        let store = store.with_page_size(0);
        assert_eq!(store.page_size, 100);
    }
}

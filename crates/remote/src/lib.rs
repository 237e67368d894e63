//! Remote media store capability.
//!
//! Defines the object-safe [`RemoteStore`] trait the pipelines are
//! written against, the [`RemoteCatalog`] that hides pagination behind a
//! flat listing, an HTTP implementation of the store, and the credential
//! provider that turns a persisted token into a usable [`Session`].

mod auth;
mod catalog;
mod http;
mod store;
mod types;

pub use auth::{AuthError, CredentialProvider, Session, StoredToken};
pub use catalog::RemoteCatalog;
pub use http::HttpStore;
pub use store::{ObjectPage, RemoteStore};
pub use types::{RemoteObject, TypeFilter};

/// Errors surfaced by remote store operations.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("remote returned HTTP {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote error: {0}")]
    Remote(String),
}

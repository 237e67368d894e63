//! Credential persistence and refresh.
//!
//! The provider turns a persisted token file into a usable [`Session`]:
//! a valid token is used as-is, an expired one is refreshed over HTTP
//! when a refresh token is present, and anything else is fatal for the
//! run, since interactive consent cannot happen on a headless pipeline.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Safety margin before the recorded expiry at which a token is
/// already treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Errors produced while obtaining a session.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("token decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token refresh rejected: HTTP {0}")]
    RefreshRejected(u16),

    #[error("interactive consent required: no usable token at {0}")]
    ConsentRequired(String),
}

/// Persisted token state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl StoredToken {
    /// Returns `true` if the token is still valid with a safety margin.
    pub fn is_valid(&self) -> bool {
        self.expires_at > Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS)
    }
}

/// An authorized session handle.
#[derive(Debug, Clone)]
pub struct Session {
    access_token: String,
}

impl Session {
    pub fn new(access_token: &str) -> Self {
        Self {
            access_token: access_token.to_string(),
        }
    }

    /// Bearer token for request authorization.
    pub fn bearer(&self) -> &str {
        &self.access_token
    }
}

/// Wire shape of a refresh response.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: u64,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Loads, refreshes and persists the store credentials.
pub struct CredentialProvider {
    token_path: PathBuf,
    refresh_url: String,
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
}

impl CredentialProvider {
    pub fn new(token_path: &Path, refresh_url: &str, client_id: &str, client_secret: &str) -> Self {
        Self {
            token_path: token_path.to_path_buf(),
            refresh_url: refresh_url.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Produces a valid session or fails the run.
    ///
    /// A refreshed token is persisted back to the token file before the
    /// session is returned.
    pub async fn authorize(&self) -> Result<Session, AuthError> {
        let token = match self.load_token()? {
            Some(token) => token,
            None => {
                return Err(AuthError::ConsentRequired(
                    self.token_path.display().to_string(),
                ));
            }
        };

        if token.is_valid() {
            info!("loaded credentials from token file");
            return Ok(Session::new(&token.access_token));
        }

        let Some(refresh_token) = token.refresh_token.clone() else {
            return Err(AuthError::ConsentRequired(
                self.token_path.display().to_string(),
            ));
        };

        let refreshed = self.refresh(&refresh_token).await?;
        self.save_token(&refreshed)?;
        info!("refreshed credentials");
        Ok(Session::new(&refreshed.access_token))
    }

    fn load_token(&self) -> Result<Option<StoredToken>, AuthError> {
        if !self.token_path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.token_path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<StoredToken, AuthError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let resp = self.http.post(&self.refresh_url).form(&params).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AuthError::RefreshRejected(status.as_u16()));
        }

        let body: RefreshResponse = resp.json().await?;
        Ok(StoredToken {
            access_token: body.access_token,
            // Stores may omit the refresh token on rotation; keep the
            // old one in that case.
            refresh_token: body.refresh_token.or_else(|| Some(refresh_token.to_string())),
            expires_at: Utc::now() + Duration::seconds(body.expires_in as i64),
        })
    }

    fn save_token(&self, token: &StoredToken) -> Result<(), AuthError> {
        if let Some(parent) = self.token_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(token)?;
        std::fs::write(&self.token_path, content)?;

        // Restrict permissions on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.token_path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn provider(dir: &Path) -> CredentialProvider {
        CredentialProvider::new(
            &dir.join("token.json"),
            "https://auth.example/token",
            "client-1",
            "secret-1",
        )
    }

    fn write_token(dir: &Path, token: &StoredToken) {
        std::fs::write(
            dir.join("token.json"),
            serde_json::to_string(token).unwrap(),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn missing_token_file_requires_consent() {
        let dir = TempDir::new().unwrap();
        let result = provider(dir.path()).authorize().await;
        assert!(matches!(result, Err(AuthError::ConsentRequired(_))));
    }

    #[tokio::test]
    async fn valid_token_yields_session() {
        let dir = TempDir::new().unwrap();
        write_token(
            dir.path(),
            &StoredToken {
                access_token: "atk-1".into(),
                refresh_token: None,
                expires_at: Utc::now() + Duration::hours(1),
            },
        );

        let session = provider(dir.path()).authorize().await.unwrap();
        assert_eq!(session.bearer(), "atk-1");
    }

    #[tokio::test]
    async fn expired_token_without_refresh_requires_consent() {
        let dir = TempDir::new().unwrap();
        write_token(
            dir.path(),
            &StoredToken {
                access_token: "atk-1".into(),
                refresh_token: None,
                expires_at: Utc::now() - Duration::hours(1),
            },
        );

        let result = provider(dir.path()).authorize().await;
        assert!(matches!(result, Err(AuthError::ConsentRequired(_))));
    }

    #[test]
    fn token_near_expiry_is_invalid() {
        let token = StoredToken {
            access_token: "atk".into(),
            refresh_token: None,
            expires_at: Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS / 2),
        };
        assert!(!token.is_valid());
    }

    #[test]
    fn stored_token_roundtrip() {
        let token = StoredToken {
            access_token: "atk".into(),
            refresh_token: Some("rtk".into()),
            expires_at: Utc::now() + Duration::hours(1),
        };
        let json = serde_json::to_string(&token).unwrap();
        let back: StoredToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back.access_token, "atk");
        assert_eq!(back.refresh_token.as_deref(), Some("rtk"));
    }
}

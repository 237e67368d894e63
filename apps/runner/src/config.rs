//! Runner configuration.
//!
//! Configuration is stored as TOML at `~/.config/mediarelay/config.toml`
//! (override with `MEDIARELAY_CONFIG`).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level runner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Display name of this agent (hostname by default).
    #[serde(default = "default_name")]
    pub name: String,

    /// Log file path; when set, logs go there instead of stdout.
    #[serde(default)]
    pub log_file: Option<String>,

    /// Optional wall-clock deadline for the whole run, in seconds.
    #[serde(default)]
    pub deadline_secs: Option<u64>,

    pub store: StoreConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    pub upload: UploadConfig,

    #[serde(default)]
    pub notify: Option<NotifyConfig>,
}

/// Remote store and credential settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub base_url: String,
    pub container_id: String,
    #[serde(default = "default_token_path")]
    pub token_path: String,
    pub refresh_url: String,
    pub client_id: String,
    pub client_secret: String,
}

/// Download pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_dest_dir")]
    pub dest_dir: String,
    #[serde(default = "default_fetch_mime")]
    pub mime: String,
    #[serde(default = "default_fetch_extension")]
    pub extension: String,
}

/// Upload pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub destination_url: String,
    #[serde(default = "default_source_dir")]
    pub source_dir: String,
    #[serde(default = "default_upload_mime")]
    pub mime: String,
    #[serde(default = "default_upload_extension")]
    pub extension: String,
    #[serde(default = "default_size_ceiling")]
    pub size_ceiling_bytes: u64,
}

/// Mail relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub endpoint: String,
    pub api_key: String,
    #[serde(default = "default_subject")]
    pub subject: String,
    pub recipients: Vec<String>,
}

fn default_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "mediarelay".into())
}

fn default_token_path() -> String {
    "token.json".into()
}

fn default_dest_dir() -> String {
    "downloads".into()
}

fn default_fetch_mime() -> String {
    "video/mp4".into()
}

fn default_fetch_extension() -> String {
    ".mp4".into()
}

fn default_source_dir() -> String {
    "captures".into()
}

fn default_upload_mime() -> String {
    "image/png".into()
}

fn default_upload_extension() -> String {
    ".png".into()
}

fn default_size_ceiling() -> u64 {
    1024 * 1024
}

fn default_subject() -> String {
    "Mediarelay run report".into()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            dest_dir: default_dest_dir(),
            mime: default_fetch_mime(),
            extension: default_fetch_extension(),
        }
    }
}

impl Config {
    /// Loads configuration from disk.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();
        if !path.exists() {
            anyhow::bail!("configuration not found at {}", path.display());
        }
        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Returns the configuration file path.
fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("MEDIARELAY_CONFIG") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home)
        .join(".config")
        .join("mediarelay")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [store]
        base_url = "https://store.example/api"
        container_id = "folder-1"
        refresh_url = "https://auth.example/token"
        client_id = "client-1"
        client_secret = "secret-1"

        [upload]
        destination_url = "https://dest.example"
    "#;

    #[test]
    fn minimal_config_applies_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();

        assert_eq!(config.store.token_path, "token.json");
        assert_eq!(config.fetch.dest_dir, "downloads");
        assert_eq!(config.fetch.extension, ".mp4");
        assert_eq!(config.upload.source_dir, "captures");
        assert_eq!(config.upload.extension, ".png");
        assert_eq!(config.upload.size_ceiling_bytes, 1024 * 1024);
        assert!(config.log_file.is_none());
        assert!(config.deadline_secs.is_none());
        assert!(config.notify.is_none());
        assert!(!config.name.is_empty());
    }

    #[test]
    fn full_config_parses() {
        let content = r#"
            name = "relay-1"
            log_file = "run.log"
            deadline_secs = 900

            [store]
            base_url = "https://store.example/api"
            container_id = "folder-1"
            token_path = "/var/lib/mediarelay/token.json"
            refresh_url = "https://auth.example/token"
            client_id = "client-1"
            client_secret = "secret-1"

            [fetch]
            dest_dir = "/srv/media"
            mime = "video/mp4"
            extension = ".mp4"

            [upload]
            destination_url = "https://dest.example/gallery"
            source_dir = "/srv/shots"
            size_ceiling_bytes = 2097152

            [notify]
            endpoint = "https://relay.example/send"
            api_key = "key-1"
            recipients = ["ops@example.com"]
        "#;
        let config: Config = toml::from_str(content).unwrap();

        assert_eq!(config.name, "relay-1");
        assert_eq!(config.log_file.as_deref(), Some("run.log"));
        assert_eq!(config.deadline_secs, Some(900));
        assert_eq!(config.upload.size_ceiling_bytes, 2 * 1024 * 1024);
        let notify = config.notify.unwrap();
        assert_eq!(notify.subject, "Mediarelay run report");
        assert_eq!(notify.recipients, vec!["ops@example.com"]);
    }

    #[test]
    fn missing_required_section_fails() {
        let result: Result<Config, _> = toml::from_str("name = \"x\"");
        assert!(result.is_err());
    }
}

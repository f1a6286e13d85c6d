//! Server configuration.
//!
//! Resolution order, later wins: built-in defaults, the optional TOML file
//! passed with `--config`, environment variables, command-line flags.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::warn;

pub const SESSION_SECRET_ENV: &str = "AGENTQUEST_SESSION_SECRET";
pub const YOUTUBE_CLIENT_ID_ENV: &str = "AGENTQUEST_YOUTUBE_CLIENT_ID";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub db_path: PathBuf,
    pub session_secret: Option<String>,
    pub session_ttl_secs: u64,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
    pub youtube: YoutubeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8800,
            db_path: PathBuf::from("./var/agentquest.db"),
            session_secret: None,
            session_ttl_secs: 7 * 24 * 60 * 60,
            cors_origins: Vec::new(),
            youtube: YoutubeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
    pub client_id: Option<String>,
    pub authorize_url: String,
    pub redirect_uri: String,
    pub scope: String,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            redirect_uri: "http://127.0.0.1:8800/api/auth/youtube/callback".to_string(),
            scope: "https://www.googleapis.com/auth/youtube.readonly".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                Self::from_toml(&raw).with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env(&mut self) {
        if let Ok(secret) = std::env::var(SESSION_SECRET_ENV)
            && !secret.trim().is_empty()
        {
            self.session_secret = Some(secret);
        }
        if let Ok(client_id) = std::env::var(YOUTUBE_CLIENT_ID_ENV)
            && !client_id.trim().is_empty()
        {
            self.youtube.client_id = Some(client_id);
        }
    }

    pub fn session_ttl_ms(&self) -> u64 {
        self.session_ttl_secs.saturating_mul(1000)
    }

    /// Key used to sign session tokens. Without a configured secret a random
    /// one is generated, so sessions do not survive a restart.
    pub fn session_key(&self) -> Vec<u8> {
        match self.session_secret.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() => secret.as_bytes().to_vec(),
            _ => {
                warn!("no session secret configured, generating an ephemeral one");
                rand::random::<[u8; 32]>().to_vec()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = ServerConfig::from_toml(
            r#"
            port = 9100
            cors_origins = ["https://dash.example.com"]

            [youtube]
            client_id = "abc.apps.googleusercontent.com"
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.db_path, PathBuf::from("./var/agentquest.db"));
        assert_eq!(config.youtube.client_id.as_deref(), Some("abc.apps.googleusercontent.com"));
        assert!(config.youtube.authorize_url.starts_with("https://accounts.google.com"));
        assert_eq!(config.session_ttl_ms(), 7 * 24 * 60 * 60 * 1000);
    }

    #[test]
    fn configured_secret_is_used_verbatim() {
        let config =
            ServerConfig { session_secret: Some(" s3cret ".into()), ..ServerConfig::default() };
        assert_eq!(config.session_key(), b"s3cret".to_vec());
    }

    #[test]
    fn ephemeral_secrets_differ() {
        let config = ServerConfig::default();
        let a = config.session_key();
        let b = config.session_key();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}

//! Login state persisted between CLI invocations.

use agentquest_core::AgentId;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub wallet_address: String,
    pub agent_id: AgentId,
    pub api_url: String,
    pub saved_at_ms: u64,
    pub expires_at_ms: u64,
}

/// `<config dir>/agentquest/session.json`
pub fn default_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("agentquest").join("session.json"))
        .context("could not determine a config directory for the session file")
}

impl StoredSession {
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("reading session {}", path.display()));
            }
        };
        let session = serde_json::from_str(&raw)
            .with_context(|| format!("parsing session {}", path.display()))?;
        Ok(Some(session))
    }

    /// Like [`StoredSession::load`], but an unreadable or corrupt file counts
    /// as no session so the user can still log in again.
    pub fn load_or_discard(path: &Path) -> Option<Self> {
        match Self::load(path) {
            Ok(session) => session,
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %format!("{err:#}"),
                    "ignoring unusable session file"
                );
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        write_private(path, raw.as_bytes())
            .with_context(|| format!("writing session {}", path.display()))
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

/// The file holds a bearer token, so on unix it is readable by the owner only.
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);

    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // `mode` only applies on creation; tighten files left by older runs.
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)?;
    file.flush()
}

/// Removes the saved session. Returns whether one existed.
pub fn clear(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).with_context(|| format!("removing session {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("agentquest-cli-{}", uuid::Uuid::new_v4()))
            .join("session.json")
    }

    fn sample() -> StoredSession {
        StoredSession {
            token: "payload.signature".into(),
            wallet_address: "0xabc".into(),
            agent_id: AgentId::new(),
            api_url: "http://127.0.0.1:8800".into(),
            saved_at_ms: 1_000,
            expires_at_ms: 5_000,
        }
    }

    #[test]
    fn save_then_load() {
        let path = scratch_path();
        let session = sample();
        session.save(&path).unwrap();
        assert_eq!(StoredSession::load(&path).unwrap(), Some(session));

        assert!(clear(&path).unwrap());
        assert!(!clear(&path).unwrap());
        assert_eq!(StoredSession::load(&path).unwrap(), None);

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn corrupt_session_is_discarded_and_clearable() {
        let path = scratch_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();

        assert!(StoredSession::load(&path).is_err());
        assert_eq!(StoredSession::load_or_discard(&path), None);
        assert!(clear(&path).unwrap());
        assert!(!path.exists());

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let path = scratch_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "stale").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let session = sample();
        session.save(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(StoredSession::load(&path).unwrap(), Some(session));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn expiry_is_inclusive() {
        let session = sample();
        assert!(!session.is_expired(4_999));
        assert!(session.is_expired(5_000));
    }
}

//! Durable preferences.
//!
//! A single TOML file remembers the last selected device across process
//! restarts. Writes go through a temp-file rename so a concurrent reader
//! sees either the old record or the new one, never a torn file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use tether_types::PeerAddress;

use crate::error::Result;

/// Persisted preference record.
///
/// Unknown keys in the file are tolerated, so the record can grow without
/// invalidating older installs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Address of the last device the user selected. Overwritten on every
    /// selection, never deleted by this system.
    #[serde(default)]
    pub last_device: Option<PeerAddress>,
}

/// Handle to the preferences file.
#[derive(Debug, Clone)]
pub struct PrefsStore {
    path: PathBuf,
}

impl PrefsStore {
    /// Store at the platform's config directory (`<config_dir>/tether/config.toml`).
    pub fn open_default() -> Self {
        let path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tether")
            .join("config.toml");
        Self::at(path)
    }

    /// Store at an explicit path. Used by tests and embedders.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load preferences, or defaults when the file is missing or unreadable.
    ///
    /// A corrupt file is not fatal: it is reported and treated as empty, so
    /// the next save repairs it.
    pub fn load(&self) -> Preferences {
        match fs::read_to_string(&self.path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(prefs) => prefs,
                Err(e) => {
                    warn!(path = %self.path.display(), "failed to parse preferences: {}", e);
                    Preferences::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Preferences::default(),
            Err(e) => {
                warn!(path = %self.path.display(), "failed to read preferences: {}", e);
                Preferences::default()
            }
        }
    }

    /// Save preferences atomically.
    pub fn save(&self, prefs: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(prefs)?;
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Read the remembered last device.
    pub fn last_device(&self) -> Option<PeerAddress> {
        self.load().last_device
    }

    /// Remember `address` as the last selected device.
    pub fn set_last_device(&self, address: PeerAddress) -> Result<()> {
        let mut prefs = self.load();
        prefs.last_device = Some(address);
        self.save(&prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, PrefsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PrefsStore::at(dir.path().join("config.toml"));
        (dir, store)
    }

    #[test]
    fn missing_file_loads_defaults() {
        let (_dir, store) = temp_store();
        assert_eq!(store.load(), Preferences::default());
        assert!(store.last_device().is_none());
    }

    #[test]
    fn set_then_get_round_trips() {
        let (_dir, store) = temp_store();
        let addr: PeerAddress = "AA:BB:CC:DD:EE:02".parse().unwrap();
        store.set_last_device(addr).unwrap();
        assert_eq!(store.last_device(), Some(addr));
    }

    #[test]
    fn survives_reopen_at_same_path() {
        let (_dir, store) = temp_store();
        let addr: PeerAddress = "AA:BB:CC:DD:EE:01".parse().unwrap();
        store.set_last_device(addr).unwrap();

        // Simulated restart: a fresh handle over the same path.
        let reopened = PrefsStore::at(store.path().to_path_buf());
        assert_eq!(reopened.last_device(), Some(addr));
    }

    #[test]
    fn corrupt_file_treated_as_empty_and_repaired() {
        let (_dir, store) = temp_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "this is { not toml").unwrap();

        assert_eq!(store.load(), Preferences::default());

        let addr: PeerAddress = "AA:BB:CC:DD:EE:03".parse().unwrap();
        store.set_last_device(addr).unwrap();
        assert_eq!(store.last_device(), Some(addr));
    }

    #[test]
    fn unknown_keys_tolerated() {
        let (_dir, store) = temp_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(
            store.path(),
            "last_device = \"AA:BB:CC:DD:EE:04\"\nfuture_setting = true\n",
        )
        .unwrap();

        assert_eq!(
            store.last_device(),
            Some("AA:BB:CC:DD:EE:04".parse().unwrap())
        );
    }

    #[test]
    fn no_temp_file_left_behind() {
        let (_dir, store) = temp_store();
        store
            .set_last_device("AA:BB:CC:DD:EE:05".parse().unwrap())
            .unwrap();
        assert!(!store.path().with_extension("toml.tmp").exists());
    }
}

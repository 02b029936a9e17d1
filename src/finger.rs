//! Durable cache of finger replies, keyed by callsign.
//!
//! One JSON document holds the whole cache; every update rewrites it. The
//! store keeps an in-memory copy so lookups never touch the disk.
#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// One remembered finger reply.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FingerEntry {
    /// Callsign as it appeared on the air, casing preserved for display.
    pub callsign: String,
    pub last_response: String,
    pub updated: DateTime<Utc>,
}

/// On-disk document: uppercased callsign to entry.
pub type FingerCache = HashMap<String, FingerEntry>;

/// Identity cache backed by a single JSON file.
pub struct FingerStore {
    path: PathBuf,
    cache: FingerCache,
}

impl FingerStore {
    /// Per-user default location of the cache file.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::UserDirs::new()
            .ok_or_else(|| Error::Cache("Could not determine home directory".to_string()))?;

        Ok(dirs.home_dir().join(".ragchew").join("finger.json"))
    }

    /// Open the store at `path`. A missing file is an empty cache; a present
    /// but unreadable one is an error the caller decides on.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            return Ok(Self {
                path,
                cache: FingerCache::new(),
            });
        }

        let content = std::fs::read_to_string(&path)?;
        let cache: FingerCache = serde_json::from_str(&content)?;

        Ok(Self { path, cache })
    }

    /// Empty store at `path`, ignoring whatever is on disk until the next save.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: FingerCache::new(),
        }
    }

    /// Record a reply from `callsign` and persist the whole cache.
    pub fn upsert(&mut self, callsign: &str, response: &str, now: DateTime<Utc>) -> Result<()> {
        let entry = FingerEntry {
            callsign: callsign.to_string(),
            last_response: response.to_string(),
            updated: now,
        };

        self.cache.insert(callsign.to_uppercase(), entry);
        self.save()?;

        tracing::debug!("Cached finger reply from {}", callsign);
        Ok(())
    }

    /// Look up a callsign, case-insensitively.
    pub fn lookup(&self, callsign: &str) -> Option<&FingerEntry> {
        self.cache.get(&callsign.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.cache)?;
        std::fs::write(&self.path, content)?;

        // The cache names who is on the air and when; keep it private.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = FingerStore::open(dir.path().join("finger.json")).unwrap();

        assert!(store.is_empty());
        assert!(store.lookup("W1AW").is_none());
    }

    #[test]
    fn test_upsert_persists_across_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("finger.json");

        let mut store = FingerStore::open(&path).unwrap();
        store.upsert("W1AW", "Gear: FT-991A", Utc::now()).unwrap();

        let reopened = FingerStore::open(&path).unwrap();
        let entry = reopened.lookup("W1AW").unwrap();
        assert_eq!(entry.callsign, "W1AW");
        assert_eq!(entry.last_response, "Gear: FT-991A");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let dir = tempdir().unwrap();
        let mut store = FingerStore::open(dir.path().join("finger.json")).unwrap();

        store.upsert("w1aw", "Grid: FN31", Utc::now()).unwrap();

        let entry = store.lookup("W1AW").unwrap();
        // Display casing comes back as received.
        assert_eq!(entry.callsign, "w1aw");
        assert_eq!(store.len(), 1);

        // Same key regardless of casing on a later update.
        store.upsert("W1AW", "Grid: FN32", Utc::now()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup("w1aw").unwrap().last_response, "Grid: FN32");
    }

    #[test]
    fn test_save_creates_parent_and_pretty_prints() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("finger.json");

        let mut store = FingerStore::open(&path).unwrap();
        store.upsert("KD7ABC", "QTH: Portland", Utc::now()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains('\n'), "cache file should be pretty-printed");
        assert!(content.contains("KD7ABC"));
    }

    #[test]
    fn test_open_corrupt_file_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("finger.json");
        std::fs::write(&path, "not json at all").unwrap();

        assert!(FingerStore::open(&path).is_err());
    }
}

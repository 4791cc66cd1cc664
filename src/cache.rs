//! Local JSON mirror of a store's collection.
//!
//! The mirror gives a fast first paint and is the only persistence in local-only mode.
//! It is rewritten wholesale after every collection change and never patched in place.
//! When a remote backend is connected, a live fetch always overrides it.

use crate::errors::Result;
use serde::{Serialize, de::DeserializeOwned};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, trace, warn};

/// Mirror key for storage locations
pub const LOCATIONS_KEY: &str = "stowage_locations_cache";
/// Mirror key for inventory items
pub const ITEMS_KEY: &str = "stowage_inventory_cache";

/// A JSON array of entities stored under a fixed key in a directory.
#[derive(Debug, Clone)]
pub struct LocalCache {
    dir: PathBuf,
    key: &'static str,
}

impl LocalCache {
    /// Mirror stored as `<dir>/<key>.json`.
    pub fn new(dir: impl AsRef<Path>, key: &'static str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            key,
        }
    }

    /// Location mirror in `dir`.
    pub fn locations(dir: impl AsRef<Path>) -> Self {
        Self::new(dir, LOCATIONS_KEY)
    }

    /// Item mirror in `dir`.
    pub fn items(dir: impl AsRef<Path>) -> Self {
        Self::new(dir, ITEMS_KEY)
    }

    /// File backing this mirror.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.key))
    }

    /// Reads the mirror. Returns `None` when nothing has been written yet.
    ///
    /// # Errors
    /// Returns [`crate::errors::Error::Cache`] if the file cannot be read or parsed.
    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<Vec<T>>> {
        let path = self.path();
        if !path.exists() {
            debug!("No local mirror at {:?}", path);
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        let entries: Vec<T> = serde_json::from_str(&contents)?;
        debug!("Loaded {} entries from {:?}", entries.len(), path);
        Ok(Some(entries))
    }

    /// Like [`LocalCache::load`], but logs and ignores a corrupt mirror.
    #[must_use]
    pub fn load_or_discard<T: DeserializeOwned>(&self) -> Option<Vec<T>> {
        match self.load() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to load local mirror {}: {}", self.key, e);
                None
            }
        }
    }

    /// Replaces the mirror with `entries`.
    ///
    /// # Errors
    /// Returns [`crate::errors::Error::Cache`] if the directory or file cannot be written.
    pub fn store<T: Serialize>(&self, entries: &[T]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(entries)?)?;
        fs::rename(&tmp, &path)?;
        trace!("Wrote {} entries to {:?}", entries.len(), path);
        Ok(())
    }

    /// Best-effort [`LocalCache::store`]; failures are logged, never surfaced.
    pub fn refresh<T: Serialize>(&self, entries: &[T]) {
        if let Err(e) = self.store(entries) {
            warn!("Failed to refresh local mirror {}: {}", self.key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::models::{LocationInput, LocationType, StorageLocation};
    use chrono::Utc;

    fn sample() -> StorageLocation {
        LocationInput::new("Garage", LocationType::Room)
            .into_location("loc-1".to_string(), Utc::now())
            .unwrap()
    }

    #[test]
    fn test_load_missing_mirror_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::locations(dir.path());
        let loaded: Option<Vec<StorageLocation>> = cache.load().unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::locations(dir.path().join("nested"));
        let location = sample();
        cache.store(std::slice::from_ref(&location)).unwrap();

        let loaded: Vec<StorageLocation> = cache.load().unwrap().unwrap();
        assert_eq!(loaded, vec![location]);
    }

    #[test]
    fn test_mirror_uses_iso_dates_and_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::locations(dir.path());
        cache.store(&[sample()]).unwrap();

        let raw = fs::read_to_string(cache.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entry = &json[0];
        assert_eq!(entry["type"], "room");
        assert!(entry["createdAt"].as_str().unwrap().contains('T'));
        assert!(entry.get("parentId").is_some());
    }

    #[test]
    fn test_corrupt_mirror_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::items(dir.path());
        fs::write(cache.path(), "not json").unwrap();
        assert!(cache.load::<StorageLocation>().is_err());
        assert!(cache.load_or_discard::<StorageLocation>().is_none());
    }
}

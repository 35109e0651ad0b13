//! JSON file cache for restart recovery.
//!
//! Stores the per-section availability and lock flags so the dashboard
//! can render sensible button state immediately after a restart, before
//! the first REST round-trip completes. The cache is advisory: a missing
//! or corrupt file is treated as no cache at all.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use esusync_core::ports::StateCache;
use esusync_domain::{Result, Section, SectionFlags};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::InfraError;

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    sections: BTreeMap<String, SectionFlags>,
}

pub struct FileStateCache {
    path: PathBuf,
}

impl FileStateCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StateCache for FileStateCache {
    async fn load(&self) -> Result<Option<BTreeMap<Section, SectionFlags>>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state cache present");
                return Ok(None);
            }
            Err(err) => return Err(InfraError::from(err).into()),
        };

        let file: CacheFile = match serde_json::from_slice(&raw) {
            Ok(file) => file,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "unreadable state cache ignored");
                return Ok(None);
            }
        };

        // Keys from older versions that no longer name a section are
        // skipped rather than failing the whole load.
        let flags = file
            .sections
            .into_iter()
            .filter_map(|(key, flags)| key.parse::<Section>().ok().map(|s| (s, flags)))
            .collect();
        Ok(Some(flags))
    }

    async fn save(&self, flags: &BTreeMap<Section, SectionFlags>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(InfraError::from)?;
            }
        }

        let file = CacheFile {
            sections: flags.iter().map(|(s, f)| (s.to_string(), *f)).collect(),
        };
        let raw = serde_json::to_vec_pretty(&file).map_err(InfraError::from)?;
        tokio::fs::write(&self.path, raw).await.map_err(InfraError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_flags() -> BTreeMap<Section, SectionFlags> {
        let mut flags = BTreeMap::new();
        flags.insert(
            Section::Bpa,
            SectionFlags { file_available: true, button_disabled: false },
        );
        flags.insert(
            Section::Visitas,
            SectionFlags { file_available: false, button_disabled: true },
        );
        flags
    }

    #[tokio::test]
    async fn saved_flags_survive_a_reload() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let cache = FileStateCache::new(tmp.path().join("state.json"));

        cache.save(&sample_flags()).await.expect("saved");
        let loaded = cache.load().await.expect("loaded").expect("present");
        assert_eq!(loaded, sample_flags());
    }

    #[tokio::test]
    async fn missing_file_is_not_an_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let cache = FileStateCache::new(tmp.path().join("absent.json"));
        assert_eq!(cache.load().await.expect("loaded"), None);
    }

    #[tokio::test]
    async fn corrupt_file_is_ignored() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("state.json");
        tokio::fs::write(&path, b"{ not json").await.expect("write");

        let cache = FileStateCache::new(path);
        assert_eq!(cache.load().await.expect("loaded"), None);
    }

    #[tokio::test]
    async fn unknown_section_keys_are_skipped() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("state.json");
        let body = serde_json::json!({
            "sections": {
                "bpa": {"file_available": true, "button_disabled": false},
                "retired_module": {"file_available": true, "button_disabled": true},
            }
        });
        tokio::fs::write(&path, serde_json::to_vec(&body).expect("json"))
            .await
            .expect("write");

        let cache = FileStateCache::new(path);
        let loaded = cache.load().await.expect("loaded").expect("present");
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key(&Section::Bpa));
    }

    #[tokio::test]
    async fn save_creates_missing_parent_directories() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let cache = FileStateCache::new(tmp.path().join("nested/dir/state.json"));
        cache.save(&sample_flags()).await.expect("saved");
        assert!(cache.load().await.expect("loaded").is_some());
    }
}

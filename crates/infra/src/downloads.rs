//! Filesystem storage for downloaded artifacts.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use esusync_core::ports::{Artifact, ArtifactStore};
use esusync_domain::Result;
use tracing::info;

/// Writes artifacts into a single downloads directory, creating it on
/// demand. Server-supplied filenames are sanitized so a hostile
/// `Content-Disposition` cannot escape the directory.
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn sanitize(filename: &str) -> String {
        let name: String = filename
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '\0' => '_',
                c => c,
            })
            .collect();
        let name = name.trim();
        if name.is_empty() || name.chars().all(|c| c == '.') {
            "download.bin".to_string()
        } else {
            name.to_string()
        }
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn save(&self, artifact: &Artifact) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(crate::errors::InfraError::from)?;

        let path = self.dir.join(Self::sanitize(&artifact.filename));
        tokio::fs::write(&path, &artifact.bytes)
            .await
            .map_err(crate::errors::InfraError::from)?;

        info!(path = %path.display(), bytes = artifact.bytes.len(), "artifact saved");
        Ok(path)
    }
}

impl FsArtifactStore {
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_artifact_into_created_directory() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = FsArtifactStore::new(tmp.path().join("downloads"));

        let artifact = Artifact {
            filename: "visitas_2024.xlsx".to_string(),
            bytes: b"payload".to_vec(),
        };
        let path = store.save(&artifact).await.expect("saved");

        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("visitas_2024.xlsx"));
        assert_eq!(tokio::fs::read(&path).await.expect("read back"), b"payload");
    }

    #[tokio::test]
    async fn hostile_filenames_cannot_escape_the_directory() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = FsArtifactStore::new(tmp.path());

        let artifact = Artifact {
            filename: "../../etc/passwd".to_string(),
            bytes: vec![0u8],
        };
        let path = store.save(&artifact).await.expect("saved");

        assert!(path.starts_with(tmp.path()));
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some(".._.._etc_passwd"));
    }

    #[tokio::test]
    async fn empty_filename_falls_back() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = FsArtifactStore::new(tmp.path());

        let artifact = Artifact { filename: "  ".to_string(), bytes: vec![1u8] };
        let path = store.save(&artifact).await.expect("saved");
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("download.bin"));
    }
}

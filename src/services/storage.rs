//! Storage for uploaded media.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::config::MediaConfig;
use crate::database::models::PostType;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist `bytes` and return the stored file name, relative to the media directory
    async fn store(&self, kind: PostType, content_type: &str, bytes: &[u8]) -> Result<String, StorageError>;

    /// Delete a file returned by `store`; a file that is already gone is not an error
    async fn remove(&self, kind: PostType, name: &str) -> Result<(), StorageError>;
}

/// Writes uploads below `<root>/<image_path>` and `<root>/<video_path>`
pub struct LocalFileStore {
    image_dir: PathBuf,
    video_dir: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl AsRef<Path>, media: &MediaConfig) -> Self {
        let root = root.as_ref();
        Self {
            image_dir: root.join(media.image_path.trim_start_matches('/')),
            video_dir: root.join(media.video_path.trim_start_matches('/')),
        }
    }

    fn dir_for(&self, kind: PostType) -> &Path {
        match kind {
            PostType::Image => &self.image_dir,
            PostType::Video => &self.video_dir,
        }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn store(&self, kind: PostType, content_type: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let dir = self.dir_for(kind);
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| StorageError::Io {
                path: dir.to_path_buf(),
                source,
            })?;

        let name = format!("{}.{}", random_name(), extension(content_type));
        let path = dir.join(&name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| StorageError::Io { path: path.clone(), source })?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "stored upload");
        Ok(name)
    }

    async fn remove(&self, kind: PostType, name: &str) -> Result<(), StorageError> {
        let path = self.dir_for(kind).join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "removed upload");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }
}

fn random_name() -> String {
    let digest = Sha256::digest(Uuid::new_v4().as_bytes());
    digest[..16].iter().map(|b| format!("{:02x}", b)).collect()
}

/// `image/png` -> `png`; anything unusable becomes `bin`
fn extension(content_type: &str) -> String {
    let subtype = content_type
        .split(';')
        .next()
        .and_then(|mime| mime.rsplit('/').next())
        .unwrap_or("")
        .trim();

    if !subtype.is_empty() && subtype.chars().all(|c| c.is_ascii_alphanumeric()) {
        subtype.to_ascii_lowercase()
    } else {
        "bin".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn extension_comes_from_the_subtype() {
        assert_eq!(extension("image/png"), "png");
        assert_eq!(extension("video/MP4; codecs=avc1"), "mp4");
        assert_eq!(extension("application/x-foo"), "bin");
        assert_eq!(extension(""), "bin");
    }

    #[tokio::test]
    async fn images_and_videos_land_in_their_own_directories() {
        let root = tempfile::tempdir().unwrap();
        let config = AppConfig::for_tests();
        let store = LocalFileStore::new(root.path(), &config.media);

        let image = store.store(PostType::Image, "image/jpeg", b"jpeg").await.unwrap();
        let video = store.store(PostType::Video, "video/mp4", b"mp4").await.unwrap();

        assert!(image.ends_with(".jpeg"));
        assert_eq!(image.len(), 32 + ".jpeg".len());
        let image_dir = root.path().join(config.media.image_path.trim_start_matches('/'));
        let video_dir = root.path().join(config.media.video_path.trim_start_matches('/'));
        assert_eq!(std::fs::read(image_dir.join(&image)).unwrap(), b"jpeg");
        assert_eq!(std::fs::read(video_dir.join(&video)).unwrap(), b"mp4");
    }

    #[tokio::test]
    async fn remove_deletes_the_stored_file_once() {
        let root = tempfile::tempdir().unwrap();
        let config = AppConfig::for_tests();
        let store = LocalFileStore::new(root.path(), &config.media);

        let image = store.store(PostType::Image, "image/png", b"png").await.unwrap();
        let path = root
            .path()
            .join(config.media.image_path.trim_start_matches('/'))
            .join(&image);
        assert!(path.exists());

        store.remove(PostType::Image, &image).await.unwrap();
        assert!(!path.exists());

        store.remove(PostType::Image, &image).await.unwrap();
    }
}

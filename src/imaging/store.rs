//! Append-only storage for generated images.

use crate::error::ImageError;

use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt as _;

use std::path::PathBuf;

/// Writes images under a fixed directory as `<timestamp>_<short id>.<ext>`.
///
/// Files are created exclusively and never overwritten or removed.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the images directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Collision-resistant file path for an image created at `now`.
    pub fn unique_path(&self, extension: &str, now: DateTime<Utc>) -> PathBuf {
        let short_id = uuid::Uuid::new_v4().simple().to_string();
        let file_name = format!(
            "{}_{}.{extension}",
            now.format("%Y%m%d_%H%M%S"),
            &short_id[..8]
        );
        self.dir.join(file_name)
    }

    /// Persist `bytes` to a fresh file and return its path.
    pub async fn save(&self, bytes: &[u8], extension: &str) -> Result<PathBuf, ImageError> {
        let path = self.unique_path(extension, Utc::now());
        let save_error = |source| ImageError::Save {
            path: path.display().to_string(),
            source,
        };

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(save_error)?;
        file.write_all(bytes).await.map_err(save_error)?;
        file.flush().await.map_err(save_error)?;

        Ok(path)
    }
}

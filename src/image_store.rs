//! Persistent store for uploaded product images
//!
//! Images arrive inline as data-URI payloads and are written as JPG files
//! under the uploads directory; responses carry the relative URL instead of
//! the raw payload. Deletion is best-effort and only ever touches files
//! below the managed upload prefix.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::{Path, PathBuf};

/// URL prefix identifying files owned by this store.
pub const UPLOADS_URL_PREFIX: &str = "/static/uploads/";

/// On-disk store for uploaded images
pub struct ImageStore {
    uploads_dir: PathBuf,
}

impl ImageStore {
    /// Create the store, creating the uploads directory if needed.
    pub fn new(uploads_dir: impl Into<PathBuf>) -> Self {
        let uploads_dir = uploads_dir.into();
        if let Err(e) = std::fs::create_dir_all(&uploads_dir) {
            log::warn!("Failed to create uploads directory: {}", e);
        } else {
            log::info!("Uploads directory: {:?}", uploads_dir);
        }
        Self { uploads_dir }
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Whether a URL points at a file owned by this store.
    pub fn is_managed(url: &str) -> bool {
        url.starts_with(UPLOADS_URL_PREFIX)
    }

    /// Save a data-URI image payload under a unique filename.
    ///
    /// Returns the relative URL of the stored file, or `None` on any
    /// decoding or I/O failure. Failures are logged, not raised; callers
    /// treat `None` as "no image persisted".
    pub fn save_data_uri(&self, data_uri: &str) -> Option<String> {
        let (_, payload) = data_uri.split_once(',')?;

        let bytes = match STANDARD.decode(payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Failed to decode image payload: {}", e);
                return None;
            }
        };

        let filename = format!("{}.jpg", uuid::Uuid::new_v4().simple());
        let path = self.uploads_dir.join(&filename);
        if let Err(e) = std::fs::write(&path, bytes) {
            log::warn!("Failed to save image {}: {}", path.display(), e);
            return None;
        }

        Some(format!("{}{}", UPLOADS_URL_PREFIX, filename))
    }

    /// Delete a stored image by its URL. No-op for unmanaged URLs; all
    /// errors are swallowed (best-effort cleanup).
    pub fn delete(&self, url: &str) {
        if !Self::is_managed(url) {
            return;
        }
        let Some(filename) = url.rsplit('/').next() else {
            return;
        };
        let path = self.uploads_dir.join(filename);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                log::warn!("Failed to delete image {}: {}", path.display(), e);
            }
        }
    }
}

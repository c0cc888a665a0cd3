//! Blob storage for student images.
//!
//! Images live on the local filesystem under a key derived from the owning
//! student's identifier, e.g. `42.png`, and are served back as static files.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::error::{AppError, StorageError};

const FALLBACK_EXTENSION: &str = "bin";

/// An image received with a request, validated but not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    bytes: Vec<u8>,
    extension: &'static str,
}

impl ImageUpload {
    /// Wraps raw bytes from a file part. Empty parts count as no image.
    pub fn from_bytes(
        bytes: Vec<u8>,
        content_type: Option<&str>,
        filename: Option<&str>,
        max_bytes: usize,
    ) -> Result<Option<Self>, AppError> {
        if bytes.is_empty() {
            return Ok(None);
        }
        check_size(bytes.len(), max_bytes)?;

        let extension = content_type
            .and_then(extension_for_mime)
            .or_else(|| filename.and_then(extension_for_filename))
            .unwrap_or(FALLBACK_EXTENSION);

        Ok(Some(Self { bytes, extension }))
    }

    /// Decodes a base64 text part, optionally given as a `data:` URI.
    pub fn from_base64(text: &str, max_bytes: usize) -> Result<Option<Self>, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let (mime, payload) = match text.strip_prefix("data:") {
            Some(uri) => {
                let (header, payload) = uri.split_once(',').ok_or_else(|| {
                    AppError::ValidationError("img data URI has no payload".to_string())
                })?;
                let mime = header.strip_suffix(";base64").ok_or_else(|| {
                    AppError::ValidationError("img data URI must be base64 encoded".to_string())
                })?;
                (Some(mime), payload)
            }
            None => (None, text),
        };

        let bytes = BASE64
            .decode(payload)
            .map_err(|e| AppError::ValidationError(format!("img is not valid base64: {}", e)))?;

        Self::from_bytes(bytes, mime, None, max_bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn extension(&self) -> &'static str {
        self.extension
    }
}

fn check_size(len: usize, max_bytes: usize) -> Result<(), AppError> {
    if len > max_bytes {
        return Err(AppError::ValidationError(format!(
            "img exceeds the {} byte limit",
            max_bytes
        )));
    }
    Ok(())
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    match mime.trim().to_ascii_lowercase().as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/bmp" => Some("bmp"),
        _ => None,
    }
}

fn extension_for_filename(filename: &str) -> Option<&'static str> {
    let extension = Path::new(filename).extension()?.to_str()?;
    match extension.to_ascii_lowercase().as_str() {
        "png" => Some("png"),
        "jpg" | "jpeg" => Some("jpg"),
        "gif" => Some("gif"),
        "webp" => Some("webp"),
        "bmp" => Some("bmp"),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    url_prefix: String,
}

impl ImageStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            url_prefix: config.url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key_for(student_id: i32, upload: &ImageUpload) -> String {
        format!("{}.{}", student_id, upload.extension)
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.url_prefix, key)
    }

    /// Writes the image for `student_id` and returns its public URL.
    ///
    /// The file is written under a temporary name and renamed into place, so
    /// a reader never sees a partially written image.
    pub async fn save(&self, student_id: i32, upload: &ImageUpload) -> Result<String, StorageError> {
        let key = Self::key_for(student_id, upload);
        let failed = |source| StorageError::WriteFailed {
            key: key.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(failed)?;

        let target = self.dir.join(&key);
        let staging = self.dir.join(format!(".{}.{}.tmp", key, Uuid::new_v4()));

        if let Err(e) = tokio::fs::write(&staging, upload.bytes()).await {
            return Err(failed(e));
        }
        if let Err(e) = tokio::fs::rename(&staging, &target).await {
            if let Err(cleanup) = tokio::fs::remove_file(&staging).await {
                warn!("Failed to remove staging file {}: {}", staging.display(), cleanup);
            }
            return Err(failed(e));
        }

        info!("Image saved to {}", target.display());
        Ok(self.url_for(&key))
    }

    /// Maps a public URL produced by [`ImageStore::save`] back to its key.
    pub fn key_from_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        let key = url.strip_prefix(self.url_prefix.as_str())?.strip_prefix('/')?;
        let plain = !key.is_empty() && !key.starts_with('.') && !key.contains(&['/', '\\'][..]);
        plain.then_some(key)
    }

    /// Deletes the image behind `url`. Returns `false` when the URL is not
    /// one of ours or the file is already gone.
    pub async fn remove(&self, url: &str) -> Result<bool, StorageError> {
        let Some(key) = self.key_from_url(url) else {
            return Ok(false);
        };

        match tokio::fs::remove_file(self.dir.join(key)).await {
            Ok(()) => {
                info!("Image {} removed", key);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StorageError::RemoveFailed {
                key: key.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn temp_store() -> ImageStore {
        let dir = std::env::temp_dir().join(format!("campus-images-{}", Uuid::new_v4()));
        ImageStore::new(&UploadConfig {
            dir,
            url_prefix: "/uploads/images/".to_string(),
            max_image_bytes: 1024,
        })
    }

    #[test]
    fn empty_upload_is_no_image() {
        let upload = ImageUpload::from_bytes(Vec::new(), Some("image/png"), None, 1024).unwrap();
        assert!(upload.is_none());
        assert!(ImageUpload::from_base64("   ", 1024).unwrap().is_none());
    }

    #[test]
    fn extension_follows_content_type_then_filename() {
        let upload = ImageUpload::from_bytes(PNG_MAGIC.to_vec(), Some("image/jpeg"), Some("me.png"), 1024)
            .unwrap()
            .unwrap();
        assert_eq!(upload.extension(), "jpg");

        let upload = ImageUpload::from_bytes(
            PNG_MAGIC.to_vec(),
            Some("application/octet-stream"),
            Some("ME.PNG"),
            1024,
        )
        .unwrap()
        .unwrap();
        assert_eq!(upload.extension(), "png");

        let upload = ImageUpload::from_bytes(PNG_MAGIC.to_vec(), None, Some("notes.txt"), 1024)
            .unwrap()
            .unwrap();
        assert_eq!(upload.extension(), "bin");
    }

    #[test]
    fn oversized_upload_is_rejected() {
        let result = ImageUpload::from_bytes(vec![0u8; 2048], Some("image/png"), None, 1024);
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn base64_data_uri_is_decoded() {
        let text = format!("data:image/png;base64,{}", BASE64.encode(PNG_MAGIC));
        let upload = ImageUpload::from_base64(&text, 1024).unwrap().unwrap();
        assert_eq!(upload.bytes(), &PNG_MAGIC);
        assert_eq!(upload.extension(), "png");

        let plain = ImageUpload::from_base64(&BASE64.encode(PNG_MAGIC), 1024)
            .unwrap()
            .unwrap();
        assert_eq!(plain.extension(), "bin");
    }

    #[test]
    fn malformed_base64_is_rejected() {
        let result = ImageUpload::from_base64("not*base64", 1024);
        assert!(matches!(result, Err(AppError::ValidationError(_))));

        let result = ImageUpload::from_base64("data:image/png,plain", 1024);
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn key_and_url_derive_from_student_id() {
        let store = temp_store();
        let upload = ImageUpload::from_bytes(PNG_MAGIC.to_vec(), Some("image/png"), None, 1024)
            .unwrap()
            .unwrap();
        let key = ImageStore::key_for(42, &upload);
        assert_eq!(key, "42.png");
        assert_eq!(store.url_for(&key), "/uploads/images/42.png");
    }

    #[tokio::test]
    async fn save_writes_image_under_its_key() {
        let store = temp_store();
        let upload = ImageUpload::from_bytes(PNG_MAGIC.to_vec(), Some("image/png"), None, 1024)
            .unwrap()
            .unwrap();

        let url = store.save(7, &upload).await.unwrap();
        assert_eq!(url, "/uploads/images/7.png");

        let written = tokio::fs::read(store.dir().join("7.png")).await.unwrap();
        assert_eq!(written, PNG_MAGIC);

        let leftovers: Vec<_> = std::fs::read_dir(store.dir())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        tokio::fs::remove_dir_all(store.dir()).await.unwrap();
    }

    #[test]
    fn only_plain_keys_under_the_prefix_are_recognised() {
        let store = temp_store();
        assert_eq!(store.key_from_url("/uploads/images/42.png"), Some("42.png"));
        assert_eq!(store.key_from_url("/uploads/images/../secret"), None);
        assert_eq!(store.key_from_url("/uploads/images/a/b.png"), None);
        assert_eq!(store.key_from_url("/uploads/images/"), None);
        assert_eq!(store.key_from_url("https://cdn.example.com/42.png"), None);
    }

    #[tokio::test]
    async fn remove_deletes_saved_image_once() {
        let store = temp_store();
        let upload = ImageUpload::from_bytes(PNG_MAGIC.to_vec(), Some("image/png"), None, 1024)
            .unwrap()
            .unwrap();
        let url = store.save(9, &upload).await.unwrap();

        assert!(store.remove(&url).await.unwrap());
        assert!(!store.dir().join("9.png").exists());
        assert!(!store.remove(&url).await.unwrap());
        assert!(!store.remove("/elsewhere/9.png").await.unwrap());

        tokio::fs::remove_dir_all(store.dir()).await.unwrap();
    }
}

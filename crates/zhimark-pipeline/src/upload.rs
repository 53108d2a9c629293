//! Content-addressed directory uploader.

use std::fs;
use std::path::PathBuf;

use crate::services::{UploadError, UploadedImage, Uploader};

/// Default public base URL of uploaded images.
pub const DEFAULT_BASE_URL: &str = "https://picx.zhimg.com";

/// [`Uploader`] that stores images as `v2-<md5>.<ext>` in a directory.
///
/// The returned URL is `<base_url>/v2-<md5>.<ext>`, the layout the image
/// host uses, so the directory can be synced to it as-is.
pub struct DirectoryUploader {
    dir: PathBuf,
    base_url: String,
}

impl DirectoryUploader {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            dir: dir.into(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }
}

/// File name of an uploaded image.
#[must_use]
pub fn object_name(hash: &str, extension: &str) -> String {
    format!("v2-{hash}.{extension}")
}

impl Uploader for DirectoryUploader {
    fn upload_image(
        &self,
        bytes: &[u8],
        hash: &str,
        extension: &str,
    ) -> Result<UploadedImage, UploadError> {
        if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(UploadError::Rejected(format!("invalid content hash '{hash}'")));
        }
        let name = object_name(hash, extension);
        let path = self.dir.join(&name);
        if path.exists() {
            tracing::debug!(path = %path.display(), "image already stored");
        } else {
            fs::create_dir_all(&self.dir)?;
            fs::write(&path, bytes)?;
            tracing::info!(path = %path.display(), "stored image");
        }
        Ok(UploadedImage::new(format!("{}/{name}", self.base_url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_upload_writes_content_addressed_file() {
        let tmp = TempDir::new().unwrap();
        let uploader = DirectoryUploader::new(tmp.path().join("out"), "https://img.example/");

        let uploaded = uploader.upload_image(b"png", "abc123", "png").unwrap();
        assert_eq!(uploaded.url, "https://img.example/v2-abc123.png");
        assert_eq!(fs::read(tmp.path().join("out/v2-abc123.png")).unwrap(), b"png");
    }

    #[test]
    fn test_upload_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let uploader = DirectoryUploader::new(tmp.path(), DEFAULT_BASE_URL);
        let first = uploader.upload_image(b"x", "ff", "gif").unwrap();
        let second = uploader.upload_image(b"x", "ff", "gif").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_path_like_hash() {
        let tmp = TempDir::new().unwrap();
        let uploader = DirectoryUploader::new(tmp.path(), DEFAULT_BASE_URL);
        assert!(matches!(
            uploader.upload_image(b"x", "../evil", "png"),
            Err(UploadError::Rejected(_))
        ));
    }
}

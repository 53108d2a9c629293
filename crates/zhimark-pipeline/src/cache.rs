//! Image upload cache keyed by content hash.
//!
//! Entries are written twice per upload: a [`ImageState::Processing`] entry
//! before the upload starts and a [`ImageState::Success`] entry once the
//! uploader returns. A processing entry found on lookup means an earlier
//! upload never finished; the caller uploads again. Success entries are
//! never overwritten.
//!
//! # Implementations
//!
//! - [`NullImageCache`]: always misses
//! - [`MemoryImageCache`]: process-local map
//! - [`FileImageCache`]: one JSON file per hash, with version validation
//!
//! Cache failures are logged and otherwise ignored; a broken cache only
//! costs extra uploads.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Version written to the `VERSION` file of a [`FileImageCache`].
pub const CACHE_VERSION: &str = "1";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageState {
    Processing,
    Success,
}

/// Upload status of one image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageStatus {
    pub state: ImageState,
    /// Remote URL. Empty while processing.
    pub url: String,
    /// Where the bytes came from (source URL or local path).
    pub fallback: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark_src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_watermark_src: Option<String>,
}

impl ImageStatus {
    #[must_use]
    pub fn processing(fallback: impl Into<String>) -> Self {
        Self {
            state: ImageState::Processing,
            url: String::new(),
            fallback: fallback.into(),
            width: 0,
            height: 0,
            watermark_src: None,
            private_watermark_src: None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state == ImageState::Success
    }
}

/// Content-hash keyed store of upload results.
pub trait ImageCache: Send + Sync {
    /// Entry stored for `hash`, if any.
    fn get(&self, hash: &str) -> Option<ImageStatus>;

    /// Store `status` for `hash`. Ignored when a success entry exists.
    fn set(&self, hash: &str, status: &ImageStatus);
}

/// No-op [`ImageCache`]. Every upload goes to the uploader.
pub struct NullImageCache;

impl ImageCache for NullImageCache {
    fn get(&self, _hash: &str) -> Option<ImageStatus> {
        None
    }

    fn set(&self, _hash: &str, _status: &ImageStatus) {}
}

/// In-memory [`ImageCache`] shared across renders of one process.
#[derive(Default)]
pub struct MemoryImageCache {
    entries: Mutex<HashMap<String, ImageStatus>>,
}

impl MemoryImageCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ImageCache for MemoryImageCache {
    fn get(&self, hash: &str) -> Option<ImageStatus> {
        self.entries.lock().ok()?.get(hash).cloned()
    }

    fn set(&self, hash: &str, status: &ImageStatus) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        if entries.get(hash).is_some_and(ImageStatus::is_success) {
            return;
        }
        entries.insert(hash.to_owned(), status.clone());
    }
}

/// File-based [`ImageCache`].
///
/// Directory layout:
/// ```text
/// {root}/
/// +-- VERSION        # contains CACHE_VERSION
/// +-- 3f/
///     +-- 3f2a...json
/// ```
///
/// A different `VERSION` wipes the directory on construction. A non-empty
/// directory without `VERSION` is never touched: the cache stays disabled
/// and every lookup misses.
pub struct FileImageCache {
    root: PathBuf,
    usable: bool,
}

impl FileImageCache {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        let usable = validate_version(&root, CACHE_VERSION);
        Self { root, usable }
    }

    fn entry_path(&self, hash: &str) -> PathBuf {
        let shard = hash.get(..2).unwrap_or("00");
        self.root.join(shard).join(format!("{hash}.json"))
    }
}

impl ImageCache for FileImageCache {
    fn get(&self, hash: &str) -> Option<ImageStatus> {
        if !self.usable {
            return None;
        }
        let data = fs::read(self.entry_path(hash)).ok()?;
        match serde_json::from_slice(&data) {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::debug!(hash, "ignoring unreadable cache entry: {e}");
                None
            }
        }
    }

    fn set(&self, hash: &str, status: &ImageStatus) {
        if !self.usable || self.get(hash).is_some_and(|existing| existing.is_success()) {
            return;
        }
        let path = self.entry_path(hash);
        let Some(parent) = path.parent() else {
            return;
        };
        if fs::create_dir_all(parent).is_err() {
            return;
        }
        let Ok(json) = serde_json::to_vec(status) else {
            return;
        };
        if let Err(e) = fs::write(&path, json) {
            tracing::warn!("failed to write cache entry {}: {e}", path.display());
        }
    }
}

/// Validate the cache version. Returns whether the cache can be used.
///
/// Only a directory carrying a `VERSION` file is ever wiped.
fn validate_version(root: &Path, version: &str) -> bool {
    let version_file = root.join("VERSION");

    match fs::read_to_string(&version_file) {
        Ok(stored) if stored == version => {
            tracing::debug!("image cache version matches: {version}");
            return true;
        }
        Ok(stored) => {
            tracing::info!(
                "image cache version mismatch (stored={stored}, current={version}), wiping cache"
            );
            if let Err(e) = fs::remove_dir_all(root) {
                tracing::warn!("failed to remove image cache directory: {e}");
                return false;
            }
        }
        Err(_) if !is_empty_or_missing(root) => {
            tracing::warn!(
                "{} is not empty and has no VERSION file, image cache disabled",
                root.display()
            );
            return false;
        }
        Err(_) => {
            tracing::info!("no image cache VERSION file found, initializing cache");
        }
    }

    if let Err(e) = fs::create_dir_all(root) {
        tracing::warn!("failed to create image cache directory: {e}");
        return false;
    }
    if let Err(e) = fs::write(&version_file, version) {
        tracing::warn!("failed to write image cache VERSION file: {e}");
        return false;
    }
    true
}

fn is_empty_or_missing(root: &Path) -> bool {
    match fs::read_dir(root) {
        Ok(mut entries) => entries.next().is_none(),
        Err(e) => e.kind() == std::io::ErrorKind::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn success(url: &str) -> ImageStatus {
        ImageStatus {
            state: ImageState::Success,
            url: url.to_owned(),
            fallback: "pic.png".to_owned(),
            width: 4,
            height: 3,
            watermark_src: None,
            private_watermark_src: None,
        }
    }

    #[test]
    fn test_null_cache_always_misses() {
        let cache = NullImageCache;
        cache.set("abc", &success("https://x/1.png"));
        assert_eq!(cache.get("abc"), None);
    }

    #[test]
    fn test_memory_cache_success_is_final() {
        let cache = MemoryImageCache::new();
        cache.set("abc", &ImageStatus::processing("pic.png"));
        assert_eq!(cache.get("abc").map(|s| s.state), Some(ImageState::Processing));

        cache.set("abc", &success("https://x/1.png"));
        cache.set("abc", &success("https://x/2.png"));
        cache.set("abc", &ImageStatus::processing("pic.png"));
        assert_eq!(cache.get("abc"), Some(success("https://x/1.png")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_file_cache_persists_across_instances() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("images");

        let cache = FileImageCache::new(root.clone());
        cache.set("3f2a", &success("https://x/1.png"));
        assert!(root.join("3f").join("3f2a.json").exists());

        let reopened = FileImageCache::new(root);
        assert_eq!(reopened.get("3f2a"), Some(success("https://x/1.png")));
    }

    #[test]
    fn test_file_cache_success_is_final() {
        let tmp = TempDir::new().unwrap();
        let cache = FileImageCache::new(tmp.path().join("images"));
        cache.set("aa11", &success("https://x/1.png"));
        cache.set("aa11", &success("https://x/2.png"));
        assert_eq!(cache.get("aa11").unwrap().url, "https://x/1.png");
    }

    #[test]
    fn test_file_cache_version_mismatch_wipes() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("images");
        fs::create_dir_all(root.join("aa")).unwrap();
        fs::write(root.join("VERSION"), "0").unwrap();
        fs::write(root.join("aa").join("aa11.json"), "{}").unwrap();

        let cache = FileImageCache::new(root.clone());
        assert_eq!(cache.get("aa11"), None);
        assert!(!root.join("aa").exists());
        assert_eq!(fs::read_to_string(root.join("VERSION")).unwrap(), CACHE_VERSION);
    }

    #[test]
    fn test_file_cache_leaves_unversioned_directory_alone() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("notes");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("todo.md"), "keep me").unwrap();

        let cache = FileImageCache::new(root.clone());
        cache.set("cc33", &success("https://x/3.png"));

        assert_eq!(fs::read_to_string(root.join("todo.md")).unwrap(), "keep me");
        assert!(!root.join("VERSION").exists());
        assert!(!root.join("cc").exists());
        assert_eq!(cache.get("cc33"), None);
    }

    #[test]
    fn test_file_cache_initializes_empty_directory() {
        let tmp = TempDir::new().unwrap();
        let cache = FileImageCache::new(tmp.path().to_path_buf());
        assert_eq!(
            fs::read_to_string(tmp.path().join("VERSION")).unwrap(),
            CACHE_VERSION
        );
        cache.set("dd44", &success("https://x/4.png"));
        assert!(cache.get("dd44").is_some());
    }

    #[test]
    fn test_file_cache_ignores_corrupt_entry() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("images");
        let cache = FileImageCache::new(root.clone());
        fs::create_dir_all(root.join("bb")).unwrap();
        fs::write(root.join("bb").join("bb22.json"), "not json").unwrap();
        assert_eq!(cache.get("bb22"), None);
    }

    #[test]
    fn test_status_json_shape() {
        let json = serde_json::to_string(&ImageStatus::processing("a.png")).unwrap();
        assert_eq!(
            json,
            r#"{"state":"processing","url":"","fallback":"a.png","width":0,"height":0}"#
        );
    }
}

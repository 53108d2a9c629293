//! Upload path shared by the image, diagram and formula stages.
//!
//! Payloads are hashed, deduplicated by hash, checked against the image
//! cache and uploaded in parallel. Every payload gets the result of its
//! hash, so identical bytes within one stage cost one upload.

use std::collections::HashMap;
use std::io::Cursor;

use md5::{Digest, Md5};
use rayon::prelude::*;
use zhimark_renderer::{ImageHint, Node, NodeKind};

use crate::cache::{ImageCache, ImageState, ImageStatus};
use crate::services::Uploader;

/// Raw image bytes with a description of where they came from.
pub(crate) struct Payload {
    pub bytes: Vec<u8>,
    pub source: String,
}

/// Where an image ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Published {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub watermark_src: String,
    pub private_watermark_src: String,
}

impl Published {
    fn from_status(status: ImageStatus) -> Self {
        Self {
            url: status.url,
            width: status.width,
            height: status.height,
            watermark_src: status.watermark_src.unwrap_or_default(),
            private_watermark_src: status.private_watermark_src.unwrap_or_default(),
        }
    }

    /// Image node pointing at the uploaded copy.
    pub fn image_node(&self, caption: String) -> Node {
        Node::new(NodeKind::Image {
            url: self.url.clone(),
            alt: caption.clone(),
            title: String::new(),
            hint: Some(ImageHint {
                caption,
                raw_width: self.width,
                raw_height: self.height,
                original_src: self.url.clone(),
                watermark_src: self.watermark_src.clone(),
                private_watermark_src: self.private_watermark_src.clone(),
            }),
        })
    }
}

/// MD5 hex digest of `bytes`.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Md5::digest(bytes))
}

/// File extension for the image format of `bytes`, `png` when unknown.
#[must_use]
pub fn image_extension(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("png")
}

/// Pixel dimensions decoded from the image header.
#[must_use]
pub fn image_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// Upload every payload, one upload per distinct hash.
///
/// The result vector is parallel to `payloads`.
pub(crate) fn publish_all(
    payloads: &[Payload],
    uploader: &dyn Uploader,
    cache: &dyn ImageCache,
) -> Vec<Result<Published, String>> {
    let hashes: Vec<String> = payloads
        .par_iter()
        .map(|payload| content_hash(&payload.bytes))
        .collect();

    let mut first_by_hash: HashMap<&str, usize> = HashMap::new();
    for (index, hash) in hashes.iter().enumerate() {
        first_by_hash.entry(hash.as_str()).or_insert(index);
    }
    let unique: Vec<(&str, usize)> = first_by_hash.into_iter().collect();

    let results: HashMap<&str, Result<Published, String>> = unique
        .par_iter()
        .map(|&(hash, index)| (hash, publish_one(&payloads[index], hash, uploader, cache)))
        .collect();

    hashes
        .iter()
        .map(|hash| {
            results
                .get(hash.as_str())
                .cloned()
                .unwrap_or_else(|| Err(format!("no upload result for {hash}")))
        })
        .collect()
}

/// Upload the payloads that loaded, passing load errors through.
pub(crate) fn publish_loaded(
    loaded: Vec<Result<Payload, String>>,
    uploader: &dyn Uploader,
    cache: &dyn ImageCache,
) -> Vec<Result<Published, String>> {
    let mut payloads = Vec::new();
    let mut slots = Vec::with_capacity(loaded.len());
    for result in loaded {
        slots.push(result.map(|payload| {
            payloads.push(payload);
            payloads.len() - 1
        }));
    }
    let published = publish_all(&payloads, uploader, cache);
    slots
        .into_iter()
        .map(|slot| slot.and_then(|index| published[index].clone()))
        .collect()
}

fn publish_one(
    payload: &Payload,
    hash: &str,
    uploader: &dyn Uploader,
    cache: &dyn ImageCache,
) -> Result<Published, String> {
    if let Some(status) = cache.get(hash).filter(ImageStatus::is_success) {
        tracing::debug!(hash, "image cache hit");
        return Ok(Published::from_status(status));
    }
    if payload.bytes.is_empty() {
        return Err("image is empty".to_owned());
    }

    cache.set(hash, &ImageStatus::processing(payload.source.clone()));
    let extension = image_extension(&payload.bytes);
    let uploaded = uploader
        .upload_image(&payload.bytes, hash, extension)
        .map_err(|e| e.to_string())?;

    let decoded = image_dimensions(&payload.bytes);
    let width = uploaded.width.or(decoded.map(|d| d.0)).unwrap_or(0);
    let height = uploaded.height.or(decoded.map(|d| d.1)).unwrap_or(0);

    let status = ImageStatus {
        state: ImageState::Success,
        url: uploaded.url,
        fallback: payload.source.clone(),
        width,
        height,
        watermark_src: uploaded.watermark_src,
        private_watermark_src: uploaded.private_watermark_src,
    };
    cache.set(hash, &status);
    tracing::info!(hash, url = %status.url, "uploaded image");
    Ok(Published::from_status(status))
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::cache::{MemoryImageCache, NullImageCache};
    use pretty_assertions::assert_eq;

    fn payload(bytes: &[u8], source: &str) -> Payload {
        Payload {
            bytes: bytes.to_vec(),
            source: source.to_owned(),
        }
    }

    #[test]
    fn test_content_hash() {
        assert_eq!(content_hash(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_png_metadata() {
        assert_eq!(image_extension(PNG_2X1), "png");
        assert_eq!(image_dimensions(PNG_2X1), Some((2, 1)));
        assert_eq!(image_dimensions(b"not an image"), None);
        assert_eq!(image_extension(b"not an image"), "png");
    }

    #[test]
    fn test_identical_bytes_upload_once() {
        let uploader = RecordingUploader::default();
        let payloads = vec![
            payload(PNG_2X1, "a.png"),
            payload(PNG_2X1, "copy/of/a.png"),
            payload(b"other", "b.bin"),
        ];
        let results = publish_all(&payloads, &uploader, &NullImageCache);

        assert_eq!(uploader.count(), 2);
        let first = results[0].clone().unwrap();
        assert_eq!(results[1].clone().unwrap(), first);
        assert_eq!((first.width, first.height), (2, 1));
        assert_ne!(results[2].clone().unwrap().url, first.url);
    }

    #[test]
    fn test_cache_hit_skips_upload() {
        let uploader = RecordingUploader::default();
        let cache = MemoryImageCache::new();
        let payloads = vec![payload(PNG_2X1, "a.png")];

        let first = publish_all(&payloads, &uploader, &cache);
        let second = publish_all(&payloads, &uploader, &cache);
        assert_eq!(uploader.count(), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_failed_upload_leaves_processing_entry() {
        let cache = MemoryImageCache::new();
        let payloads = vec![payload(PNG_2X1, "a.png")];
        let results = publish_all(&payloads, &FailingUploader, &cache);

        assert!(results[0].as_ref().unwrap_err().contains("quota exceeded"));
        let status = cache.get(&content_hash(PNG_2X1)).unwrap();
        assert_eq!(status.state, ImageState::Processing);
        assert_eq!(status.fallback, "a.png");
    }

    #[test]
    fn test_publish_loaded_keeps_order() {
        let uploader = RecordingUploader::default();
        let loaded = vec![
            Err("missing".to_owned()),
            Ok(payload(PNG_2X1, "a.png")),
            Ok(payload(PNG_2X1, "b.png")),
        ];
        let results = publish_loaded(loaded, &uploader, &NullImageCache);
        assert_eq!(results[0], Err("missing".to_owned()));
        assert!(results[1].is_ok());
        assert_eq!(results[1], results[2]);
        assert_eq!(uploader.count(), 1);
    }

    #[test]
    fn test_empty_payload_is_error() {
        let uploader = RecordingUploader::default();
        let results = publish_all(&[payload(b"", "empty.png")], &uploader, &NullImageCache);
        assert!(results[0].is_err());
        assert_eq!(uploader.count(), 0);
    }

    #[test]
    fn test_image_node_hint() {
        let published = Published {
            url: "https://img.test/x.png".to_owned(),
            width: 3,
            height: 4,
            watermark_src: String::new(),
            private_watermark_src: String::new(),
        };
        let node = published.image_node("cap".to_owned());
        let NodeKind::Image { url, hint, .. } = node.kind else {
            panic!("expected image");
        };
        assert_eq!(url, "https://img.test/x.png");
        let hint = hint.unwrap();
        assert_eq!(hint.caption, "cap");
        assert_eq!((hint.raw_width, hint.raw_height), (3, 4));
        assert_eq!(hint.original_src, "https://img.test/x.png");
    }
}

//! Offline copies of web images.
//!
//! Downloads every web image a markdown note references into the vault and
//! rewrites the reference to a wiki embed of the local copy. Files are
//! content-addressed: `<folder>/<h0h1>/<h2h3>/<md5>.<ext>`.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use zhimark_renderer::{NodeKind, parse};

use crate::publish::content_hash;
use crate::services::Fetcher;
use crate::stage;
use crate::warning::Warning;

/// Result of [`localize_images`].
#[derive(Debug)]
pub struct Localized {
    /// Markdown with downloaded images replaced by wiki embeds.
    pub markdown: String,
    /// Files written by this run. Copies that already existed are not
    /// listed.
    pub saved: Vec<PathBuf>,
    pub warnings: Vec<Warning>,
}

struct Target {
    url: String,
    caption: String,
    start: usize,
    end: usize,
}

struct Stored {
    /// Vault-relative path with `/` separators.
    embed_path: String,
    written: Option<PathBuf>,
}

/// Download the web images of `source` into `root/folder` and point the
/// markdown at the local copies.
///
/// `folder` is relative to the vault `root` and is used verbatim in the
/// embeds. Images that fail to download keep their original text.
pub fn localize_images(source: &str, fetcher: &dyn Fetcher, root: &Path, folder: &str) -> Localized {
    let document = parse(source);
    let targets = stage::collect(&document, |node| match &node.kind {
        NodeKind::Image { url, alt, .. } if is_web_url(url) => {
            let range = node.position?.range();
            Some(Target {
                url: url.clone(),
                caption: alt.trim().to_owned(),
                start: range.start,
                end: range.end,
            })
        }
        _ => None,
    });

    let mut urls: Vec<&str> = targets.iter().map(|t| t.url.as_str()).collect();
    urls.sort_unstable();
    urls.dedup();
    tracing::debug!(images = urls.len(), "localizing web images");

    let stored: HashMap<&str, Result<Stored, String>> = urls
        .par_iter()
        .map(|url| (*url, store(url, fetcher, root, folder)))
        .collect();

    let mut warnings = Vec::new();
    let mut saved = Vec::new();
    let mut replacements = Vec::new();
    for url in &urls {
        match stored.get(url) {
            Some(Ok(Stored {
                written: Some(path),
                ..
            })) => saved.push(path.clone()),
            Some(Err(message)) => warnings.push(Warning::new(*url, message.clone())),
            _ => {}
        }
    }
    for target in &targets {
        if let Some(Ok(stored)) = stored.get(target.url.as_str()) {
            let embed = if target.caption.is_empty() {
                format!("![[{}]]", stored.embed_path)
            } else {
                format!("![[{}|{}]]", stored.embed_path, target.caption)
            };
            replacements.push((target.start, target.end, embed));
        }
    }

    // Back to front, so earlier offsets stay valid.
    replacements.sort_by(|a, b| b.0.cmp(&a.0));
    let mut markdown = source.to_owned();
    for (start, end, embed) in replacements {
        markdown.replace_range(start..end, &embed);
    }

    Localized {
        markdown,
        saved,
        warnings,
    }
}

fn is_web_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Bucketed, content-addressed location of an image.
///
/// Hashes too short to bucket go under `00`.
pub fn offline_path(folder: &str, hash: &str, extension: &str) -> String {
    let folder = folder.trim_end_matches('/');
    let prefix = if folder.is_empty() {
        String::new()
    } else {
        format!("{folder}/")
    };
    let outer = hash.get(..2).unwrap_or("00");
    let inner = hash.get(2..4).unwrap_or("00");
    format!("{prefix}{outer}/{inner}/{hash}.{extension}")
}

fn store(url: &str, fetcher: &dyn Fetcher, root: &Path, folder: &str) -> Result<Stored, String> {
    let bytes = fetcher
        .fetch_bytes(url)
        .map_err(|e| format!("failed to download image: {e}"))?;
    let hash = content_hash(&bytes);
    let extension = image::guess_format(&bytes)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("bin");
    let embed_path = offline_path(folder, &hash, extension);
    let path = root.join(&embed_path);

    let written = write_new(&path, &bytes).map_err(|e| format!("failed to save {}: {e}", path.display()))?;
    if written {
        tracing::info!(url, path = %path.display(), "saved image");
    }
    Ok(Stored {
        embed_path,
        written: written.then_some(path),
    })
}

/// Write `bytes` unless the file exists. Returns whether it was written.
fn write_new(path: &Path, bytes: &[u8]) -> std::io::Result<bool> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(bytes)?;
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

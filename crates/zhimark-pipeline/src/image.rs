//! Image resolution stage.
//!
//! Markdown images without a hint and wiki image embeds are loaded (HTTP for
//! web URLs, the vault otherwise), uploaded through [`crate::publish`] and
//! replaced with hinted image nodes. Nodes that fail keep their original
//! form and produce a [`Warning`].

use percent_encoding::percent_decode_str;
use rayon::prelude::*;
use url::Url;
use zhimark_renderer::{Document, Node, NodeKind};

use crate::pipeline::Services;
use crate::publish::{Payload, publish_loaded};
use crate::stage;
use crate::vault::has_image_extension;
use crate::warning::Warning;

/// Image stage settings.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageOptions {
    /// Without alt text, caption markdown images with their uploaded URL and
    /// wiki embeds with their file name.
    pub use_image_name_as_caption: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Source {
    Web(String),
    Local(String),
}

#[derive(Debug)]
struct ImageJob {
    source: Source,
    alt: String,
    wiki: bool,
}

impl ImageJob {
    fn subject(&self) -> &str {
        match &self.source {
            Source::Web(url) => url,
            Source::Local(name) => name,
        }
    }

    fn caption(&self, remote_url: &str, use_name: bool) -> String {
        let alt = self.alt.trim();
        if !alt.is_empty() {
            return alt.to_owned();
        }
        if !use_name {
            return String::new();
        }
        match (&self.source, self.wiki) {
            (Source::Local(name), true) => name.rsplit('/').next().unwrap_or(name).to_owned(),
            _ => remote_url.to_owned(),
        }
    }
}

/// Upload referenced images and attach rendering hints.
pub fn resolve_images(
    document: Document,
    options: &ImageOptions,
    services: &Services<'_>,
) -> (Document, Vec<Warning>) {
    let jobs = stage::collect(&document, select);
    if jobs.is_empty() {
        return (document, Vec::new());
    }
    tracing::debug!(images = jobs.len(), "resolving images");

    let loaded: Vec<Result<Payload, String>> =
        jobs.par_iter().map(|job| load(job, services)).collect();
    let published = publish_loaded(loaded, services.uploader, services.cache);

    let mut warnings = Vec::new();
    let replacements = jobs
        .iter()
        .zip(published)
        .map(|(job, result)| match result {
            Ok(image) => {
                let caption = job.caption(&image.url, options.use_image_name_as_caption);
                Some(image.image_node(caption))
            }
            Err(message) => {
                warnings.push(Warning::new(job.subject(), message));
                None
            }
        })
        .collect();

    let document = stage::replace(document, |node| select(node).is_some(), replacements);
    (document, warnings)
}

fn select(node: &Node) -> Option<ImageJob> {
    match &node.kind {
        NodeKind::Image {
            url,
            alt,
            hint: None,
            ..
        } => Some(ImageJob {
            source: classify(url)?,
            alt: alt.clone(),
            wiki: false,
        }),
        NodeKind::WikiImageLink { target, alias } => {
            let source = classify(target)?;
            if matches!(&source, Source::Local(name) if !has_image_extension(name)) {
                return None;
            }
            Some(ImageJob {
                source,
                alt: alias.clone().unwrap_or_default(),
                wiki: true,
            })
        }
        _ => None,
    }
}

/// Web URL or local reference. Other schemes (`data:`, `file:`) are left
/// alone.
fn classify(reference: &str) -> Option<Source> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    let decoded = percent_decode_str(reference).decode_utf8_lossy().into_owned();
    match Url::parse(&decoded) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            Some(Source::Web(reference.to_owned()))
        }
        // Single-letter schemes are Windows drive letters.
        Ok(url) if url.scheme().len() > 1 => None,
        _ => Some(Source::Local(decoded)),
    }
}

fn load(job: &ImageJob, services: &Services<'_>) -> Result<Payload, String> {
    let bytes = match &job.source {
        Source::Web(url) => services
            .fetcher
            .fetch_bytes(url)
            .map_err(|e| format!("failed to fetch image: {e}"))?,
        Source::Local(name) => {
            let path = services
                .files
                .resolve_local_reference(name, services.document_path)
                .map_err(|e| e.to_string())?;
            services
                .files
                .read_local_file(&path)
                .map_err(|e| e.to_string())?
        }
    };
    Ok(Payload {
        bytes,
        source: job.subject().to_owned(),
    })
}

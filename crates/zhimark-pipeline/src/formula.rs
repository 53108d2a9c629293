//! Formula stage: Typst math becomes TeX or typeset images.
//!
//! Inline math is always converted to TeX. Display math is converted too
//! when `display_as_tex` is set, otherwise it is typeset like code blocks
//! tagged with the render language. Typeset images go through
//! [`crate::publish`].

use rayon::prelude::*;
use zhimark_renderer::{Document, Node, NodeKind};

use crate::pipeline::Services;
use crate::publish::{Payload, publish_loaded};
use crate::stage;
use crate::typst::{ConversionError, typst_to_tex};
use crate::warning::Warning;

pub use zhimark_config::DEFAULT_PRESET_STYLE;

/// Formula stage settings.
#[derive(Clone, Debug)]
pub struct FormulaOptions {
    /// Run the stage at all. Math is left as written when off.
    pub enabled: bool,
    /// Convert display math to TeX instead of typesetting it.
    pub display_as_tex: bool,
    /// Preamble placed before every typeset document.
    pub preset_style: String,
    pub ppi: u32,
    /// Fence language of code blocks typeset as whole documents.
    pub language: String,
}

impl Default for FormulaOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            display_as_tex: true,
            preset_style: DEFAULT_PRESET_STYLE.to_owned(),
            ppi: 300,
            language: "typrender".to_owned(),
        }
    }
}

#[derive(Debug)]
enum FormulaJob {
    Convert { value: String, display: bool },
    Typeset { source: String, subject: String },
}

/// Convert and typeset the document's Typst math.
pub fn resolve_formulas(
    document: Document,
    options: &FormulaOptions,
    services: &Services<'_>,
) -> (Document, Vec<Warning>) {
    if !options.enabled {
        return (document, Vec::new());
    }
    let jobs = stage::collect(&document, |node| select(node, options));
    if jobs.is_empty() {
        return (document, Vec::new());
    }
    tracing::debug!(formulas = jobs.len(), "resolving formulas");

    let mut warnings = Vec::new();
    let typesetting = jobs.iter().any(|job| matches!(job, FormulaJob::Typeset { .. }))
        && typesetter_ready(services, &mut warnings);

    let converted: Vec<Option<Result<String, ConversionError>>> = jobs
        .par_iter()
        .map(|job| match job {
            FormulaJob::Convert { value, .. } => Some(typst_to_tex(value)),
            FormulaJob::Typeset { .. } => None,
        })
        .collect();

    let typeset_sources: Vec<&str> = if typesetting {
        jobs.iter()
            .filter_map(|job| match job {
                FormulaJob::Typeset { source, .. } => Some(source.as_str()),
                FormulaJob::Convert { .. } => None,
            })
            .collect()
    } else {
        Vec::new()
    };
    let loaded: Vec<Result<Payload, String>> = typeset_sources
        .par_iter()
        .map(|source| typeset(source, options, services))
        .collect();
    let mut published = publish_loaded(loaded, services.uploader, services.cache).into_iter();

    let replacements = jobs
        .iter()
        .zip(converted)
        .map(|(job, converted)| match (job, converted) {
            (FormulaJob::Convert { display, .. }, Some(Ok(tex))) => {
                let kind = if *display {
                    NodeKind::Math { value: tex }
                } else {
                    NodeKind::InlineMath { value: tex }
                };
                Some(Node::new(kind))
            }
            (FormulaJob::Convert { value, .. }, Some(Err(e))) => {
                warnings.push(Warning::new(value.trim(), format!("failed to convert formula: {e}")));
                None
            }
            (FormulaJob::Typeset { subject, .. }, _) if typesetting => match published.next() {
                Some(Ok(image)) => Some(image.image_node(String::new())),
                Some(Err(message)) => {
                    warnings.push(Warning::new(subject.as_str(), message));
                    None
                }
                None => None,
            },
            _ => None,
        })
        .collect();

    let document = stage::replace(document, |node| select(node, options).is_some(), replacements);
    (document, warnings)
}

fn select(node: &Node, options: &FormulaOptions) -> Option<FormulaJob> {
    match &node.kind {
        NodeKind::InlineMath { value } => Some(FormulaJob::Convert {
            value: value.clone(),
            display: false,
        }),
        NodeKind::Math { value } if options.display_as_tex => Some(FormulaJob::Convert {
            value: value.clone(),
            display: true,
        }),
        NodeKind::Math { value } => Some(FormulaJob::Typeset {
            source: format!("$ {value} $"),
            subject: value.trim().to_owned(),
        }),
        NodeKind::Code {
            lang: Some(lang),
            value,
            ..
        } if *lang == options.language => Some(FormulaJob::Typeset {
            source: value.clone(),
            subject: value.lines().next().unwrap_or_default().trim().to_owned(),
        }),
        _ => None,
    }
}

/// Query the typesetter once. On failure every typeset job of this render
/// is skipped with a single warning.
fn typesetter_ready(services: &Services<'_>, warnings: &mut Vec<Warning>) -> bool {
    match services.typesetter.version() {
        Ok(version) => {
            tracing::debug!(%version, "typesetter available");
            true
        }
        Err(e) => {
            warnings.push(Warning::new(
                "typst",
                format!("typesetter unavailable, formulas left as written: {e}"),
            ));
            false
        }
    }
}

fn typeset(source: &str, options: &FormulaOptions, services: &Services<'_>) -> Result<Payload, String> {
    let bytes = services
        .typesetter
        .typeset_to_raster(source, &options.preset_style, options.ppi)
        .map_err(|e| format!("failed to typeset formula: {e}"))?;
    Ok(Payload {
        bytes,
        source: "typst formula".to_owned(),
    })
}

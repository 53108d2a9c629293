//! Markdown to platform HTML.
//!
//! Provides [`render_to_html`], which runs the parser, the syntax extensions
//! and the resolution stages in a fixed order and serializes the result.
//! Each stage consumes the previous tree and produces a new one.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use zhimark_renderer::{
    EmitOptions, LinkResolver, emit, extend_autolinks, extend_breaks, extend_callouts, extend_math,
    extend_wiki_links, merge_raw, parse, to_html,
};

use crate::cache::ImageCache;
use crate::diagram::{DiagramOptions, render_diagrams};
use crate::formula::{DEFAULT_PRESET_STYLE, FormulaOptions, resolve_formulas};
use crate::image::{ImageOptions, resolve_images};
use crate::services::{DiagramRenderer, Fetcher, FileLookup, Rasterizer, Typesetter, Uploader};
use crate::warning::Warning;

/// Collaborators used by a render.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub fetcher: &'a dyn Fetcher,
    pub files: &'a dyn FileLookup,
    pub uploader: &'a dyn Uploader,
    pub cache: &'a dyn ImageCache,
    pub diagrams: &'a dyn DiagramRenderer,
    pub rasterizer: &'a dyn Rasterizer,
    pub typesetter: &'a dyn Typesetter,
    pub links: &'a dyn LinkResolver,
    /// Path of the document being rendered. Relative image references
    /// (`./`, `../`) resolve against it.
    pub document_path: Option<&'a Path>,
}

/// Render settings.
#[derive(Clone, Debug)]
pub struct RenderOptions {
    /// Caption images without alt text with their URL or file name.
    pub use_image_name_as_caption: bool,
    /// Shift headings down one level (`#` to `h2`, `###` and below to bold
    /// paragraphs).
    pub use_dialect_headings: bool,
    /// Treat math as Typst: convert it to TeX or typeset it.
    pub typesetting_enabled: bool,
    /// Convert display math to TeX instead of typesetting it to an image.
    pub display_math_as_tex: bool,
    /// Preamble placed before every typeset document.
    pub preset_style: String,
    pub typeset_ppi: u32,
    /// Fence language of code blocks typeset as whole documents.
    pub typeset_language_tag: String,
    /// Raster scale for diagrams relative to their natural size.
    pub diagram_scale_factor: f32,
    /// Fence language of diagram blocks.
    pub diagram_render_language_tag: String,
    /// Values for `var(--name)` references in diagram SVG.
    pub diagram_theme: BTreeMap<String, String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            use_image_name_as_caption: false,
            use_dialect_headings: true,
            typesetting_enabled: false,
            display_math_as_tex: true,
            preset_style: DEFAULT_PRESET_STYLE.to_owned(),
            typeset_ppi: 300,
            typeset_language_tag: "typrender".to_owned(),
            diagram_scale_factor: 1.0,
            diagram_render_language_tag: "mermaid".to_owned(),
            diagram_theme: BTreeMap::new(),
        }
    }
}

impl RenderOptions {
    /// Check the settings a render cannot run without.
    pub fn validate(&self) -> Result<(), RenderError> {
        if !(self.diagram_scale_factor.is_finite() && self.diagram_scale_factor > 0.0) {
            return Err(RenderError::InvalidOptions(format!(
                "diagram scale factor must be positive, got {}",
                self.diagram_scale_factor
            )));
        }
        if self.typeset_ppi == 0 {
            return Err(RenderError::InvalidOptions(
                "typeset ppi must be greater than 0".to_owned(),
            ));
        }
        if self.typeset_language_tag.trim().is_empty() {
            return Err(RenderError::InvalidOptions(
                "typeset language tag must not be empty".to_owned(),
            ));
        }
        if self.diagram_render_language_tag.trim().is_empty() {
            return Err(RenderError::InvalidOptions(
                "diagram language tag must not be empty".to_owned(),
            ));
        }
        Ok(())
    }

    fn formula(&self) -> FormulaOptions {
        FormulaOptions {
            enabled: self.typesetting_enabled,
            display_as_tex: self.display_math_as_tex,
            preset_style: self.preset_style.clone(),
            ppi: self.typeset_ppi,
            language: self.typeset_language_tag.clone(),
        }
    }

    fn diagram(&self) -> DiagramOptions {
        DiagramOptions {
            language: self.diagram_render_language_tag.clone(),
            scale: self.diagram_scale_factor,
            theme: self.diagram_theme.clone(),
        }
    }
}

/// Render stages, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Parsed,
    MathExtended,
    WikiLinkExtended,
    AutolinkExtended,
    CalloutExtended,
    BreaksExtended,
    FormulaResolved,
    ImagesResolved,
    Emitted,
    RawHtmlMerged,
    Serialized,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parsed => "parsed",
            Self::MathExtended => "math extended",
            Self::WikiLinkExtended => "wiki links extended",
            Self::AutolinkExtended => "autolinks extended",
            Self::CalloutExtended => "callouts extended",
            Self::BreaksExtended => "breaks extended",
            Self::FormulaResolved => "formulas resolved",
            Self::ImagesResolved => "images resolved",
            Self::Emitted => "emitted",
            Self::RawHtmlMerged => "raw html merged",
            Self::Serialized => "serialized",
        };
        f.write_str(name)
    }
}

/// Result of a render.
#[derive(Clone, Debug)]
pub struct Rendered {
    pub html: String,
    /// Nodes left untransformed, in stage order.
    pub warnings: Vec<Warning>,
}

/// Error returned when a render cannot start.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("invalid render options: {0}")]
    InvalidOptions(String),
}

/// Render `source` to the platform HTML dialect.
///
/// Individual nodes that cannot be resolved stay in their original form and
/// are reported in [`Rendered::warnings`].
///
/// # Errors
///
/// Returns [`RenderError::InvalidOptions`] when `options` fail validation.
pub fn render_to_html(
    source: &str,
    options: &RenderOptions,
    services: &Services<'_>,
) -> Result<Rendered, RenderError> {
    options.validate()?;
    let mut warnings = Vec::new();

    let document = parse(source);
    reached(Stage::Parsed);
    let document = extend_math(document);
    reached(Stage::MathExtended);
    let document = extend_wiki_links(document);
    reached(Stage::WikiLinkExtended);
    let document = extend_autolinks(document);
    reached(Stage::AutolinkExtended);
    let document = extend_callouts(document);
    reached(Stage::CalloutExtended);
    let document = extend_breaks(document);
    reached(Stage::BreaksExtended);

    let (document, formula_warnings) = resolve_formulas(document, &options.formula(), services);
    warnings.extend(formula_warnings);
    reached(Stage::FormulaResolved);

    let (document, diagram_warnings) = render_diagrams(document, &options.diagram(), services);
    warnings.extend(diagram_warnings);
    let image_options = ImageOptions {
        use_image_name_as_caption: options.use_image_name_as_caption,
    };
    let (document, image_warnings) = resolve_images(document, &image_options, services);
    warnings.extend(image_warnings);
    reached(Stage::ImagesResolved);

    let emit_options = EmitOptions {
        dialect_headings: options.use_dialect_headings,
    };
    let nodes = emit(&document, &emit_options, services.links);
    reached(Stage::Emitted);
    let nodes = merge_raw(nodes);
    reached(Stage::RawHtmlMerged);
    let html = to_html(&nodes);
    reached(Stage::Serialized);

    tracing::debug!(bytes = html.len(), warnings = warnings.len(), "render complete");
    Ok(Rendered { html, warnings })
}

fn reached(stage: Stage) {
    tracing::debug!(%stage, "render stage");
}

//! Diagram stage: fenced diagram blocks become uploaded images.

use std::collections::BTreeMap;

use rayon::prelude::*;
use zhimark_renderer::{Document, Node, NodeKind};

use crate::pipeline::Services;
use crate::publish::{Payload, publish_loaded};
use crate::stage;
use crate::theme::resolve_theme_vars;
use crate::warning::Warning;

/// Diagram stage settings.
#[derive(Clone, Debug)]
pub struct DiagramOptions {
    /// Fence language of diagram blocks.
    pub language: String,
    /// Raster scale relative to the SVG's natural size.
    pub scale: f32,
    /// Values for `var(--name)` references in the rendered SVG.
    pub theme: BTreeMap<String, String>,
}

impl Default for DiagramOptions {
    fn default() -> Self {
        Self {
            language: "mermaid".to_owned(),
            scale: 1.0,
            theme: BTreeMap::new(),
        }
    }
}

/// Render, rasterize and upload every diagram block.
///
/// Blocks that fail stay code blocks.
pub fn render_diagrams(
    document: Document,
    options: &DiagramOptions,
    services: &Services<'_>,
) -> (Document, Vec<Warning>) {
    let is_diagram = |node: &Node| {
        matches!(&node.kind, NodeKind::Code { lang: Some(lang), .. } if *lang == options.language)
    };
    let sources = stage::collect(&document, |node| match &node.kind {
        NodeKind::Code { value, .. } if is_diagram(node) => Some(value.clone()),
        _ => None,
    });
    if sources.is_empty() {
        return (document, Vec::new());
    }
    tracing::debug!(diagrams = sources.len(), "rendering diagrams");

    let loaded: Vec<Result<Payload, String>> = sources
        .par_iter()
        .map(|source| rasterize(source, options, services))
        .collect();
    let published = publish_loaded(loaded, services.uploader, services.cache);

    let mut warnings = Vec::new();
    let replacements = sources
        .iter()
        .zip(published)
        .map(|(source, result)| match result {
            Ok(image) => Some(image.image_node(String::new())),
            Err(message) => {
                warnings.push(Warning::new(first_line(source), message));
                None
            }
        })
        .collect();

    (stage::replace(document, is_diagram, replacements), warnings)
}

fn rasterize(source: &str, options: &DiagramOptions, services: &Services<'_>) -> Result<Payload, String> {
    let svg = services
        .diagrams
        .render_to_vector(source)
        .map_err(|e| format!("failed to render diagram: {e}"))?;
    let svg = resolve_theme_vars(&svg, &options.theme);
    let bytes = services
        .rasterizer
        .rasterize(&svg, options.scale)
        .map_err(|e| format!("failed to rasterize diagram: {e}"))?;
    Ok(Payload {
        bytes,
        source: format!("{} diagram", options.language),
    })
}

fn first_line(source: &str) -> String {
    source.lines().next().unwrap_or_default().trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::Fakes;
    use pretty_assertions::assert_eq;
    use zhimark_renderer::parse;

    #[test]
    fn test_diagram_becomes_image() {
        let fakes = Fakes::new();
        let document = parse("```mermaid\ngraph TD; A-->B\n```\n\n```rust\nfn main() {}\n```");
        let (document, warnings) =
            render_diagrams(document, &DiagramOptions::default(), &fakes.services());

        assert!(warnings.is_empty());
        let NodeKind::Image { hint: Some(hint), .. } = &document.children[0].kind else {
            panic!("expected image, got {:?}", document.children[0].kind);
        };
        assert_eq!(hint.caption, "");
        assert!(matches!(document.children[1].kind, NodeKind::Code { .. }));
        assert_eq!(fakes.uploader.count(), 1);
    }

    #[test]
    fn test_theme_applied_before_rasterizing() {
        let fakes = Fakes::new();
        let options = DiagramOptions {
            theme: BTreeMap::from([("text-normal".to_owned(), "#123456".to_owned())]),
            ..DiagramOptions::default()
        };
        let document = parse("```mermaid\ngraph TD; A-->B\n```");
        let _ = render_diagrams(document, &options, &fakes.services());

        let rasterized = fakes.rasterized.lock().unwrap();
        assert_eq!(rasterized.len(), 1);
        assert!(rasterized[0].contains("#123456"));
        assert!(!rasterized[0].contains("var("));
    }

    #[test]
    fn test_failed_diagram_stays_code() {
        let fakes = Fakes::new();
        let document = parse("```mermaid\nerror here\n```");
        let (resolved, warnings) =
            render_diagrams(document.clone(), &DiagramOptions::default(), &fakes.services());

        assert_eq!(resolved, document);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].subject, "error here");
    }

    #[test]
    fn test_custom_language_tag() {
        let fakes = Fakes::new();
        let options = DiagramOptions {
            language: "mmd".to_owned(),
            ..DiagramOptions::default()
        };
        let document = parse("```mermaid\ngraph TD; A-->B\n```\n\n```mmd\ngraph LR; X-->Y\n```");
        let (document, _) = render_diagrams(document, &options, &fakes.services());
        assert!(matches!(document.children[0].kind, NodeKind::Code { .. }));
        assert!(matches!(document.children[1].kind, NodeKind::Image { .. }));
    }
}

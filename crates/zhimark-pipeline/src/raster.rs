//! SVG rasterization with resvg.

use resvg::{tiny_skia, usvg};

use crate::services::{RasterError, Rasterizer};

/// [`Rasterizer`] backed by resvg, using the system fonts.
pub struct ResvgRasterizer {
    options: usvg::Options<'static>,
}

impl ResvgRasterizer {
    /// Create a rasterizer. Loads the system font database once.
    #[must_use]
    pub fn new() -> Self {
        let mut options = usvg::Options::default();
        options.fontdb_mut().load_system_fonts();
        Self { options }
    }
}

impl Default for ResvgRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Pixel size of `natural` scaled by `scale`: rounded up, at least 1.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn scaled_size(natural: f32, scale: f32) -> u32 {
    let size = (natural * scale).ceil();
    if size.is_finite() && size >= 1.0 {
        size as u32
    } else {
        1
    }
}

impl Rasterizer for ResvgRasterizer {
    fn rasterize(&self, svg: &str, scale: f32) -> Result<Vec<u8>, RasterError> {
        let tree = usvg::Tree::from_str(svg, &self.options)
            .map_err(|e| RasterError::Parse(e.to_string()))?;

        let size = tree.size();
        let width = scaled_size(size.width(), scale);
        let height = scaled_size(size.height(), scale);

        let mut pixmap =
            tiny_skia::Pixmap::new(width, height).ok_or(RasterError::Size { width, height })?;
        resvg::render(
            &tree,
            tiny_skia::Transform::from_scale(scale, scale),
            &mut pixmap.as_mut(),
        );
        pixmap
            .encode_png()
            .map_err(|e| RasterError::Encode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::image_dimensions;
    use pretty_assertions::assert_eq;

    const SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="5" viewBox="0 0 10 5"><rect width="10" height="5" fill="#09c"/></svg>"##;

    #[test]
    fn test_scaled_size() {
        assert_eq!(scaled_size(10.0, 1.0), 10);
        assert_eq!(scaled_size(10.0, 1.25), 13);
        assert_eq!(scaled_size(0.2, 0.5), 1);
        assert_eq!(scaled_size(0.0, 2.0), 1);
    }

    #[test]
    fn test_rasterize_scales_output() {
        let rasterizer = ResvgRasterizer::new();
        let png = rasterizer.rasterize(SVG, 2.0).unwrap();
        assert!(png.starts_with(b"\x89PNG"));
        assert_eq!(image_dimensions(&png), Some((20, 10)));
    }

    #[test]
    fn test_invalid_svg_is_error() {
        let rasterizer = ResvgRasterizer::new();
        assert!(matches!(
            rasterizer.rasterize("<not-svg", 1.0),
            Err(RasterError::Parse(_))
        ));
    }
}

//! Render pipeline for zhimark.
//!
//! This crate turns extended markdown into the HTML dialect accepted by the
//! Zhihu article editor:
//! - Parsing and syntax extensions from `zhimark-renderer`
//! - Typst math conversion to TeX and typesetting to images
//! - Diagram rendering via Kroki, rasterized with resvg
//! - Image loading from the web or a local vault, with content-addressed
//!   upload and a persistent image cache
//!
//! # Architecture
//!
//! - [`services`]: collaborator traits (`Fetcher`, `FileLookup`, `Uploader`,
//!   `DiagramRenderer`, `Rasterizer`, `Typesetter`)
//! - [`pipeline`]: [`render_to_html`] and its options
//! - `formula`, `diagram`, `image`: transform stages, each a
//!   `Document -> Document` function run in parallel on rayon
//! - Default collaborators: [`HttpFetcher`], [`Vault`],
//!   [`DirectoryUploader`], [`KrokiRenderer`], [`ResvgRasterizer`],
//!   [`TypstCli`] and the image caches
//!
//! # Example
//!
//! ```no_run
//! use zhimark_pipeline::{
//!     DirectoryUploader, FileImageCache, HttpFetcher, KrokiRenderer, RenderOptions,
//!     ResvgRasterizer, Services, TypstCli, Vault, render_to_html,
//! };
//! use std::time::Duration;
//!
//! let vault = Vault::open("notes");
//! let fetcher = HttpFetcher::default();
//! let uploader = DirectoryUploader::new("out/images", "https://picx.zhimg.com");
//! let cache = FileImageCache::new(".zhimark/cache".into());
//! let kroki = KrokiRenderer::mermaid("https://kroki.io", Duration::from_secs(30));
//! let rasterizer = ResvgRasterizer::new();
//! let typst = TypstCli::new("typst");
//!
//! let services = Services {
//!     fetcher: &fetcher,
//!     files: &vault,
//!     uploader: &uploader,
//!     cache: &cache,
//!     diagrams: &kroki,
//!     rasterizer: &rasterizer,
//!     typesetter: &typst,
//!     links: &vault,
//!     document_path: None,
//! };
//! let rendered = render_to_html("# Hello", &RenderOptions::default(), &services).unwrap();
//! assert!(rendered.html.starts_with("<h2>"));
//! ```

mod cache;
mod diagram;
mod fetch;
mod formula;
mod image;
mod kroki;
mod offline;
pub mod pipeline;
mod publish;
mod raster;
pub mod services;
mod stage;
mod theme;
mod typeset;
mod typst;
mod upload;
mod vault;
mod warning;

pub use cache::{
    CACHE_VERSION, FileImageCache, ImageCache, ImageState, ImageStatus, MemoryImageCache,
    NullImageCache,
};
pub use diagram::{DiagramOptions, render_diagrams};
pub use fetch::{DEFAULT_USER_AGENT, HttpFetcher};
pub use formula::{DEFAULT_PRESET_STYLE, FormulaOptions, resolve_formulas};
pub use image::{ImageOptions, resolve_images};
pub use kroki::{DEFAULT_KROKI_URL, KrokiRenderer};
pub use offline::{Localized, localize_images, offline_path};
pub use pipeline::{RenderError, RenderOptions, Rendered, Services, Stage, render_to_html};
pub use publish::{content_hash, image_dimensions, image_extension};
pub use raster::{ResvgRasterizer, scaled_size};
pub use services::{
    DiagramError, DiagramRenderer, FetchError, Fetcher, FileLookup, LinkResolver, LookupError,
    RasterError, Rasterizer, TypesetError, Typesetter, UploadError, UploadedImage, Uploader,
};
pub use theme::resolve_theme_vars;
pub use typeset::TypstCli;
pub use typst::{ConversionError, typst_to_tex};
pub use upload::{DEFAULT_BASE_URL, DirectoryUploader, object_name};
pub use vault::{IMAGE_EXTENSIONS, Vault, has_image_extension};
pub use warning::Warning;

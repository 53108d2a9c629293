//! Collaborator interfaces consumed by the pipeline.
//!
//! Every I/O capability the pipeline needs sits behind one of these traits.
//! Default implementations live in the sibling modules; tests use fakes.

use std::path::{Path, PathBuf};

pub use zhimark_renderer::LinkResolver;

/// Error fetching remote content.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("I/O error: {0}")]
    Io(String),
}

/// Error resolving or reading a local file.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("no file matches '{0}'")]
    NotFound(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error uploading an image.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("upload rejected: {0}")]
    Rejected(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error rendering a diagram to vector markup.
#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("invalid SVG: {0}")]
    InvalidSvg(String),
}

/// Error rasterizing vector markup.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("failed to parse SVG: {0}")]
    Parse(String),
    #[error("invalid raster size {width}x{height}")]
    Size { width: u32, height: u32 },
    #[error("failed to encode PNG: {0}")]
    Encode(String),
}

/// Error running the external typesetter.
#[derive(Debug, thiserror::Error)]
pub enum TypesetError {
    #[error("typesetter binary is not configured")]
    NotConfigured,
    #[error("failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("typesetter failed: {0}")]
    Failed(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a successful upload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadedImage {
    /// Canonical remote URL.
    pub url: String,
    /// Dimensions reported by the host. Override the locally decoded ones.
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub watermark_src: Option<String>,
    pub private_watermark_src: Option<String>,
}

impl UploadedImage {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// Retrieves remote content.
pub trait Fetcher: Send + Sync {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Resolves local image references and reads files.
pub trait FileLookup: Send + Sync {
    /// Resolve `name` to a file path.
    ///
    /// `context` is the document the reference appears in; names starting
    /// with `./` or `../` resolve relative to it. Among several candidates
    /// an exact path match wins, then the shortest path, then the most
    /// recently modified file.
    fn resolve_local_reference(
        &self,
        name: &str,
        context: Option<&Path>,
    ) -> Result<PathBuf, LookupError>;

    fn read_local_file(&self, path: &Path) -> Result<Vec<u8>, LookupError>;
}

/// Uploads image bytes and returns their remote location.
///
/// Must be idempotent for identical bytes.
pub trait Uploader: Send + Sync {
    /// Upload `bytes`. `hash` is the MD5 hex digest of the bytes and
    /// `extension` the detected file extension.
    fn upload_image(
        &self,
        bytes: &[u8],
        hash: &str,
        extension: &str,
    ) -> Result<UploadedImage, UploadError>;
}

/// Renders diagram source to SVG markup.
pub trait DiagramRenderer: Send + Sync {
    fn render_to_vector(&self, source: &str) -> Result<String, DiagramError>;
}

/// Rasterizes SVG markup to PNG bytes.
pub trait Rasterizer: Send + Sync {
    /// Output size is the SVG's natural size times `scale`, rounded up and
    /// at least one pixel.
    fn rasterize(&self, svg: &str, scale: f32) -> Result<Vec<u8>, RasterError>;
}

/// Compiles math markup to a PNG through an external typesetter.
pub trait Typesetter: Send + Sync {
    /// Typeset `source` preceded by `style_header` at `ppi`.
    fn typeset_to_raster(
        &self,
        source: &str,
        style_header: &str,
        ppi: u32,
    ) -> Result<Vec<u8>, TypesetError>;

    /// Version string of the typesetter. Used to check the configuration
    /// once per render.
    fn version(&self) -> Result<String, TypesetError>;
}

//! CLI error types.

use zhimark_config::ConfigError;
use zhimark_pipeline::{RenderError, TypesetError};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Render(#[from] RenderError),

    #[error("{0}")]
    Typeset(#[from] TypesetError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

//! `typst-version` command implementation.

use std::path::PathBuf;

use clap::Args;
use zhimark_config::{CliSettings, Config};
use zhimark_pipeline::{Typesetter, TypstCli};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the typst-version command.
#[derive(Args)]
pub(crate) struct TypstVersionArgs {
    /// Path to configuration file (default: auto-discover zhimark.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Typst binary to run instead of the configured one.
    #[arg(long, env = "ZHIMARK_TYPST_BINARY")]
    typst_binary: Option<String>,
}

impl TypstVersionArgs {
    /// Execute the typst-version command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or the binary cannot be run.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let cli_settings = CliSettings {
            typst_binary: self.typst_binary,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let typst = TypstCli::new(config.typst.binary.clone());
        let version = typst.version()?;

        let output = Output::new();
        output.info(&format!("Binary: {}", config.typst.binary));
        output.success(&format!("typst {version}"));
        Ok(())
    }
}

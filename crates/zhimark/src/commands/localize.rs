//! `localize` command implementation.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use zhimark_config::{CliSettings, Config};
use zhimark_pipeline::{HttpFetcher, localize_images};

use crate::error::CliError;
use crate::output::{Output, write_result};

/// Arguments for the localize command.
#[derive(Args)]
pub(crate) struct LocalizeArgs {
    /// Markdown note whose web images are downloaded.
    file: PathBuf,

    /// Path to configuration file (default: auto-discover zhimark.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Vault root receiving the downloaded images.
    #[arg(long)]
    vault: Option<PathBuf>,

    /// Folder inside the vault for downloaded images.
    #[arg(long, default_value = "assets/web")]
    folder: String,

    /// Rewrite the note in place.
    #[arg(short, long, conflicts_with = "output")]
    in_place: bool,

    /// Write the rewritten note to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl LocalizeArgs {
    /// Execute the localize command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or the note cannot be
    /// read or written. Failed downloads are reported as warnings.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let cli_settings = CliSettings {
            vault_root: self.vault,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let source = std::fs::read_to_string(&self.file)?;

        let fetcher = HttpFetcher::new(
            config.http.user_agent.clone(),
            Duration::from_secs(config.http.timeout),
        );
        let localized = localize_images(
            &source,
            &fetcher,
            &config.vault_resolved.root,
            &self.folder,
        );

        let target = if self.in_place {
            Some(self.file.as_path())
        } else {
            self.output.as_deref()
        };
        write_result(target, &localized.markdown)?;
        tracing::info!(
            file = %self.file.display(),
            saved = localized.saved.len(),
            failed = localized.warnings.len(),
            "localized web images"
        );

        let output = Output::new();
        output.warnings(&localized.warnings);
        output.success(&format!(
            "Saved {} image(s) under {}",
            localized.saved.len(),
            config.vault_resolved.root.join(&self.folder).display()
        ));
        Ok(())
    }
}

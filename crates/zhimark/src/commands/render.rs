//! `render` command implementation.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use zhimark_config::{CliSettings, Config};
use zhimark_pipeline::{
    DirectoryUploader, FileImageCache, HttpFetcher, ImageCache, KrokiRenderer, NullImageCache,
    RenderOptions, ResvgRasterizer, Services, TypstCli, Vault, render_to_html,
};
use zhimark_renderer::{
    extend_autolinks, extend_breaks, extend_callouts, extend_math, extend_wiki_links, parse,
};

use crate::error::CliError;
use crate::output::{Output, write_result};

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown note to render.
    file: PathBuf,

    /// Path to configuration file (default: auto-discover zhimark.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Vault root used to resolve embeds and wiki links.
    #[arg(long)]
    vault: Option<PathBuf>,

    /// Write HTML to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the extended syntax tree as JSON instead of rendering.
    #[arg(long)]
    tree: bool,

    /// Kroki server URL for diagram rendering.
    #[arg(long, env = "ZHIMARK_KROKI_URL")]
    kroki_url: Option<String>,

    /// Typeset math and typst blocks to images.
    #[arg(long, conflicts_with = "no_typst")]
    typst: bool,

    /// Never typeset, even if enabled in configuration.
    #[arg(long)]
    no_typst: bool,

    /// Disable the image cache.
    #[arg(long)]
    no_cache: bool,

    /// Directory receiving uploaded images.
    #[arg(long)]
    upload_dir: Option<PathBuf>,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid, the note cannot be read,
    /// or the output cannot be written.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let cli_settings = CliSettings {
            vault_root: self.vault.clone(),
            kroki_url: self.kroki_url.clone(),
            typst_enabled: self.typst_enabled(),
            cache_enabled: self.no_cache.then_some(false),
            upload_dir: self.upload_dir.clone(),
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::info!(
            config = ?config.config_path,
            vault = %config.vault_resolved.root.display(),
            typst = config.typst.enabled,
            "loaded configuration"
        );
        let source = std::fs::read_to_string(&self.file)?;

        if self.tree {
            let document = extend_wiki_links(extend_math(parse(&source)));
            let document = extend_breaks(extend_callouts(extend_autolinks(document)));
            let json = serde_json::to_string_pretty(&document)?;
            return write_result(self.output.as_deref(), &json);
        }

        let output = Output::new();
        if let Some(path) = &config.config_path {
            output.info(&format!("Using {}", path.display()));
        }

        let fetcher = HttpFetcher::new(
            config.http.user_agent.clone(),
            Duration::from_secs(config.http.timeout),
        );
        let vault = Vault::open(config.vault_resolved.root.clone());
        let uploader = DirectoryUploader::new(
            config.upload_resolved.dir.clone(),
            &config.upload_resolved.base_url,
        );
        let cache: Box<dyn ImageCache> = match config.cache_dir() {
            Some(dir) => Box::new(FileImageCache::new(dir.to_path_buf())),
            None => Box::new(NullImageCache),
        };
        let kroki = KrokiRenderer::mermaid(
            &config.diagrams.kroki_url,
            Duration::from_secs(config.diagrams.timeout),
        );
        let rasterizer = ResvgRasterizer::new();
        let typst = TypstCli::new(config.typst.binary.clone());

        let services = Services {
            fetcher: &fetcher,
            files: &vault,
            uploader: &uploader,
            cache: cache.as_ref(),
            diagrams: &kroki,
            rasterizer: &rasterizer,
            typesetter: &typst,
            links: &vault,
            document_path: Some(self.file.as_path()),
        };

        let rendered = render_to_html(&source, &render_options(&config), &services)?;
        write_result(self.output.as_deref(), &rendered.html)?;
        tracing::info!(
            file = %self.file.display(),
            bytes = rendered.html.len(),
            warnings = rendered.warnings.len(),
            "rendered note"
        );

        output.warnings(&rendered.warnings);
        if let Some(path) = &self.output {
            output.success(&format!("Rendered {} to {}", self.file.display(), path.display()));
        }
        Ok(())
    }

    fn typst_enabled(&self) -> Option<bool> {
        if self.typst {
            Some(true)
        } else if self.no_typst {
            Some(false)
        } else {
            None
        }
    }
}

/// Map the loaded configuration onto pipeline options.
fn render_options(config: &Config) -> RenderOptions {
    RenderOptions {
        use_image_name_as_caption: config.render.image_name_as_caption,
        use_dialect_headings: config.render.dialect_headings,
        typesetting_enabled: config.typst.enabled,
        display_math_as_tex: config.typst.display_as_tex,
        preset_style: config.typst.preset_style.clone(),
        typeset_ppi: config.typst.ppi,
        typeset_language_tag: config.typst.language.clone(),
        diagram_scale_factor: config.diagrams.scale,
        diagram_render_language_tag: config.diagrams.language.clone(),
        diagram_theme: config.diagrams.theme.clone(),
    }
}

//! Configuration management for zhimark.
//!
//! Parses `zhimark.toml` with serde and discovers it in parent directories
//! when no explicit path is given. CLI settings are applied last via
//! [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String values support `${VAR}` and `${VAR:-default}`. Expanded fields:
//! - `typst.binary`
//! - `diagrams.kroki_url`
//! - `vault.root`
//! - `upload.dir`
//! - `upload.base_url`
//! - `cache.dir`
//! - `http.user_agent`
//!
//! Path fields additionally expand a leading `~` and are resolved relative to
//! the directory holding the config file.

mod expand;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "zhimark.toml";

/// Project data directory created next to the config file.
const PROJECT_DIR: &str = ".zhimark";

/// Default document preamble for typeset formulas: a page that fits its
/// content.
pub const DEFAULT_PRESET_STYLE: &str =
    "#set page(width: auto, height: auto, margin: 8pt)\n#set text(size: 12pt)";

/// CLI settings that override configuration file values.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override vault root directory.
    pub vault_root: Option<PathBuf>,
    /// Override Kroki URL for diagram rendering.
    pub kroki_url: Option<String>,
    /// Force typesetting on or off.
    pub typst_enabled: Option<bool>,
    /// Override the typesetting binary.
    pub typst_binary: Option<String>,
    /// Override cache enabled flag.
    pub cache_enabled: Option<bool>,
    /// Override the upload staging directory.
    pub upload_dir: Option<PathBuf>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Emitter behaviour.
    pub render: RenderConfig,
    /// Formula typesetting.
    pub typst: TypstConfig,
    /// Diagram rendering.
    pub diagrams: DiagramsConfig,
    /// HTTP client settings.
    pub http: HttpConfig,
    vault: VaultConfigRaw,
    upload: UploadConfigRaw,
    cache: CacheConfigRaw,

    /// Resolved vault configuration (set after loading).
    #[serde(skip)]
    pub vault_resolved: VaultConfig,
    /// Resolved upload configuration (set after loading).
    #[serde(skip)]
    pub upload_resolved: UploadConfig,
    /// Resolved cache configuration (set after loading).
    #[serde(skip)]
    pub cache_resolved: CacheConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Emitter configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Fall back to the image URL or file name when an image has no alt text.
    pub image_name_as_caption: bool,
    /// Map headings onto the two levels the platform supports.
    pub dialect_headings: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            image_name_as_caption: false,
            dialect_headings: true,
        }
    }
}

/// Formula typesetting configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TypstConfig {
    /// Treat math as Typst and run the formula transform.
    pub enabled: bool,
    /// Convert display math to TeX instead of typesetting it to an image.
    pub display_as_tex: bool,
    /// Header prepended to every typeset document.
    pub preset_style: String,
    /// Typesetting binary name or path.
    pub binary: String,
    /// Output resolution.
    pub ppi: u32,
    /// Code block language rendered as a typeset image.
    pub language: String,
}

impl Default for TypstConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            display_as_tex: true,
            preset_style: DEFAULT_PRESET_STYLE.to_owned(),
            binary: "typst".to_owned(),
            ppi: 300,
            language: "typrender".to_owned(),
        }
    }
}

/// Diagram rendering configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DiagramsConfig {
    /// Code block language rendered as a diagram.
    pub language: String,
    /// Rasterization scale relative to the diagram's natural size.
    pub scale: f32,
    /// Kroki server URL.
    pub kroki_url: String,
    /// Kroki request timeout in seconds.
    pub timeout: u64,
    /// Concrete values for `var(--name)` references in rendered SVG.
    pub theme: BTreeMap<String, String>,
}

impl Default for DiagramsConfig {
    fn default() -> Self {
        Self {
            language: "mermaid".to_owned(),
            scale: 1.0,
            kroki_url: "https://kroki.io".to_owned(),
            timeout: 30,
            theme: BTreeMap::new(),
        }
    }
}

/// HTTP client configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User agent sent with image downloads.
    pub user_agent: String,
    /// Request timeout in seconds.
    pub timeout: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("zhimark/", env!("CARGO_PKG_VERSION")).to_owned(),
            timeout: 30,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct VaultConfigRaw {
    root: Option<String>,
}

/// Resolved vault configuration.
#[derive(Debug, Default)]
pub struct VaultConfig {
    /// Directory searched for local images and linked notes.
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct UploadConfigRaw {
    dir: Option<String>,
    base_url: Option<String>,
}

/// Resolved upload configuration.
#[derive(Debug, Default)]
pub struct UploadConfig {
    /// Staging directory for content-addressed uploads.
    pub dir: PathBuf,
    /// Public URL prefix the staged files are served from.
    pub base_url: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CacheConfigRaw {
    enabled: Option<bool>,
    dir: Option<String>,
}

/// Resolved image cache configuration.
#[derive(Debug, Default)]
pub struct CacheConfig {
    /// Whether upload results are persisted between runs.
    pub enabled: bool,
    /// Cache directory.
    pub dir: PathBuf,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`upload.base_url`").
        field: String,
        /// Error message (e.g., "${`CDN_HOST`} not set").
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise searches
    /// for `zhimark.toml` in the current directory and its parents, falling
    /// back to defaults rooted at the current directory.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// an environment reference is unset, or validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(root) = &settings.vault_root {
            self.vault_resolved.root.clone_from(root);
        }
        if let Some(kroki_url) = &settings.kroki_url {
            self.diagrams.kroki_url.clone_from(kroki_url);
        }
        if let Some(enabled) = settings.typst_enabled {
            self.typst.enabled = enabled;
        }
        if let Some(binary) = &settings.typst_binary {
            self.typst.binary.clone_from(binary);
        }
        if let Some(enabled) = settings.cache_enabled {
            self.cache_resolved.enabled = enabled;
        }
        if let Some(dir) = &settings.upload_dir {
            self.upload_resolved.dir.clone_from(dir);
        }
    }

    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    fn default_with_base(base: &Path) -> Self {
        Self {
            render: RenderConfig::default(),
            typst: TypstConfig::default(),
            diagrams: DiagramsConfig::default(),
            http: HttpConfig::default(),
            vault: VaultConfigRaw::default(),
            upload: UploadConfigRaw::default(),
            cache: CacheConfigRaw::default(),
            vault_resolved: VaultConfig {
                root: base.to_path_buf(),
            },
            upload_resolved: UploadConfig {
                dir: base.join(PROJECT_DIR).join("images"),
                base_url: default_base_url(),
            },
            cache_resolved: CacheConfig {
                enabled: true,
                dir: base.join(PROJECT_DIR).join("cache"),
            },
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_typst()?;
        self.validate_diagrams()?;
        require_http_url(&self.upload_resolved.base_url, "upload.base_url")?;
        if self.http.timeout == 0 {
            return Err(ConfigError::Validation(
                "http.timeout must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_typst(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.typst.language, "typst.language")?;
        if self.typst.ppi == 0 {
            return Err(ConfigError::Validation(
                "typst.ppi must be greater than 0".to_owned(),
            ));
        }
        // An empty binary is reported by the typesetting check at render time.
        Ok(())
    }

    fn validate_diagrams(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.diagrams.language, "diagrams.language")?;
        require_non_empty(&self.diagrams.kroki_url, "diagrams.kroki_url")?;
        require_http_url(&self.diagrams.kroki_url, "diagrams.kroki_url")?;

        let scale = self.diagrams.scale;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ConfigError::Validation(
                "diagrams.scale must be a positive number".to_owned(),
            ));
        }
        if self.diagrams.timeout == 0 {
            return Err(ConfigError::Validation(
                "diagrams.timeout must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.typst.binary = expand::expand_env(&self.typst.binary, "typst.binary")?;
        self.diagrams.kroki_url =
            expand::expand_env(&self.diagrams.kroki_url, "diagrams.kroki_url")?;
        self.http.user_agent = expand::expand_env(&self.http.user_agent, "http.user_agent")?;

        expand_optional(&mut self.vault.root, "vault.root")?;
        expand_optional(&mut self.upload.dir, "upload.dir")?;
        expand_optional(&mut self.upload.base_url, "upload.base_url")?;
        expand_optional(&mut self.cache.dir, "cache.dir")?;

        Ok(())
    }

    /// Resolve relative paths against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| match path {
            Some(p) => config_dir.join(expand::expand_tilde(p)),
            None => config_dir.join(default),
        };

        self.vault_resolved = VaultConfig {
            root: self.vault.root.as_deref().map_or_else(
                || config_dir.to_path_buf(),
                |p| config_dir.join(expand::expand_tilde(p)),
            ),
        };
        self.upload_resolved = UploadConfig {
            dir: resolve(self.upload.dir.as_deref(), ".zhimark/images"),
            base_url: self
                .upload
                .base_url
                .as_deref()
                .map_or_else(default_base_url, |url| url.trim_end_matches('/').to_owned()),
        };
        self.cache_resolved = CacheConfig {
            enabled: self.cache.enabled.unwrap_or(true),
            dir: resolve(self.cache.dir.as_deref(), ".zhimark/cache"),
        };
    }

    /// Cache directory when caching is enabled.
    #[must_use]
    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_resolved
            .enabled
            .then_some(self.cache_resolved.dir.as_path())
    }
}

fn expand_optional(value: &mut Option<String>, field: &str) -> Result<(), ConfigError> {
    if let Some(raw) = value {
        *raw = expand::expand_env(raw, field)?;
    }
    Ok(())
}

fn default_base_url() -> String {
    "https://picx.zhimg.com".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/vault"));
        assert!(config.render.dialect_headings);
        assert!(!config.render.image_name_as_caption);
        assert!(!config.typst.enabled);
        assert!(config.typst.display_as_tex);
        assert_eq!(config.typst.language, "typrender");
        assert_eq!(config.diagrams.language, "mermaid");
        assert_eq!(config.vault_resolved.root, PathBuf::from("/vault"));
        assert_eq!(
            config.upload_resolved.dir,
            PathBuf::from("/vault/.zhimark/images")
        );
        assert_eq!(config.cache_dir(), Some(Path::new("/vault/.zhimark/cache")));
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.diagrams.kroki_url, "https://kroki.io");
        assert_eq!(config.typst.ppi, 300);
    }

    #[test]
    fn test_parse_sections() {
        let toml = r##"
[render]
image_name_as_caption = true
dialect_headings = false

[typst]
enabled = true
display_as_tex = false
ppi = 144

[diagrams]
scale = 2.5

[diagrams.theme]
"--primary-color" = "#ffffff"
"##;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.render.image_name_as_caption);
        assert!(!config.render.dialect_headings);
        assert!(config.typst.enabled);
        assert!(!config.typst.display_as_tex);
        assert_eq!(config.typst.ppi, 144);
        assert!((config.diagrams.scale - 2.5).abs() < f32::EPSILON);
        assert_eq!(
            config.diagrams.theme.get("--primary-color").map(String::as_str),
            Some("#ffffff")
        );
    }

    #[test]
    fn test_load_resolves_paths_relative_to_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
[vault]
root = "notes"

[upload]
dir = "out"
base_url = "https://cdn.example.com/"

[cache]
enabled = false
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.vault_resolved.root, tmp.path().join("notes"));
        assert_eq!(config.upload_resolved.dir, tmp.path().join("out"));
        assert_eq!(config.upload_resolved.base_url, "https://cdn.example.com");
        assert_eq!(config.cache_dir(), None);
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/zhimark.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_rejects_non_positive_scale() {
        let mut config = Config::default_with_base(Path::new("/vault"));
        config.diagrams.scale = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("diagrams.scale"));
    }

    #[test]
    fn test_rejects_non_http_kroki_url() {
        let mut config = Config::default_with_base(Path::new("/vault"));
        config.diagrams.kroki_url = "kroki.io".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("diagrams.kroki_url"));
    }

    #[test]
    fn test_rejects_empty_language() {
        let mut config = Config::default_with_base(Path::new("/vault"));
        config.typst.language = " ".to_owned();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/vault"));
        let settings = CliSettings {
            vault_root: Some(PathBuf::from("/other")),
            typst_enabled: Some(true),
            typst_binary: Some("/opt/typst".to_owned()),
            cache_enabled: Some(false),
            ..Default::default()
        };

        config.apply_cli_settings(&settings);

        assert_eq!(config.vault_resolved.root, PathBuf::from("/other"));
        assert!(config.typst.enabled);
        assert_eq!(config.typst.binary, "/opt/typst");
        assert_eq!(config.cache_dir(), None);
        assert_eq!(config.diagrams.kroki_url, "https://kroki.io");
    }
}

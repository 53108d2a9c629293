//! Local note vault: file lookup and published-link discovery.
//!
//! A [`Vault`] indexes every non-hidden file under its root once, on
//! [`Vault::open`]. Image references and wiki-link targets are resolved
//! against that index.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use ignore::WalkBuilder;
use serde::Deserialize;
use zhimark_renderer::LinkResolver;

use crate::services::{FileLookup, LookupError};

/// Extensions of files local image references may resolve to.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

#[derive(Debug)]
struct VaultFile {
    path: PathBuf,
    /// Root-relative path with `/` separators, lower-cased.
    key: String,
    modified: SystemTime,
}

impl VaultFile {
    fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    fn is_markdown(&self) -> bool {
        self.key.ends_with(".md")
    }

    fn is_image(&self) -> bool {
        has_image_extension(&self.key)
    }
}

/// Directory of markdown notes and attachments.
#[derive(Debug)]
pub struct Vault {
    root: PathBuf,
    files: Vec<VaultFile>,
}

/// Front matter of a note. Only the published URL is read.
#[derive(Deserialize)]
struct FrontMatter {
    #[serde(rename = "zhihu-link")]
    link: Option<String>,
}

impl Vault {
    /// Index all files under `root`. Hidden files and directories are
    /// skipped.
    #[must_use]
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let mut files = Vec::new();
        let walker = WalkBuilder::new(&root)
            .standard_filters(false)
            .hidden(true)
            .build();
        for entry in walker.filter_map(Result::ok) {
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.into_path();
            let Ok(relative) = path.strip_prefix(&root) else {
                continue;
            };
            let key = relative_key(relative);
            let modified = fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            files.push(VaultFile {
                path,
                key,
                modified,
            });
        }
        files.sort_by(|a, b| a.key.cmp(&b.key));
        tracing::debug!(root = %root.display(), files = files.len(), "indexed vault");
        Self { root, files }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of indexed files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Best match for `name` among files accepted by `filter`.
    fn find(&self, name: &str, filter: impl Fn(&VaultFile) -> bool) -> Option<&VaultFile> {
        let name = name.trim().replace('\\', "/").to_lowercase();
        let name = name.trim_start_matches('/');
        if name.is_empty() {
            return None;
        }

        let candidates = self.files.iter().filter(|f| filter(*f));
        let mut matches: Vec<&VaultFile> = if name.contains('/') {
            if let Some(exact) = self.files.iter().find(|f| f.key == name && filter(*f)) {
                return Some(exact);
            }
            let suffix = format!("/{name}");
            candidates.filter(|f| f.key.ends_with(&suffix)).collect()
        } else {
            let prefix = format!("{name}.");
            candidates
                .filter(|f| f.file_name() == name || f.file_name().starts_with(&prefix))
                .collect()
        };

        matches.sort_by(|a, b| {
            a.key
                .chars()
                .count()
                .cmp(&b.key.chars().count())
                .then_with(|| b.modified.cmp(&a.modified))
                .then_with(|| a.key.cmp(&b.key))
        });
        matches.first().copied()
    }

    /// Published URL from a note's front matter, if set.
    #[must_use]
    pub fn published_link(&self, note: &Path) -> Option<String> {
        let content = fs::read_to_string(note).ok()?;
        let yaml = front_matter(&content)?;
        let parsed: FrontMatter = serde_yaml::from_str(yaml).ok()?;
        parsed
            .link
            .map(|link| link.trim().to_owned())
            .filter(|link| !link.is_empty())
    }
}

impl FileLookup for Vault {
    fn resolve_local_reference(
        &self,
        name: &str,
        context: Option<&Path>,
    ) -> Result<PathBuf, LookupError> {
        let relative = name.starts_with("./") || name.starts_with("../");
        if let (true, Some(context)) = (relative, context) {
            let base = context.parent().unwrap_or(&self.root);
            let path = normalize(&base.join(name));
            return if path.is_file() {
                Ok(path)
            } else {
                Err(LookupError::NotFound(name.to_owned()))
            };
        }

        let name = name.trim_start_matches("./");
        self.find(name, VaultFile::is_image)
            .map(|file| file.path.clone())
            .ok_or_else(|| LookupError::NotFound(name.to_owned()))
    }

    fn read_local_file(&self, path: &Path) -> Result<Vec<u8>, LookupError> {
        fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                LookupError::NotFound(path.display().to_string())
            } else {
                LookupError::Io {
                    path: path.to_owned(),
                    source,
                }
            }
        })
    }
}

impl LinkResolver for Vault {
    fn lookup_published_link(&self, name: &str) -> Option<String> {
        let note = self.find(name, VaultFile::is_markdown)?;
        self.published_link(&note.path)
    }
}

/// Whether `name` ends in one of [`IMAGE_EXTENSIONS`].
#[must_use]
pub fn has_image_extension(name: &str) -> bool {
    name.rsplit_once('.').is_some_and(|(_, ext)| {
        IMAGE_EXTENSIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext))
    })
}

/// YAML between a leading `---` line and the next `---` line.
fn front_matter(content: &str) -> Option<&str> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some(&rest[..offset]);
        }
        offset += line.len();
    }
    None
}

fn relative_key(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_lowercase()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolve `.` and `..` components lexically.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

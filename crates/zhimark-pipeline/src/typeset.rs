//! Typesetting through the `typst` command-line compiler.

use std::fs;
use std::process::{Command, Output};

use crate::services::{TypesetError, Typesetter};

const INPUT_FILE: &str = "main.typ";
const OUTPUT_FILE: &str = "out.png";

/// [`Typesetter`] that runs `typst compile` in a temporary directory.
///
/// The directory is removed when the call returns, successful or not.
pub struct TypstCli {
    binary: String,
}

impl TypstCli {
    /// Typesetter running `binary`. An empty binary is reported as
    /// [`TypesetError::NotConfigured`] on use.
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command(&self) -> Result<Command, TypesetError> {
        if self.binary.trim().is_empty() {
            return Err(TypesetError::NotConfigured);
        }
        Ok(Command::new(&self.binary))
    }

    fn run(&self, command: &mut Command) -> Result<Output, TypesetError> {
        let output = command.output().map_err(|source| TypesetError::Spawn {
            binary: self.binary.clone(),
            source,
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TypesetError::Failed(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }
        Ok(output)
    }
}

impl Typesetter for TypstCli {
    fn typeset_to_raster(
        &self,
        source: &str,
        style_header: &str,
        ppi: u32,
    ) -> Result<Vec<u8>, TypesetError> {
        let mut command = self.command()?;
        let dir = tempfile::Builder::new().prefix("zhimark-typst").tempdir()?;
        let input = dir.path().join(INPUT_FILE);
        let output = dir.path().join(OUTPUT_FILE);
        fs::write(&input, compose(style_header, source))?;

        command
            .arg("compile")
            .arg("--format")
            .arg("png")
            .arg("--ppi")
            .arg(ppi.to_string())
            .arg(&input)
            .arg(&output)
            .current_dir(dir.path());
        self.run(&mut command)?;

        let png = fs::read(&output)?;
        tracing::debug!(bytes = png.len(), ppi, "typeset formula");
        Ok(png)
    }

    fn version(&self) -> Result<String, TypesetError> {
        let mut command = self.command()?;
        command.arg("--version");
        let output = self.run(&mut command)?;
        Ok(parse_version(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Document text: style header, then the source on its own line.
fn compose(style_header: &str, source: &str) -> String {
    if style_header.is_empty() {
        source.to_owned()
    } else {
        format!("{style_header}\n{source}")
    }
}

/// Version number from `typst --version` output such as
/// `typst 0.13.1 (8ace67d9)`.
fn parse_version(stdout: &str) -> String {
    let line = stdout.lines().next().unwrap_or_default().trim();
    let line = line.strip_prefix("typst ").unwrap_or(line);
    line.split_whitespace().next().unwrap_or(line).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("typst 0.13.1 (8ace67d9)\n"), "0.13.1");
        assert_eq!(parse_version("0.12.0"), "0.12.0");
        assert_eq!(parse_version(""), "");
    }

    #[test]
    fn test_compose() {
        assert_eq!(compose("#set text(size: 12pt)", "$ x $"), "#set text(size: 12pt)\n$ x $");
        assert_eq!(compose("", "$ x $"), "$ x $");
    }

    #[test]
    fn test_empty_binary_is_not_configured() {
        let typst = TypstCli::new("");
        assert!(matches!(typst.version(), Err(TypesetError::NotConfigured)));
        assert!(matches!(
            typst.typeset_to_raster("$ x $", "", 300),
            Err(TypesetError::NotConfigured)
        ));
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let typst = TypstCli::new("zhimark-test-no-such-binary");
        assert!(matches!(typst.version(), Err(TypesetError::Spawn { .. })));
        assert!(matches!(
            typst.typeset_to_raster("$ x $", "", 300),
            Err(TypesetError::Spawn { .. })
        ));
    }
}

//! Resolution of CSS custom property references in diagram SVG.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static CSS_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"var\((--[\w-]+)(?:\s*,\s*([^)]*))?\)").unwrap());

/// Replace every `var(--name[, fallback])` in `svg` with a concrete value.
///
/// Names are looked up in `theme` with or without their leading `--`.
/// Unknown names take the fallback, or become empty without one.
#[must_use]
pub fn resolve_theme_vars(svg: &str, theme: &BTreeMap<String, String>) -> String {
    CSS_VAR
        .replace_all(svg, |caps: &Captures<'_>| {
            let name = &caps[1];
            theme
                .get(name)
                .or_else(|| theme.get(name.trim_start_matches("--")))
                .map(|value| value.trim().to_owned())
                .or_else(|| caps.get(2).map(|fallback| fallback.as_str().trim().to_owned()))
                .unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn theme() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("text-normal".to_owned(), "#222".to_owned()),
            ("--background-primary".to_owned(), " #fff ".to_owned()),
        ])
    }

    #[test]
    fn test_known_variables() {
        let svg = r#"<rect fill="var(--background-primary)" stroke="var(--text-normal)"/>"#;
        assert_eq!(
            resolve_theme_vars(svg, &theme()),
            r##"<rect fill="#fff" stroke="#222"/>"##
        );
    }

    #[test]
    fn test_fallback_and_unknown() {
        let svg = "color: var(--accent, #f00); border: var(--missing);";
        assert_eq!(
            resolve_theme_vars(svg, &theme()),
            "color: #f00; border: ;"
        );
    }

    #[test]
    fn test_known_variable_ignores_fallback() {
        assert_eq!(resolve_theme_vars("var(--text-normal, red)", &theme()), "#222");
    }

    #[test]
    fn test_no_variables_unchanged() {
        let svg = "<svg><text>var is a word</text></svg>";
        assert_eq!(resolve_theme_vars(svg, &theme()), svg);
    }
}

//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in a string.
///
/// Bare `$VAR` is left alone. A `${VAR}` without default fails when `VAR`
/// is unset.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, MissingVar> {
        std::env::var(var).map(Some).map_err(|_| MissingVar {
            name: var.to_owned(),
        })
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.name),
    })
}

/// Expand a leading `~` to the home directory.
pub(crate) fn expand_tilde(value: &str) -> String {
    shellexpand::tilde(value).into_owned()
}

struct MissingVar {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_passes_through() {
        assert_eq!(expand_env("https://kroki.io", "f").unwrap(), "https://kroki.io");
    }

    #[test]
    fn test_expand_set_var() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::set_var("ZHIMARK_TEST_KROKI_HOST", "kroki.internal");
        }
        let result = expand_env("https://${ZHIMARK_TEST_KROKI_HOST}/", "diagrams.kroki_url");
        assert_eq!(result.unwrap(), "https://kroki.internal/");
        unsafe {
            std::env::remove_var("ZHIMARK_TEST_KROKI_HOST");
        }
    }

    #[test]
    fn test_default_used_when_unset() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::remove_var("ZHIMARK_TEST_UNSET_AGENT");
        }
        let result = expand_env("${ZHIMARK_TEST_UNSET_AGENT:-zhimark}", "http.user_agent");
        assert_eq!(result.unwrap(), "zhimark");
    }

    #[test]
    fn test_missing_var_names_field() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::remove_var("ZHIMARK_TEST_MISSING");
        }
        let err = expand_env("${ZHIMARK_TEST_MISSING}", "upload.base_url").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        let message = err.to_string();
        assert!(message.contains("ZHIMARK_TEST_MISSING"));
        assert!(message.contains("upload.base_url"));
    }
}

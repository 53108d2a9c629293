//! Non-fatal problems reported by a render.

use std::fmt;

/// A node that could not be transformed and was left as it was.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Warning {
    /// Text identifying the node (URL, file name, formula).
    pub subject: String,
    pub message: String,
}

impl Warning {
    /// Create a warning and log it.
    pub(crate) fn new(subject: impl Into<String>, message: impl Into<String>) -> Self {
        let warning = Self {
            subject: subject.into(),
            message: message.into(),
        };
        tracing::warn!(subject = %warning.subject, "{}", warning.message);
        warning
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}

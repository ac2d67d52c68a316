//! A single diagnostic report raised by host code.

use crate::kind::DiagnosticKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A diagnostic reported to the [`DiagnosticHost`](crate::DiagnosticHost).
///
/// Carries the location that raised it (function, file, line), a short error
/// text, and the expression or condition that triggered it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostDiagnostic {
    /// Whether this is a warning or one of the error kinds.
    pub kind: DiagnosticKind,
    /// Name of the function that raised the diagnostic.
    pub function: String,
    /// Source file that raised the diagnostic.
    pub file: String,
    /// Line within `file`.
    pub line: u32,
    /// Short error code or text.
    pub error: String,
    /// The expression that triggered the diagnostic, if any.
    pub expression: String,
}

impl HostDiagnostic {
    /// Creates a diagnostic with an empty expression.
    pub fn new(
        kind: DiagnosticKind,
        function: impl Into<String>,
        file: impl Into<String>,
        line: u32,
        error: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            function: function.into(),
            file: file.into(),
            line,
            error: error.into(),
            expression: String::new(),
        }
    }

    /// Sets the triggering expression.
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = expression.into();
        self
    }
}

impl fmt::Display for HostDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({}:{} in {})",
            self.kind, self.error, self.file, self.line, self.function
        )?;
        if !self.expression.is_empty() {
            write!(f, " [{}]", self.expression)?;
        }
        Ok(())
    }
}

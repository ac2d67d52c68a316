//! Kinds of host diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a diagnostic raised by the host.
///
/// Only [`Warning`](DiagnosticKind::Warning) is treated as non-fatal; every
/// other kind is relayed as an error.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// A hard error raised by engine code.
    Error,
    /// A potential problem that did not stop the operation.
    Warning,
    /// An error raised while running a script.
    Script,
    /// An error raised while compiling a shader.
    Shader,
}

impl DiagnosticKind {
    /// Returns `true` if this kind is [`Warning`](DiagnosticKind::Warning).
    pub fn is_warning(self) -> bool {
        self == DiagnosticKind::Warning
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::Error => write!(f, "error"),
            DiagnosticKind::Warning => write!(f, "warning"),
            DiagnosticKind::Script => write!(f, "script error"),
            DiagnosticKind::Shader => write!(f, "shader error"),
        }
    }
}

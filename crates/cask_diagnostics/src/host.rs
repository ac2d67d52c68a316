//! The host's process-wide diagnostic system.

use crate::diagnostic::HostDiagnostic;
use crate::kind::DiagnosticKind;
use parking_lot::RwLock;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// A callback invoked for every diagnostic reported to a [`DiagnosticHost`].
pub type Handler = Arc<dyn Fn(&HostDiagnostic) + Send + Sync>;

/// Identifies a handler registered with a [`DiagnosticHost`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct HandlerId(u64);

/// Fan-out point for diagnostics raised anywhere in the host process.
///
/// Handlers are invoked in registration order. The handler list is snapshotted
/// before dispatch, so a handler may add or remove handlers (including itself)
/// without deadlocking.
pub struct DiagnosticHost {
    handlers: RwLock<Vec<(HandlerId, Handler)>>,
    next_id: AtomicU64,
}

impl DiagnosticHost {
    /// Creates a host with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Returns the process-wide host.
    pub fn global() -> &'static DiagnosticHost {
        static GLOBAL: OnceLock<DiagnosticHost> = OnceLock::new();
        GLOBAL.get_or_init(DiagnosticHost::new)
    }

    /// Registers a handler and returns the id needed to remove it.
    pub fn add_handler(&self, handler: Handler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push((id, handler));
        id
    }

    /// Removes a previously registered handler.
    ///
    /// Returns `false` if the id was not registered.
    pub fn remove_handler(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(hid, _)| *hid != id);
        handlers.len() != before
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Delivers a diagnostic to every registered handler.
    pub fn report(&self, diag: &HostDiagnostic) {
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();
        for handler in handlers {
            handler(diag);
        }
    }

    /// Reports an error, taking file and line from the caller.
    #[track_caller]
    pub fn error(&self, function: &str, error: &str, expression: &str) {
        self.report_at(DiagnosticKind::Error, function, error, expression, Location::caller());
    }

    /// Reports a warning, taking file and line from the caller.
    #[track_caller]
    pub fn warning(&self, function: &str, error: &str, expression: &str) {
        self.report_at(DiagnosticKind::Warning, function, error, expression, Location::caller());
    }

    fn report_at(
        &self,
        kind: DiagnosticKind,
        function: &str,
        error: &str,
        expression: &str,
        location: &Location<'_>,
    ) {
        let diag = HostDiagnostic::new(kind, function, location.file(), location.line(), error)
            .with_expression(expression);
        self.report(&diag);
    }
}

impl Default for DiagnosticHost {
    fn default() -> Self {
        Self::new()
    }
}

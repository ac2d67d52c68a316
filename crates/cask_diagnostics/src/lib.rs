//! Host diagnostic relay.
//!
//! The [`DiagnosticHost`] is the process-wide diagnostic system: code anywhere in
//! the host reports errors and warnings to it, and it fans each report out to the
//! registered handlers. An [`ErrorRelay`] registers one such handler for as long as
//! it lives and republishes every report as a discrete [`RelayEvent`] to its own
//! subscribers, either through callbacks or through a channel.

#![warn(missing_docs)]

pub mod diagnostic;
pub mod host;
pub mod kind;
pub mod relay;

pub use diagnostic::HostDiagnostic;
pub use host::{DiagnosticHost, HandlerId};
pub use kind::DiagnosticKind;
pub use relay::{ErrorRelay, RelayEvent, SubscriptionId};

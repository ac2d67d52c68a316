//! Parsing and validation of `cask.toml` import cache configuration files.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`CaskConfig`], then resolves it against a project directory into a
//! [`ResolvedCache`] with an absolute cache root, a layout policy, and
//! per-importer default options converted to [`Value`](cask_common::Value)s.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use resolve::{resolve_cache, ResolvedCache, ResolvedLayout};
pub use types::*;

//! Shared foundational types used across the Cask asset import cache.
//!
//! This crate provides the content fingerprint used for change detection and
//! the literal value type used for importer options and manifest metadata.

#![warn(missing_docs)]

pub mod hash;
pub mod value;

pub use hash::{ContentHash, ContentHasher, ParseHashError};
pub use value::{ParseValueError, Value};

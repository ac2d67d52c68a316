//! Option merging for a single import.

use cask_common::Value;
use tracing::debug;

use crate::importer::{ImportOption, OptionMap};

/// The option layers consulted for one import, highest precedence first.
#[derive(Debug, Default, Clone, Copy)]
pub struct OptionLayers<'a> {
    /// Values passed by the caller for this call.
    pub overrides: Option<&'a OptionMap>,
    /// Values recorded by the previous import with the same importer.
    pub persisted: Option<&'a OptionMap>,
    /// Per-importer defaults from the project configuration.
    pub configured: Option<&'a OptionMap>,
}

impl OptionLayers<'_> {
    /// Gives every declared option a value, in declaration order.
    ///
    /// Each option takes the first value found in the overrides, the
    /// persisted values, and the configured defaults, and falls back to its
    /// declared default. Keys that name no declared option are ignored.
    pub fn merge(&self, declared: &[ImportOption]) -> Vec<(String, Value)> {
        for layer in [self.overrides, self.configured].into_iter().flatten() {
            for key in layer.keys() {
                if !declared.iter().any(|o| &o.name == key) {
                    debug!(option = %key, "ignoring undeclared option");
                }
            }
        }

        declared
            .iter()
            .map(|option| {
                let value = [self.overrides, self.persisted, self.configured]
                    .into_iter()
                    .flatten()
                    .find_map(|layer| layer.get(&option.name))
                    .unwrap_or(&option.default);
                (option.name.clone(), value.clone())
            })
            .collect()
    }
}

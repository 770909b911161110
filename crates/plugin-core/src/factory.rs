use std::sync::Arc;

use crate::{Plugin, PluginSpec};

/// Entry point of a plugin crate for the bot's registry builder.
pub trait PluginFactory {
    /// Adds this plugin's default spec (id, enabled, default config) to
    /// `specs`. Specs already loaded from `config.yaml` come first, so a
    /// factory must leave an existing entry with its id alone.
    fn register_defaults(&self, specs: &mut Vec<PluginSpec>);

    #[must_use]
    fn build(&self) -> Arc<dyn Plugin>;
}

/// Appends `spec` only when no entry in `specs` has the same id, so
/// operator-supplied specs win over plugin defaults.
pub fn push_default(specs: &mut Vec<PluginSpec>, spec: PluginSpec) {
    if !specs.iter().any(|s| s.id == spec.id) {
        specs.push(spec);
    }
}

//! Static catalog of hook implementations.
//!
//! Plugins do not carry code; a manifest names the hook kind it exports and
//! the catalog maps that name to a constructor compiled into the binary.

use super::{Hook, PluginModule};
use crate::bridge::DiscordBridge;
use crate::config::Config;
use crate::error::HookError;
use crate::supervisor::SupervisorHandle;
use std::collections::HashMap;

/// Constructs a hook from its manifest, the supervisor handle and the process config.
pub type HookFactory =
    fn(&PluginModule, &SupervisorHandle, &Config) -> Result<Box<dyn Hook>, HookError>;

/// Registry of hook constructors keyed by exported kind.
pub struct HookCatalog {
    factories: HashMap<&'static str, HookFactory>,
}

impl HookCatalog {
    /// A catalog with no hook kinds.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// All hook kinds built into ith.
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        catalog.register(DiscordBridge::EXPORT, DiscordBridge::from_plugin);
        catalog
    }

    pub fn register(&mut self, export: &'static str, factory: HookFactory) {
        self.factories.insert(export, factory);
    }

    pub fn contains(&self, export: &str) -> bool {
        self.factories.contains_key(export)
    }

    /// Build the hook `module` exports.
    pub fn instantiate(
        &self,
        module: &PluginModule,
        handle: &SupervisorHandle,
        config: &Config,
    ) -> Result<Box<dyn Hook>, HookError> {
        let factory =
            self.factories
                .get(module.export.as_str())
                .ok_or_else(|| HookError::UnknownExport {
                    name: module.name.clone(),
                    export: module.export.clone(),
                })?;
        factory(module, handle, config)
    }
}

impl Default for HookCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_discord_bridge() {
        let catalog = HookCatalog::builtin();
        assert!(catalog.contains("discord-bridge"));
        assert!(!catalog.contains("email"));
    }
}

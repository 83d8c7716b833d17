//! Hook registry: discovery, ordering and lifecycle.

use super::{Hook, HookCatalog, HookContext, PluginLoader, PluginModule, WelcomeEvent};
use crate::config::Config;
use crate::error::HookError;
use crate::message::InboundMessage;
use crate::supervisor::SupervisorHandle;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Plugin manifest extension.
const PLUGIN_EXTENSION: &str = "toml";

/// Files starting with this are never loaded.
const PRIVATE_PREFIX: char = '_';

/// Reserved for shared definitions; never instantiated as a hook.
const BASE_DEFINITION: &str = "base.toml";

/// Where a hook is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Registered,
    Running,
    StartFailed,
    Stopped,
}

/// A registered hook.
pub struct HookDescriptor {
    pub name: String,
    /// Manifest the hook came from; `None` for statically registered hooks.
    pub source: Option<PathBuf>,
    pub module: Option<Arc<PluginModule>>,
    instance: Box<dyn Hook>,
    state: Lifecycle,
}

impl HookDescriptor {
    pub fn state(&self) -> Lifecycle {
        self.state
    }
}

/// Ordered set of hooks with unique names.
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<HookDescriptor>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook constructed by the caller.
    pub fn register(&mut self, name: impl Into<String>, hook: Box<dyn Hook>) -> Result<(), HookError> {
        self.insert(HookDescriptor {
            name: name.into(),
            source: None,
            module: None,
            instance: hook,
            state: Lifecycle::Registered,
        })
    }

    fn insert(&mut self, descriptor: HookDescriptor) -> Result<(), HookError> {
        if self.get(&descriptor.name).is_some() {
            return Err(HookError::DuplicateName(descriptor.name));
        }
        self.hooks.push(descriptor);
        Ok(())
    }

    /// Whether `file_name` names a loadable plugin manifest.
    pub fn is_eligible(file_name: &str) -> bool {
        Path::new(file_name)
            .extension()
            .is_some_and(|ext| ext == PLUGIN_EXTENSION)
            && !file_name.starts_with(PRIVATE_PREFIX)
            && file_name != BASE_DEFINITION
    }

    /// Eligible manifests in `dir`, sorted by file name.
    pub fn plugin_files(dir: &Path) -> Result<Vec<PathBuf>, HookError> {
        let entries = std::fs::read_dir(dir).map_err(|source| HookError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(Self::is_eligible)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Load, instantiate and register every eligible plugin in `dir`.
    ///
    /// Each hook is registered under its manifest's file stem. A missing
    /// directory registers nothing. Returns the number of hooks added.
    pub fn discover(
        &mut self,
        dir: &Path,
        loader: &mut PluginLoader,
        catalog: &HookCatalog,
        handle: &SupervisorHandle,
        config: &Config,
    ) -> Result<usize, HookError> {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "Hooks directory not found, no hooks loaded");
            return Ok(0);
        }

        let mut added = 0;
        for path in Self::plugin_files(dir)? {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let module = loader.load(name, &path)?;
            let instance = catalog.instantiate(&module, handle, config)?;
            self.insert(HookDescriptor {
                name: name.to_string(),
                source: Some(path.clone()),
                module: Some(module),
                instance,
                state: Lifecycle::Registered,
            })?;
            info!(hook = %name, "Hook \"{}\" loaded successfully", name);
            added += 1;
        }
        Ok(added)
    }

    pub fn get(&self, name: &str) -> Option<&HookDescriptor> {
        self.hooks.iter().find(|d| d.name == name)
    }

    /// Hook names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.hooks.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Start every hook that has not been started, in registration order.
    pub async fn start_all(&mut self) {
        for hook in &mut self.hooks {
            if hook.state != Lifecycle::Registered {
                continue;
            }
            info!(hook = %hook.name, "Starting hook");
            hook.state = match hook.instance.start().await {
                Ok(()) => Lifecycle::Running,
                Err(e) => {
                    error!(hook = %hook.name, error = %e, "Hook failed to start");
                    Lifecycle::StartFailed
                }
            };
        }
    }

    /// Stop every started hook exactly once, in registration order.
    pub async fn stop_all(&mut self) {
        for hook in &mut self.hooks {
            if !matches!(hook.state, Lifecycle::Running | Lifecycle::StartFailed) {
                continue;
            }
            info!(hook = %hook.name, "Stopping hook");
            if let Err(e) = hook.instance.stop().await {
                error!(hook = %hook.name, error = %e, "Hook failed to stop cleanly");
            }
            hook.state = Lifecycle::Stopped;
        }
    }

    /// Deliver a message to every running hook, in order.
    pub async fn dispatch_msg(&mut self, ctx: &HookContext<'_>, event: &InboundMessage) {
        for hook in &mut self.hooks {
            if hook.state == Lifecycle::Running {
                hook.instance.on_msg(ctx, event).await;
            }
        }
    }

    pub async fn dispatch_welcome(&mut self, ctx: &HookContext<'_>, event: &WelcomeEvent) {
        for hook in &mut self.hooks {
            if hook.state == Lifecycle::Running {
                hook.instance.on_welcome(ctx, event).await;
            }
        }
    }
}

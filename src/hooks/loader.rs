//! Plugin manifest loading.
//!
//! A plugin is a TOML manifest naming the hook kind it exports and the options
//! passed to that hook:
//!
//! ```toml
//! hook = "discord-bridge"
//!
//! [options]
//! outbound_capacity = 64
//! ```
//!
//! Loads are cached by canonical path, so requesting the same file twice
//! returns the same [`PluginModule`] without reading it again.

use crate::error::HookError;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Manifest {
    hook: String,
    #[serde(default)]
    options: toml::Table,
}

/// A loaded plugin manifest.
#[derive(Debug)]
pub struct PluginModule {
    /// Name given on first load.
    pub name: String,
    /// Canonical path of the manifest.
    pub path: PathBuf,
    /// Hook kind exported by this plugin.
    pub export: String,
    options: toml::Table,
}

impl PluginModule {
    /// Deserialize the `[options]` table.
    pub fn options<T: DeserializeOwned>(&self) -> Result<T, HookError> {
        toml::Value::Table(self.options.clone())
            .try_into()
            .map_err(|source| HookError::Manifest {
                path: self.path.clone(),
                source,
            })
    }
}

/// Loads plugin manifests, at most once per path.
#[derive(Debug, Default)]
pub struct PluginLoader {
    modules: HashMap<PathBuf, Arc<PluginModule>>,
    reads: usize,
}

impl PluginLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the manifest at `path`, or return the cached module for it.
    pub fn load(&mut self, name: &str, path: &Path) -> Result<Arc<PluginModule>, HookError> {
        let key = path.canonicalize().map_err(|source| HookError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(existing) = self.modules.get(&key) {
            debug!(name = %name, path = %key.display(), "Plugin already loaded");
            return Ok(Arc::clone(existing));
        }

        let content = std::fs::read_to_string(&key).map_err(|source| HookError::Io {
            path: key.clone(),
            source,
        })?;
        self.reads += 1;

        let manifest: Manifest = toml::from_str(&content).map_err(|source| HookError::Manifest {
            path: key.clone(),
            source,
        })?;

        let module = Arc::new(PluginModule {
            name: name.to_string(),
            path: key.clone(),
            export: manifest.hook,
            options: manifest.options,
        });
        self.modules.insert(key, Arc::clone(&module));
        Ok(module)
    }

    /// Number of manifest files actually read from disk.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Opts {
        capacity: u32,
    }

    #[test]
    fn test_load_is_idempotent_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        std::fs::write(&path, "hook = \"discord-bridge\"\n").unwrap();

        let mut loader = PluginLoader::new();
        let first = loader.load("bridge", &path).unwrap();
        let second = loader.load("bridge", &path).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.reads(), 1);
        assert_eq!(first.export, "discord-bridge");
    }

    #[test]
    fn test_load_same_file_through_different_spelling() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let path = dir.path().join("bridge.toml");
        std::fs::write(&path, "hook = \"x\"\n").unwrap();
        let indirect = dir.path().join("sub").join("..").join("bridge.toml");

        let mut loader = PluginLoader::new();
        let first = loader.load("bridge", &path).unwrap();
        let second = loader.load("bridge", &indirect).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.reads(), 1);
    }

    #[test]
    fn test_options_deserialize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.toml");
        std::fs::write(&path, "hook = \"x\"\n[options]\ncapacity = 8\n").unwrap();

        let module = PluginLoader::new().load("x", &path).unwrap();
        assert_eq!(module.options::<Opts>().unwrap(), Opts { capacity: 8 });
    }

    #[test]
    fn test_missing_export_is_manifest_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[options]\n").unwrap();

        let err = PluginLoader::new().load("bad", &path).unwrap_err();
        assert!(matches!(err, HookError::Manifest { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = PluginLoader::new()
            .load("nope", Path::new("/nonexistent/nope.toml"))
            .unwrap_err();
        assert!(matches!(err, HookError::Io { .. }));
    }
}

//! Module Loader Port - turns a resolved module file into a callable handler.

use std::fmt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use uuid::Uuid;

use crate::domain::Handler;

/// Errors that can occur while loading a module
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to load module {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("Handler '{symbol}' not found in module '{module}'")]
    HandlerNotFound { module: String, symbol: String },

    #[error("Module {path} was built for handler ABI {found}, runtime expects {expected}")]
    AbiMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
}

/// Identifier a loaded unit is registered under.
///
/// Made unique per load so that two units with the same module name never
/// clash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn synthetic(module: &str) -> Self {
        Self(format!("user_module::{}::{}", module, Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A module file located by the artifact loader, ready to be loaded.
///
/// When the module came from an archive, the scratch directory it was
/// unpacked into travels with it and is removed only when this value (or the
/// artifact built from it) is dropped.
#[derive(Debug)]
pub struct ResolvedModule {
    pub path: PathBuf,
    pub module: String,
    pub symbol: String,
    pub scratch: Option<TempDir>,
}

impl ResolvedModule {
    pub fn mounted(path: impl Into<PathBuf>, module: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            module: module.into(),
            symbol: symbol.into(),
            scratch: None,
        }
    }

    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch.as_ref().map(TempDir::path)
    }
}

/// A module that has been loaded and had its handler resolved.
///
/// Fields drop in declaration order, so the handler goes before the library
/// it points into.
pub struct LoadedModule {
    pub id: ModuleId,
    pub handler: Box<dyn Handler>,
    pub library: Option<libloading::Library>,
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("id", &self.id)
            .field("dynamic", &self.library.is_some())
            .finish_non_exhaustive()
    }
}

/// Port for loading a resolved module and extracting its handler
pub trait ModuleLoader: Send + Sync {
    /// Load the module exactly once and resolve `module.symbol`.
    ///
    /// # Errors
    /// Returns `LoadError::Load` if the unit cannot be loaded and
    /// `LoadError::HandlerNotFound` if the symbol is missing
    fn load(&self, module: &ResolvedModule) -> Result<LoadedModule, LoadError>;
}

//! Registered-constructor module loader.
//!
//! Handlers are registered in-process under `(module, symbol)`. Loading a
//! resolved module looks the pair up and builds a fresh handler, which lets
//! the runtime be embedded as a library (and tested) without producing a
//! dynamic library.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::{Handler, HandlerFn};
use crate::ports::{LoadError, LoadedModule, ModuleId, ModuleLoader, ResolvedModule};

type HandlerConstructor = Arc<dyn Fn() -> Box<dyn Handler> + Send + Sync>;

/// Handler constructors keyed by module name, then symbol.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    modules: HashMap<String, HashMap<String, HandlerConstructor>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor; each load gets a new handler instance.
    pub fn register<F, H>(mut self, module: impl Into<String>, symbol: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Handler + 'static,
    {
        let constructor: HandlerConstructor = Arc::new(move || Box::new(constructor()));
        self.modules
            .entry(module.into())
            .or_default()
            .insert(symbol.into(), constructor);
        self
    }

    /// Register a plain handler function.
    pub fn register_fn(self, module: impl Into<String>, symbol: impl Into<String>, handler: HandlerFn) -> Self {
        self.register(module, symbol, move || handler)
    }

    pub fn contains(&self, module: &str, symbol: &str) -> bool {
        self.modules
            .get(module)
            .map(|symbols| symbols.contains_key(symbol))
            .unwrap_or(false)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<String> = self
            .modules
            .iter()
            .flat_map(|(module, symbols)| symbols.keys().map(move |s| format!("{}.{}", module, s)))
            .collect();
        entries.sort();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &entries)
            .finish()
    }
}

/// `ModuleLoader` backed by a [`HandlerRegistry`].
#[derive(Debug, Clone)]
pub struct RegistryModuleLoader {
    registry: HandlerRegistry,
}

impl RegistryModuleLoader {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry }
    }
}

impl ModuleLoader for RegistryModuleLoader {
    fn load(&self, module: &ResolvedModule) -> Result<LoadedModule, LoadError> {
        let symbols = self
            .registry
            .modules
            .get(&module.module)
            .ok_or_else(|| LoadError::Load {
                path: module.path.clone(),
                reason: format!("no handlers registered for module '{}'", module.module),
            })?;

        let constructor = symbols
            .get(&module.symbol)
            .ok_or_else(|| LoadError::HandlerNotFound {
                module: module.module.clone(),
                symbol: module.symbol.clone(),
            })?;

        Ok(LoadedModule {
            id: ModuleId::synthetic(&module.module),
            handler: constructor(),
            library: None,
        })
    }
}

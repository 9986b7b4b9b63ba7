//! Dynamic-library module loader.
//!
//! Loads a `cdylib` built with [`export_handler!`](crate::export_handler)
//! and resolves the handler symbol as a Rust-ABI function pointer. The
//! library must be built with the same toolchain and crate version as the
//! runtime; the `KV_RUNTIME_HANDLER_ABI` marker catches the most common
//! mismatch.

use std::path::Path;

use libloading::Library;

use crate::domain::{HandlerFn, HANDLER_ABI_SYMBOL, HANDLER_ABI_VERSION};
use crate::ports::{LoadError, LoadedModule, ModuleId, ModuleLoader, ResolvedModule};

/// Loads handlers from platform dynamic libraries.
#[derive(Debug, Clone, Copy, Default)]
pub struct DylibModuleLoader;

impl DylibModuleLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ModuleLoader for DylibModuleLoader {
    fn load(&self, module: &ResolvedModule) -> Result<LoadedModule, LoadError> {
        let id = ModuleId::synthetic(&module.module);
        tracing::debug!(module_id = %id, path = %module.path.display(), "Loading module");

        // SAFETY: loading runs the library's initialisers. The artifact is
        // operator-supplied code that the runtime exists to execute.
        let library = unsafe { Library::new(&module.path) }.map_err(|e| LoadError::Load {
            path: module.path.clone(),
            reason: e.to_string(),
        })?;

        check_abi(&library, &module.path)?;

        // SAFETY: the symbol is declared by `export_handler!` with exactly the
        // `HandlerFn` signature; the ABI marker above guards layout drift.
        let handler: HandlerFn = unsafe {
            let symbol = library
                .get::<HandlerFn>(module.symbol.as_bytes())
                .map_err(|_| LoadError::HandlerNotFound {
                    module: module.module.clone(),
                    symbol: module.symbol.clone(),
                })?;
            *symbol
        };

        tracing::info!(module_id = %id, symbol = %module.symbol, "Handler resolved");

        Ok(LoadedModule {
            id,
            handler: Box::new(handler),
            library: Some(library),
        })
    }
}

fn check_abi(library: &Library, path: &Path) -> Result<(), LoadError> {
    // SAFETY: the marker is a `u32` static emitted by `export_handler!`.
    let marker = unsafe { library.get::<*const u32>(HANDLER_ABI_SYMBOL.as_bytes()) };

    match marker {
        Ok(symbol) => {
            // SAFETY: the pointer targets a static that lives as long as the library.
            let found = unsafe { **symbol };
            if found != HANDLER_ABI_VERSION {
                return Err(LoadError::AbiMismatch {
                    path: path.to_path_buf(),
                    found,
                    expected: HANDLER_ABI_VERSION,
                });
            }
            Ok(())
        }
        Err(_) => {
            tracing::warn!(
                path = %path.display(),
                "Module exports no {} marker, assuming a compatible build",
                HANDLER_ABI_SYMBOL
            );
            Ok(())
        }
    }
}

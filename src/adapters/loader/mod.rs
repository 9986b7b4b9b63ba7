//! Module loader adapters.
//!
//! - `DylibModuleLoader` - loads a handler from a dynamic library
//! - `RegistryModuleLoader` - builds handlers from registered constructors

mod dylib;
mod registry;

pub use dylib::DylibModuleLoader;
pub use registry::{HandlerRegistry, RegistryModuleLoader};

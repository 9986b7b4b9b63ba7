//! Handler contract.
//!
//! A handler receives the decoded input and the process-wide
//! [`ExecutionContext`] and returns a JSON value that should be an object.
//! Handlers come either from a dynamic library (see [`export_handler!`]) or
//! from constructors registered in-process.
//!
//! # Writing a plugin
//!
//! ```ignore
//! use kv_function_runtime::domain::{ExecutionContext, HandlerResult, InputPayload};
//! use serde_json::json;
//!
//! fn handle(input: &InputPayload, ctx: &mut ExecutionContext) -> HandlerResult {
//!     let seen = ctx.env_mut().entry("seen".into()).or_insert(json!(0));
//!     *seen = json!(seen.as_u64().unwrap_or(0) + 1);
//!     Ok(json!({ "keys": input.len(), "seen": seen.clone() }))
//! }
//!
//! kv_function_runtime::export_handler!(handler => handle);
//! ```
//!
//! Build the plugin as a `cdylib` with the same toolchain and the same
//! version of this crate as the runtime; the symbol uses the Rust ABI.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;
use thiserror::Error;

use super::context::ExecutionContext;
use super::payload::InputPayload;

/// Bumped whenever `HandlerFn`, `InputPayload` or `ExecutionContext` change
/// shape.
pub const HANDLER_ABI_VERSION: u32 = 1;

/// Exported by plugins built with [`export_handler!`].
pub const HANDLER_ABI_SYMBOL: &str = "KV_RUNTIME_HANDLER_ABI";

/// Error raised by a handler invocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub(crate) fn panicked(payload: Box<dyn Any + Send>) -> Self {
        let detail = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::new(format!("handler panicked: {}", detail))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

pub type HandlerResult = Result<Value, HandlerError>;

/// Signature of the symbol resolved from a handler library.
pub type HandlerFn = fn(&InputPayload, &mut ExecutionContext) -> HandlerResult;

/// The callable the polling loop drives.
pub trait Handler: Send {
    fn invoke(&mut self, input: &InputPayload, context: &mut ExecutionContext) -> HandlerResult;
}

impl<F> Handler for F
where
    F: FnMut(&InputPayload, &mut ExecutionContext) -> HandlerResult + Send,
{
    fn invoke(&mut self, input: &InputPayload, context: &mut ExecutionContext) -> HandlerResult {
        self(input, context)
    }
}

/// Invoke a handler, turning a panic into a `HandlerError`.
///
/// Context mutations made before the panic are kept.
pub fn invoke_guarded(
    handler: &mut dyn Handler,
    input: &InputPayload,
    context: &mut ExecutionContext,
) -> HandlerResult {
    match panic::catch_unwind(AssertUnwindSafe(|| handler.invoke(input, context))) {
        Ok(result) => result,
        Err(payload) => Err(HandlerError::panicked(payload)),
    }
}

/// Export a handler function from a plugin crate.
///
/// `export_handler!(handler => my_fn)` exports `my_fn` under the symbol
/// `handler` together with the ABI marker. Use it once per plugin; the
/// marker is a single static.
#[macro_export]
macro_rules! export_handler {
    ($symbol:ident => $func:path) => {
        #[no_mangle]
        pub static KV_RUNTIME_HANDLER_ABI: u32 = $crate::domain::HANDLER_ABI_VERSION;

        #[no_mangle]
        pub fn $symbol(
            input: &$crate::domain::InputPayload,
            context: &mut $crate::domain::ExecutionContext,
        ) -> $crate::domain::HandlerResult {
            $func(input, context)
        }
    };
}

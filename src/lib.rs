//! kv-function-runtime - run one user handler against a key-value store.
//!
//! The runtime loads a handler from a dynamic library (downloaded as a zip
//! archive or mounted into the container), polls an input key, invokes the
//! handler whenever the payload's `timestamp` changes, and writes the
//! handler's result to an output key.
//!
//! Handlers are plain functions:
//!
//! ```no_run
//! use kv_function_runtime::domain::{ExecutionContext, HandlerResult, InputPayload};
//! use serde_json::json;
//!
//! fn cpu_alert(input: &InputPayload, context: &mut ExecutionContext) -> HandlerResult {
//!     let cpu = input.get_f64("cpu_percent").unwrap_or_default();
//!     let runs = context.env().get("runs").and_then(|v| v.as_u64()).unwrap_or(0) + 1;
//!     context.env_mut().insert("runs".to_string(), json!(runs));
//!     Ok(json!({ "cpu_high": cpu > 80.0, "runs": runs }))
//! }
//!
//! kv_function_runtime::export_handler!(handler => cpu_alert);
//! ```

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;

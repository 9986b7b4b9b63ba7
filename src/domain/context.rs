//! Execution context handed to every handler invocation.
//!
//! The context lives as long as the process. The runtime fills in the
//! metadata and stamps `last_execution` before each call; `env` belongs to the
//! handler and is never read, cleared, or persisted by the runtime. A restart
//! loses everything in it.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::config::StoreConfig;

/// Mutable per-process state plus runtime metadata.
pub struct ExecutionContext {
    host: String,
    port: u16,
    input_key: String,
    output_key: String,
    last_execution: Option<DateTime<Utc>>,
    env: HashMap<String, Value>,
}

impl ExecutionContext {
    pub fn new(store: &StoreConfig) -> Self {
        Self {
            host: store.host.clone(),
            port: store.port,
            input_key: store.input_key.clone(),
            output_key: store.output_key.clone(),
            last_execution: None,
            env: HashMap::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn input_key(&self) -> &str {
        &self.input_key
    }

    pub fn output_key(&self) -> &str {
        &self.output_key
    }

    /// Start time of the current (or most recent) invocation.
    pub fn last_execution(&self) -> Option<DateTime<Utc>> {
        self.last_execution
    }

    /// Handler-owned state that survives between invocations.
    pub fn env(&self) -> &HashMap<String, Value> {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut HashMap<String, Value> {
        &mut self.env
    }

    pub(crate) fn mark_execution(&mut self, at: DateTime<Utc>) {
        self.last_execution = Some(at);
    }
}

// env is left out: its contents are the handler's business.
impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("input_key", &self.input_key)
            .field("output_key", &self.output_key)
            .field("last_execution", &self.last_execution)
            .finish_non_exhaustive()
    }
}

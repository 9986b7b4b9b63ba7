//! Validation of handler return values.

use serde_json::{Map, Value};
use thiserror::Error;

use super::payload::json_type_name;

/// Message placed under the `error` key of a diagnostic payload.
pub const RESULT_TYPE_MESSAGE: &str = "Handler must return a mapping";

/// The handler returned something other than a JSON object.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("handler returned {found}, expected an object")]
pub struct ResultTypeError {
    pub found: &'static str,
    pub rendering: String,
}

/// What gets published for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    /// The handler's own mapping.
    Result(Map<String, Value>),

    /// Substituted because the return value was not a mapping.
    Diagnostic {
        body: Map<String, Value>,
        cause: ResultTypeError,
    },
}

impl InvocationOutcome {
    /// Validate a handler return value, manufacturing a diagnostic payload
    /// for anything that is not an object.
    pub fn from_return(value: Value) -> Self {
        match value {
            Value::Object(body) => Self::Result(body),
            other => {
                let cause = ResultTypeError {
                    found: json_type_name(&other),
                    rendering: render(&other),
                };
                let mut body = Map::new();
                body.insert("error".to_string(), Value::String(RESULT_TYPE_MESSAGE.to_string()));
                body.insert("result".to_string(), Value::String(cause.rendering.clone()));
                Self::Diagnostic { body, cause }
            }
        }
    }

    pub fn body(&self) -> &Map<String, Value> {
        match self {
            Self::Result(body) => body,
            Self::Diagnostic { body, .. } => body,
        }
    }

    pub fn is_diagnostic(&self) -> bool {
        matches!(self, Self::Diagnostic { .. })
    }
}

// Strings are rendered without quotes, everything else as compact JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

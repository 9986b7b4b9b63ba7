//! Echoes the payload timestamp and counts its own invocations in the
//! context `env`.

use kv_function_runtime::domain::{ExecutionContext, HandlerError, HandlerResult, InputPayload};
use serde_json::{json, Value};

fn echo(input: &InputPayload, context: &mut ExecutionContext) -> HandlerResult {
    if input.get("fail").and_then(Value::as_bool).unwrap_or(false) {
        return Err(HandlerError::new("asked to fail"));
    }

    let calls = context.env().get("calls").and_then(Value::as_u64).unwrap_or(0) + 1;
    context.env_mut().insert("calls".to_string(), json!(calls));

    Ok(json!({
        "calls": calls,
        "timestamp": input.timestamp().cloned().unwrap_or(Value::Null),
        "source": context.input_key(),
    }))
}

kv_function_runtime::export_handler!(handler => echo);

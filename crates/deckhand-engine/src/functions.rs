//! Global template functions

use minijinja::value::Rest;
use minijinja::{Error, ErrorKind, Value};

/// Abort the render with a message
///
/// Usage: {{ fail("ingress.host must be set") }}
pub fn fail(message: String) -> Result<Value, Error> {
    Err(Error::new(ErrorKind::InvalidOperation, message))
}

/// First argument that is defined, not none and not an empty string
///
/// Usage: {{ coalesce(values.name, release.name) }}
pub fn coalesce(args: Rest<Value>) -> Value {
    args.iter()
        .find(|arg| {
            !arg.is_undefined() && !arg.is_none() && arg.as_str().is_none_or(|s| !s.is_empty())
        })
        .cloned()
        .unwrap_or(Value::UNDEFINED)
}

/// Usage: {{ ternary("yes", "no", values.enabled) }}
pub fn ternary(when_true: Value, when_false: Value, condition: Value) -> Value {
    if condition.is_true() {
        when_true
    } else {
        when_false
    }
}

/// Usage: {{ tostring(values.port) }}
pub fn tostring(value: Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

/// Current UTC time, RFC 3339
///
/// Usage: {{ now() }}
pub fn now() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

//! Template filters for Kubernetes manifests

use base64::Engine as _;
use minijinja::{Error, ErrorKind, Value};
use sha2::{Digest, Sha256};

fn invalid(message: impl std::fmt::Display) -> Error {
    Error::new(ErrorKind::InvalidOperation, message.to_string())
}

fn to_json(value: &Value) -> Result<serde_json::Value, Error> {
    serde_json::to_value(value).map_err(invalid)
}

/// Serialize a value as a YAML block
///
/// Usage: {{ values.resources | toyaml | nindent(10) }}
pub fn toyaml(value: Value) -> Result<String, Error> {
    let yaml = serde_yaml::to_string(&to_json(&value)?).map_err(invalid)?;
    Ok(yaml.trim_start_matches("---\n").trim_end().to_string())
}

/// Serialize a value as compact JSON
///
/// Usage: {{ values.config | tojson }}
pub fn tojson(value: Value) -> Result<String, Error> {
    serde_json::to_string(&to_json(&value)?).map_err(invalid)
}

/// Usage: {{ values.password | b64encode }}
#[must_use]
pub fn b64encode(value: String) -> String {
    base64::engine::general_purpose::STANDARD.encode(value)
}

/// Usage: {{ encoded | b64decode }}
pub fn b64decode(value: String) -> Result<String, Error> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(value.trim())
        .map_err(|e| invalid(format!("base64 decode error: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| invalid(format!("decoded value is not UTF-8: {}", e)))
}

fn plain(value: &Value) -> String {
    value
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

/// Wrap in double quotes, escaping backslashes and quotes
///
/// Usage: {{ values.image.tag | quote }}
#[must_use]
pub fn quote(value: Value) -> String {
    format!("{:?}", plain(&value))
}

/// Wrap in single quotes (YAML style escaping)
#[must_use]
pub fn squote(value: Value) -> String {
    format!("'{}'", plain(&value).replace('\'', "''"))
}

/// Indent every non-empty line by `spaces`
///
/// Usage: {{ values.annotations | toyaml | indent(4) }}
#[must_use]
pub fn indent(value: String, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    value
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Like `indent`, with a leading newline
///
/// Usage: {{ values.labels | toyaml | nindent(4) }}
#[must_use]
pub fn nindent(value: String, spaces: usize) -> String {
    format!("\n{}", indent(value, spaces))
}

/// Fail the render when a value is missing or empty
///
/// Usage: {{ values.host | required("host is required") }}
pub fn required(value: Value, message: Option<String>) -> Result<Value, Error> {
    let missing = value.is_undefined()
        || value.is_none()
        || value.as_str().is_some_and(str::is_empty);

    if missing {
        Err(invalid(
            message.unwrap_or_else(|| "required value is missing".to_string()),
        ))
    } else {
        Ok(value)
    }
}

/// Truncate to at most `length` characters
///
/// Usage: {{ release.name | trunc(63) }}
#[must_use]
pub fn trunc(value: String, length: usize) -> String {
    value.chars().take(length).collect()
}

/// Usage: {{ chart.version | trimprefix("v") }}
#[must_use]
pub fn trimprefix(value: String, prefix: String) -> String {
    match value.strip_prefix(prefix.as_str()) {
        Some(rest) => rest.to_string(),
        None => value,
    }
}

/// Usage: {{ name | trimsuffix("-") }}
#[must_use]
pub fn trimsuffix(value: String, suffix: String) -> String {
    match value.strip_suffix(suffix.as_str()) {
        Some(rest) => rest.to_string(),
        None => value,
    }
}

/// Hex-encoded SHA-256 digest, handy for checksum annotations
///
/// Usage: {{ values.config | tojson | sha256 }}
#[must_use]
pub fn sha256(value: String) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}

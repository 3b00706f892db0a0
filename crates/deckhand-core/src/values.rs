//! Values handling with deep merge support
//!
//! The effective override document of a release is built in two layers:
//! value files are deep-merged in order, then inline `--set` style
//! expressions are applied on top. Later sources always win.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Values container with deep merge capability
///
/// Objects are backed by `serde_json::Map`, which keeps keys sorted, so two
/// documents built from the same inputs always serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Load values from a YAML file
    ///
    /// Read and parse failures are reported as merge errors naming the file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source_name = path.display().to_string();

        let content =
            std::fs::read_to_string(path).map_err(|e| CoreError::merge(&source_name, e))?;

        let value: JsonValue =
            serde_yaml::from_str(&content).map_err(|e| CoreError::merge(&source_name, e))?;

        match value {
            JsonValue::Null => Ok(Self::new()),
            JsonValue::Object(_) => Ok(Self(value)),
            _ => Err(CoreError::merge(
                source_name,
                "top-level document must be a mapping",
            )),
        }
    }

    /// Parse values from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        Ok(match value {
            JsonValue::Null => Self::new(),
            other => Self(other),
        })
    }

    /// Serialize to the YAML form consumed by the renderer and the deployment service
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    /// Deep merge another Values into this one
    ///
    /// Rules:
    /// - Scalars: overlay replaces base
    /// - Objects: recursive merge
    /// - Arrays: overlay replaces base (not appended)
    pub fn merge(&mut self, overlay: &Values) {
        deep_merge(&mut self.0, &overlay.0);
    }

    /// Set a value by dotted path (e.g., "image.tag")
    pub fn set(&mut self, path: &str, value: JsonValue) -> Result<()> {
        let parts: Vec<&str> = path.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(CoreError::merge(path, "empty key segment"));
        }
        set_nested(&mut self.0, &parts, value);
        Ok(())
    }

    /// Get a value by dotted path
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let parts: Vec<&str> = path.split('.').collect();
        get_nested(&self.0, &parts)
    }

    /// Get the inner JSON value
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Convert to JSON value
    pub fn into_inner(self) -> JsonValue {
        self.0
    }

    /// Check if values are empty
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Null => true,
            _ => false,
        }
    }
}

/// Build the effective override document
///
/// Value files are deep-merged in the order given, then each inline
/// expression is applied in order. The first unreadable file, unparsable
/// file or malformed expression aborts the merge.
pub fn merge_overrides(value_files: &[PathBuf], set_values: &[String]) -> Result<Values> {
    let mut values = Values::new();

    for path in value_files {
        let overlay = Values::from_file(path)?;
        values.merge(&overlay);
        tracing::debug!(file = %path.display(), "merged value file");
    }

    for expr in set_values {
        apply_set_expression(&mut values, expr)?;
    }

    Ok(values)
}

/// Parse --set arguments (key=value format) into a standalone document
pub fn parse_set_values(set_args: &[String]) -> Result<Values> {
    let mut values = Values::new();
    for arg in set_args {
        apply_set_expression(&mut values, arg)?;
    }
    Ok(values)
}

/// Apply one inline expression, which may hold several comma-separated
/// assignments (`a=1,b.c=x`). Commas inside `{...}` lists are kept.
fn apply_set_expression(values: &mut Values, expr: &str) -> Result<()> {
    for assignment in split_top_level(expr, expr)? {
        let (key, raw) = assignment.split_once('=').ok_or_else(|| {
            CoreError::merge(expr, format!("'{}' is not in key=value form", assignment))
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(CoreError::merge(expr, "missing key before '='"));
        }
        if key.split('.').any(str::is_empty) {
            return Err(CoreError::merge(expr, format!("invalid key '{}'", key)));
        }

        let value = parse_typed(raw, expr)?;
        values.set(key, value)?;
    }
    Ok(())
}

/// Split on commas that are not nested inside braces
fn split_top_level<'a>(input: &'a str, expr: &str) -> Result<Vec<&'a str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| CoreError::merge(expr, "unbalanced '}'"))?;
            }
            ',' if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(CoreError::merge(expr, "unbalanced '{'"));
    }
    parts.push(&input[start..]);
    Ok(parts)
}

/// Infer the type of an inline value
fn parse_typed(raw: &str, expr: &str) -> Result<JsonValue> {
    if let Some(inner) = raw.strip_prefix('{') {
        let inner = inner
            .strip_suffix('}')
            .ok_or_else(|| CoreError::merge(expr, "list value must end with '}'"))?;
        if inner.trim().is_empty() {
            return Ok(JsonValue::Array(Vec::new()));
        }
        let items = split_top_level(inner, expr)?
            .into_iter()
            .map(|item| parse_typed(item.trim(), expr))
            .collect::<Result<Vec<_>>>()?;
        return Ok(JsonValue::Array(items));
    }

    Ok(match raw {
        "true" => JsonValue::Bool(true),
        "false" => JsonValue::Bool(false),
        "null" => JsonValue::Null,
        _ => {
            if let Ok(num) = raw.parse::<i64>() {
                JsonValue::Number(num.into())
            } else if let Some(num) = raw
                .parse::<f64>()
                .ok()
                .filter(|_| raw.contains('.'))
                .and_then(serde_json::Number::from_f64)
            {
                JsonValue::Number(num)
            } else {
                JsonValue::String(raw.to_string())
            }
        }
    })
}

/// Deep merge two JSON values
fn deep_merge(base: &mut JsonValue, overlay: &JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// Set a nested value by path, replacing any non-object on the way
fn set_nested(value: &mut JsonValue, path: &[&str], new_value: JsonValue) {
    let Some((key, remaining)) = path.split_first() else {
        *value = new_value;
        return;
    };

    if !value.is_object() {
        *value = JsonValue::Object(serde_json::Map::new());
    }

    if let JsonValue::Object(map) = value {
        let entry = map.entry(key.to_string()).or_insert(JsonValue::Null);
        set_nested(entry, remaining, new_value);
    }
}

/// Get a nested value by path
fn get_nested<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let Some((key, remaining)) = path.split_first() else {
        return Some(value);
    };

    match value {
        JsonValue::Object(map) => map.get(*key).and_then(|v| get_nested(v, remaining)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_deep_merge() {
        let mut base = Values::from_yaml(
            r#"
image:
  repository: nginx
  tag: "1.0"
replicas: 1
"#,
        )
        .unwrap();

        let overlay = Values::from_yaml(
            r#"
image:
  tag: "2.0"
  pullPolicy: Always
replicas: 3
"#,
        )
        .unwrap();

        base.merge(&overlay);

        assert_eq!(base.get("image.repository").unwrap(), "nginx");
        assert_eq!(base.get("image.tag").unwrap(), "2.0");
        assert_eq!(base.get("image.pullPolicy").unwrap(), "Always");
        assert_eq!(base.get("replicas").unwrap(), 3);
    }

    #[test]
    fn test_conflicting_non_mapping_is_overwritten() {
        let mut base = Values::from_yaml("ports: [80, 443]\nlabels: {a: b}").unwrap();
        let overlay = Values::from_yaml("ports: [8080]\nlabels: plain").unwrap();

        base.merge(&overlay);

        assert_eq!(base.get("ports").unwrap(), &serde_json::json!([8080]));
        assert_eq!(base.get("labels").unwrap(), "plain");
    }

    #[test]
    fn test_value_files_are_right_biased() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.yaml", "x: 1\ny: 1\n");
        let b = write(&dir, "b.yaml", "y: 2\n");

        let values = merge_overrides(&[a, b], &[]).unwrap();

        assert_eq!(values.get("x").unwrap(), 1);
        assert_eq!(values.get("y").unwrap(), 2);
    }

    #[test]
    fn test_inline_overrides_win_over_files() {
        let dir = TempDir::new().unwrap();
        let b = write(&dir, "b.yaml", "y: 2\n");

        let values = merge_overrides(&[b], &["y=3".to_string()]).unwrap();

        assert_eq!(values.get("y").unwrap(), 3);
    }

    #[test]
    fn test_later_inline_expression_wins() {
        let values = parse_set_values(&[
            "image.tag=v1".to_string(),
            "image.tag=v2".to_string(),
        ])
        .unwrap();

        assert_eq!(values.get("image.tag").unwrap(), "v2");
    }

    #[test]
    fn test_merge_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.yaml", "zeta: 1\nalpha: {b: 2, a: 1}\n");
        let set = vec!["mid=x".to_string()];

        let first = merge_overrides(&[a.clone()], &set).unwrap().to_yaml().unwrap();
        let second = merge_overrides(&[a], &set).unwrap().to_yaml().unwrap();

        assert_eq!(first, second);
        assert!(first.find("alpha").unwrap() < first.find("zeta").unwrap());
    }

    #[test]
    fn test_unreadable_value_file_names_the_file() {
        let err = merge_overrides(&[PathBuf::from("/nonexistent/values.yaml")], &[]).unwrap_err();

        match err {
            CoreError::Merge { source_name, .. } => {
                assert_eq!(source_name, "/nonexistent/values.yaml")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unparsable_value_file_names_the_file() {
        let dir = TempDir::new().unwrap();
        let bad = write(&dir, "bad.yaml", "key: [unterminated\n");

        let err = merge_overrides(&[bad.clone()], &[]).unwrap_err();

        assert!(err.to_string().contains(&bad.display().to_string()));
    }

    #[test]
    fn test_non_mapping_value_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let list = write(&dir, "list.yaml", "- a\n- b\n");

        assert!(matches!(
            merge_overrides(&[list], &[]),
            Err(CoreError::Merge { .. })
        ));
    }

    #[test]
    fn test_empty_value_file_merges_as_nothing() {
        let dir = TempDir::new().unwrap();
        let empty = write(&dir, "empty.yaml", "");

        let values = merge_overrides(&[empty], &["a=1".to_string()]).unwrap();

        assert_eq!(values.get("a").unwrap(), 1);
    }

    #[test]
    fn test_parse_set_values_typing() {
        let args = vec![
            "image.tag=v2".to_string(),
            "replicas=5".to_string(),
            "debug=true".to_string(),
            "ratio=0.5".to_string(),
            "version=1.0.3".to_string(),
            "hosts={a.example.com,b.example.com}".to_string(),
        ];

        let values = parse_set_values(&args).unwrap();

        assert_eq!(values.get("image.tag").unwrap(), "v2");
        assert_eq!(values.get("replicas").unwrap(), 5);
        assert_eq!(values.get("debug").unwrap(), true);
        assert_eq!(values.get("ratio").unwrap(), 0.5);
        assert_eq!(values.get("version").unwrap(), "1.0.3");
        assert_eq!(
            values.get("hosts").unwrap(),
            &serde_json::json!(["a.example.com", "b.example.com"])
        );
    }

    #[test]
    fn test_comma_separated_assignments() {
        let values = parse_set_values(&["a=1,b.c=x,list={1,2}".to_string()]).unwrap();

        assert_eq!(values.get("a").unwrap(), 1);
        assert_eq!(values.get("b.c").unwrap(), "x");
        assert_eq!(values.get("list").unwrap(), &serde_json::json!([1, 2]));
    }

    #[test]
    fn test_nested_set_replaces_scalar_parent() {
        let mut values = Values::from_yaml("image: nginx").unwrap();
        apply_set_expression(&mut values, "image.tag=v1").unwrap();

        assert_eq!(values.get("image.tag").unwrap(), "v1");
    }

    #[test]
    fn test_malformed_expressions() {
        for bad in ["novalue", "=3", "a..b=1", "list={1,2", "x=}"] {
            let err = parse_set_values(&[bad.to_string()]).unwrap_err();
            match err {
                CoreError::Merge { source_name, .. } => assert_eq!(source_name, bad),
                other => panic!("unexpected error for {bad}: {other}"),
            }
        }
    }
}

//! Level file loading and schema validation.
//!
//! Loading is split in three stages so each failure class stays distinct:
//! 1. **Read** - raw bytes from disk ([`ConfigError::Read`])
//! 2. **Parse** - JSON or YAML into a generic value ([`ConfigError::Parse`])
//! 3. **Validate** - schema check into a [`LevelConfig`] ([`ConfigError::Validation`])
//!
//! Only a read failure is reported to the caller of [`load`]. Parse and schema
//! failures fall back to the previous configuration, so a bad edit never
//! disturbs levels that are already applied.

use super::types::{DocumentFormat, LevelConfig};
use crate::error::{ConfigError, ValidationIssue};
use crate::level::Level;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::trace;

/// Read and parse the file at `path` without validating it.
pub async fn read_document(path: &Path) -> Result<Value, ConfigError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    trace!(path = %path.display(), bytes = bytes.len(), "Level file read");
    parse_document(path, &bytes, DocumentFormat::from_path(path))
}

/// Parse raw bytes as the given format.
///
/// `path` is only used to label the error.
pub fn parse_document(
    path: &Path,
    bytes: &[u8],
    format: DocumentFormat,
) -> Result<Value, ConfigError> {
    let parsed = match format {
        DocumentFormat::Json => serde_json::from_slice::<Value>(bytes).map_err(|e| e.to_string()),
        DocumentFormat::Yaml => serde_yaml::from_slice::<Value>(bytes).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Check a parsed document against the level schema.
///
/// Expected shape: `{ "level": <level>, "levels"?: { <component>: <level> } }`.
/// `level` is required. Unknown top-level keys are ignored. Every violation is
/// reported, not just the first.
pub fn validate(value: &Value) -> Result<LevelConfig, ConfigError> {
    let Some(root) = value.as_object() else {
        return Err(ConfigError::Validation(vec![ValidationIssue::new(
            "$",
            format!("expected an object, found {}", kind_of(value)),
        )]));
    };

    let mut issues = Vec::new();

    let default_level = match root.get("level") {
        None => {
            issues.push(ValidationIssue::new("level", "is required"));
            None
        }
        Some(raw) => parse_level("level", raw, &mut issues),
    };

    let overrides = match root.get("levels") {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(map)) => parse_overrides(map, &mut issues),
        Some(other) => {
            issues.push(ValidationIssue::new(
                "levels",
                format!("expected an object, found {}", kind_of(other)),
            ));
            BTreeMap::new()
        }
    };

    match default_level {
        Some(default_level) if issues.is_empty() => Ok(LevelConfig {
            default_level,
            overrides,
        }),
        _ => Err(ConfigError::Validation(issues)),
    }
}

/// Validate, falling back to `previous` on any schema violation.
///
/// Never fails. Callers compare the result with what they hold to detect the
/// fallback.
pub fn validate_or_previous(value: &Value, previous: &Arc<LevelConfig>) -> Arc<LevelConfig> {
    match validate(value) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            trace!("Schema validation error: {}", e);
            Arc::clone(previous)
        }
    }
}

/// Read, parse and validate the level file.
///
/// Returns `Err` only when the file cannot be read. Malformed or schema-invalid
/// content yields `previous` unchanged.
pub async fn load(path: &Path, previous: &Arc<LevelConfig>) -> Result<Arc<LevelConfig>, ConfigError> {
    match read_document(path).await {
        Ok(value) => Ok(validate_or_previous(&value, previous)),
        Err(e @ ConfigError::Read { .. }) => Err(e),
        Err(e) => {
            trace!("Keeping previous level configuration: {}", e);
            Ok(Arc::clone(previous))
        }
    }
}

fn parse_overrides(map: &Map<String, Value>, issues: &mut Vec<ValidationIssue>) -> BTreeMap<String, Level> {
    let mut overrides = BTreeMap::new();
    for (component, raw) in map {
        let field = format!("levels.{}", component);
        if let Some(level) = parse_level(&field, raw, issues) {
            overrides.insert(component.clone(), level);
        }
    }
    overrides
}

fn parse_level(field: &str, raw: &Value, issues: &mut Vec<ValidationIssue>) -> Option<Level> {
    let Some(name) = raw.as_str() else {
        issues.push(ValidationIssue::new(
            field,
            format!("expected a level name, found {}", kind_of(raw)),
        ));
        return None;
    };
    match name.parse::<Level>() {
        Ok(level) => Some(level),
        Err(e) => {
            issues.push(ValidationIssue::new(field, e.to_string()));
            None
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

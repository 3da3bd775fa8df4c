//! Scope documents injected into every evaluation.
//!
//! A scope is inline JSON/YAML or `@path` to a file holding it. Scopes are
//! unified in order: mappings merge recursively, and two different values
//! for the same leaf are a conflict.

use std::path::PathBuf;

use serde_yaml::{Mapping, Value};

use crate::error::{CueError, CueResult};

/// Parse and unify `scopes`. Empty entries are skipped.
///
/// Returns `None` when no scope contributes data.
pub fn unify_scopes(scopes: &[String]) -> CueResult<Option<serde_json::Value>> {
    let mut unified: Option<Mapping> = None;

    for (index, scope) in scopes.iter().enumerate() {
        if scope.is_empty() {
            continue;
        }

        let fields = parse_scope(index, scope)?;
        unified = Some(match unified {
            None => fields,
            Some(current) => unify_mappings(current, fields, "")?,
        });
    }

    match unified {
        Some(fields) => Ok(Some(serde_json::to_value(Value::Mapping(fields))?)),
        None => Ok(None),
    }
}

fn parse_scope(index: usize, scope: &str) -> CueResult<Mapping> {
    let data = match scope.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).map_err(|source| CueError::ReadScope {
            path: PathBuf::from(path),
            source,
        })?,
        None => scope.to_string(),
    };

    let value: Value =
        serde_yaml::from_str(&data).map_err(|source| CueError::ParseScope { index, source })?;

    match value {
        Value::Mapping(fields) => Ok(fields),
        Value::Null => Ok(Mapping::new()),
        _ => Err(CueError::InvalidScope {
            index,
            message: "expected a mapping".to_string(),
        }),
    }
}

fn unify_mappings(mut base: Mapping, other: Mapping, path: &str) -> CueResult<Mapping> {
    for (key, value) in other {
        let field = match key.as_str() {
            Some(name) if path.is_empty() => name.to_string(),
            Some(name) => format!("{}.{}", path, name),
            None => format!("{}.{:?}", path, key),
        };

        match base.get_mut(&key) {
            None => {
                base.insert(key, value);
            }
            Some(existing) => {
                let current = std::mem::take(existing);
                *existing = unify_values(current, value, &field)?;
            }
        }
    }
    Ok(base)
}

fn unify_values(existing: Value, value: Value, path: &str) -> CueResult<Value> {
    match (existing, value) {
        (Value::Mapping(existing), Value::Mapping(value)) => {
            Ok(Value::Mapping(unify_mappings(existing, value, path)?))
        }
        (existing, value) if existing == value => Ok(existing),
        _ => Err(CueError::ScopeConflict {
            path: path.to_string(),
        }),
    }
}

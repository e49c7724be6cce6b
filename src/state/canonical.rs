//! Canonical state serialization
//!
//! The only persisted form of a [`WorldState`] is a key-sorted JSON string:
//! object keys lexicographically sorted at every depth, arrays in semantic
//! order, absent options omitted, no timestamps anywhere. serde_json's
//! default object map is ordered, which supplies the key sorting; this
//! module adds the bare-state shape check on top.

use serde_json::Value;

use crate::core::error::{EngineError, Result};
use crate::state::WorldState;

/// Fields a bare state object must carry. A value missing these is some
/// wrapper shape (an outcome envelope, a report, a diff) and must be
/// rejected rather than silently serialized.
const REQUIRED_KEYS: [&str; 3] = ["schema_version", "meta", "factions"];

/// Serializes a state to its canonical persisted form.
pub fn canonical_json(state: &WorldState) -> Result<String> {
    let value = serde_json::to_value(state)?;
    ensure_bare_state(&value)?;
    Ok(serde_json::to_string(&value)?)
}

/// Parses a canonical snapshot back into a state.
pub fn from_canonical(snapshot: &str) -> Result<WorldState> {
    let value: Value = serde_json::from_str(snapshot)?;
    ensure_bare_state(&value)?;
    Ok(serde_json::from_value(value)?)
}

fn ensure_bare_state(value: &Value) -> Result<()> {
    let Value::Object(map) = value else {
        return Err(EngineError::InvariantViolation(format!(
            "canonical serialization expects a bare state object, got {}",
            json_kind(value)
        )));
    };
    for key in REQUIRED_KEYS {
        if !map.contains_key(key) {
            return Err(EngineError::InvariantViolation(format!(
                "canonical serialization expects a bare state object, missing '{key}'"
            )));
        }
    }
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//! Argument binder
//!
//! Resolves an incoming arguments object against a tool's parameter specs:
//! exact-name match first, case-insensitive fallback second, declared default
//! third. Values are coerced to the declared type where the conversion is
//! lossless; anything else is an `InvalidParams` failure before the handler
//! ever runs.

// Layer 1: Standard library imports
use std::collections::HashMap;

// Layer 2: Third-party crate imports
use serde_json::{Map, Value};

// Layer 3: Internal module imports
use super::builder::{ParamSpec, ParamType};
use crate::protocol::{McpError, McpResult};

/// Arguments after binding: resolved, coerced, defaults injected
///
/// Lookup is by the declared (exact) parameter name.
#[derive(Debug, Clone, Default)]
pub struct BoundArguments {
    values: HashMap<String, Value>,
}

impl BoundArguments {
    /// Raw value of a bound parameter
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// String value of a bound parameter
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    /// Integer value of a bound parameter
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(Value::as_i64)
    }

    /// Float value of a bound parameter
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(Value::as_f64)
    }

    /// Boolean value of a bound parameter
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(Value::as_bool)
    }

    /// Number of bound parameters
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no parameters were bound
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Bind an arguments object against parameter specs
///
/// # Errors
///
/// Returns [`McpError::InvalidParams`] when a required parameter is missing,
/// the arguments value is not an object, or a value cannot be coerced to the
/// declared type.
pub fn bind_arguments(specs: &[ParamSpec], arguments: Option<&Value>) -> McpResult<BoundArguments> {
    let empty = Map::new();
    let object = match arguments {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(McpError::invalid_params(format!(
                "arguments must be an object, got {}",
                type_name(other)
            )))
        }
    };

    let mut bound = BoundArguments::default();
    for spec in specs {
        let value = resolve(object, &spec.name);
        match value {
            Some(raw) => {
                let coerced = coerce(raw, &spec.param_type).map_err(|detail| {
                    McpError::invalid_params(format!(
                        "parameter '{}': {detail}",
                        spec.name
                    ))
                })?;
                bound.values.insert(spec.name.clone(), coerced);
            }
            None => match (&spec.default, spec.required) {
                (Some(default), _) => {
                    bound.values.insert(spec.name.clone(), default.clone());
                }
                (None, true) => {
                    return Err(McpError::invalid_params(format!(
                        "missing required parameter '{}'",
                        spec.name
                    )))
                }
                (None, false) => {}
            },
        }
    }

    Ok(bound)
}

/// Exact-name lookup, then case-insensitive fallback
fn resolve<'a>(object: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    if let Some(value) = object.get(name) {
        return Some(value);
    }
    object
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Coerce a JSON value to the declared parameter type
///
/// Lossless conversions only: a float with no fractional part becomes an
/// integer, an integer widens to a number, and everything else must already
/// carry the declared type.
fn coerce(value: &Value, param_type: &ParamType) -> Result<Value, String> {
    match param_type {
        ParamType::String | ParamType::Enum(_) => match value {
            Value::String(s) => {
                if let ParamType::Enum(allowed) = param_type {
                    if !allowed.iter().any(|candidate| candidate == s) {
                        return Err(format!("'{s}' is not one of {allowed:?}"));
                    }
                }
                Ok(value.clone())
            }
            other => Err(format!("expected string, got {}", type_name(other))),
        },
        ParamType::Integer => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.fract() == 0.0 => Ok(Value::from(f as i64)),
                _ => Err("expected integer, got fractional number".to_string()),
            },
            other => Err(format!("expected integer, got {}", type_name(other))),
        },
        ParamType::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            other => Err(format!("expected number, got {}", type_name(other))),
        },
        ParamType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            other => Err(format!("expected boolean, got {}", type_name(other))),
        },
        ParamType::Array(items) => match value {
            Value::Array(elements) => {
                let coerced: Result<Vec<Value>, String> =
                    elements.iter().map(|e| coerce(e, items)).collect();
                Ok(Value::Array(coerced?))
            }
            other => Err(format!("expected array, got {}", type_name(other))),
        },
        ParamType::Object => match value {
            Value::Object(_) => Ok(value.clone()),
            other => Err(format!("expected object, got {}", type_name(other))),
        },
    }
}

//! Parameter validation for create requests.
//!
//! Every declared input is checked in declaration order and every problem is
//! collected, so a caller sees all of them in one round trip.

use serde_json::{Map, Value};

use crate::model::{ComponentDefinition, ParamType, Parameter};

/// Parameters that passed validation, in declaration order, defaults filled in.
pub type ValidatedParams = Map<String, Value>;

/// Coerce a supplied value to a finite number. JSON numbers pass; strings are
/// parsed after trimming; anything else (booleans, null, arrays) fails.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

/// Append a range message for each bound `value` violates.
fn check_range(param: &Parameter, value: f64, errors: &mut Vec<String>) {
    if let Some(min) = param.min_value() {
        if value < min {
            errors.push(format!("{} must be >= {min}", param.name()));
        }
    }
    if let Some(max) = param.max_value() {
        if value > max {
            errors.push(format!("{} must be <= {max}", param.name()));
        }
    }
}

/// Validate `supplied` against the inputs of `definition`.
///
/// Keys that match no declared input are ignored.
pub fn validate_params(
    definition: &ComponentDefinition,
    supplied: &Map<String, Value>,
) -> Result<ValidatedParams, Vec<String>> {
    let mut validated = ValidatedParams::new();
    let mut errors = Vec::new();

    for param in definition.input_params() {
        match supplied.get(param.name()) {
            Some(value) if param.param_type() == ParamType::Number => match coerce_number(value) {
                Some(number) => {
                    check_range(param, number, &mut errors);
                    validated.insert(param.name().to_string(), Value::from(number));
                }
                None => errors.push(format!("{} must be a number", param.name())),
            },
            Some(value) => {
                validated.insert(param.name().to_string(), value.clone());
            }
            None if param.is_required() => {
                errors.push(format!("Required parameter '{}' is missing", param.name()));
            }
            None => {
                if let Some(default) = param.default_value() {
                    validated.insert(param.name().to_string(), default.to_json());
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(validated)
    } else {
        Err(errors)
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kinds of data a component slot can carry. Closed set: adding a kind
/// forces every match over it to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamType {
    Number,
    Point,
    Vector,
    Plane,
    Curve,
    Surface,
    #[serde(alias = "Brep")]
    Solid,
    Mesh,
    Geometry,
    Text,
    Boolean,
    Color,
}

impl ParamType {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Number => "Number",
            Self::Point => "Point",
            Self::Vector => "Vector",
            Self::Plane => "Plane",
            Self::Curve => "Curve",
            Self::Surface => "Surface",
            Self::Solid => "Solid",
            Self::Mesh => "Mesh",
            Self::Geometry => "Geometry",
            Self::Text => "Text",
            Self::Boolean => "Boolean",
            Self::Color => "Color",
        }
    }

    /// Geometric types can default to a named built-in such as "XY plane".
    pub fn is_geometric(self) -> bool {
        matches!(
            self,
            Self::Point
                | Self::Vector
                | Self::Plane
                | Self::Curve
                | Self::Surface
                | Self::Solid
                | Self::Mesh
                | Self::Geometry
        )
    }

    pub fn all() -> &'static [ParamType] {
        &[
            Self::Number,
            Self::Point,
            Self::Vector,
            Self::Plane,
            Self::Curve,
            Self::Surface,
            Self::Solid,
            Self::Mesh,
            Self::Geometry,
            Self::Text,
            Self::Boolean,
            Self::Color,
        ]
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Type-safe default values. Serializes as the bare JSON scalar so it can be
/// dropped straight into a wire command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Boolean(bool),
    Text(String),
    /// A built-in the remote resolves by name ("XY plane", "Z-axis", "Origin").
    Named(String),
}

impl ParamValue {
    pub fn named(name: impl Into<String>) -> Self {
        ParamValue::Named(name.into())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether this value is an acceptable default for a slot of `ty`.
    pub fn fits(&self, ty: ParamType) -> bool {
        match self {
            ParamValue::Number(_) => ty == ParamType::Number,
            ParamValue::Boolean(_) => ty == ParamType::Boolean,
            ParamValue::Text(_) => matches!(ty, ParamType::Text | ParamType::Color),
            ParamValue::Named(_) => ty.is_geometric(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Number(v) => serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number),
            ParamValue::Boolean(v) => Value::Bool(*v),
            ParamValue::Text(v) | ParamValue::Named(v) => Value::String(v.clone()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(v) => write!(f, "{v}"),
            ParamValue::Boolean(v) => write!(f, "{v}"),
            ParamValue::Text(v) | ParamValue::Named(v) => f.write_str(v),
        }
    }
}

/// One named input or output slot of a component.
///
/// Built through [`Parameter::required`], [`Parameter::optional`] or
/// [`Parameter::output`]; the invariants (no default on required slots, bounds
/// only on numbers) are checked when the owning
/// [`ComponentDefinition`](super::ComponentDefinition) is constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    name: String,
    internal_name: String,
    param_type: ParamType,
    description: String,
    required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_value: Option<ParamValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_value: Option<f64>,
}

impl Parameter {
    fn new(
        name: &str,
        internal_name: &str,
        param_type: ParamType,
        description: &str,
        required: bool,
    ) -> Self {
        Self {
            name: name.to_string(),
            internal_name: internal_name.to_string(),
            param_type,
            description: description.to_string(),
            required,
            default_value: None,
            min_value: None,
            max_value: None,
        }
    }

    pub fn required(name: &str, internal_name: &str, param_type: ParamType, description: &str) -> Self {
        Self::new(name, internal_name, param_type, description, true)
    }

    pub fn optional(name: &str, internal_name: &str, param_type: ParamType, description: &str) -> Self {
        Self::new(name, internal_name, param_type, description, false)
    }

    /// Output slots are never supplied by callers, so they are never required.
    pub fn output(name: &str, internal_name: &str, param_type: ParamType, description: &str) -> Self {
        Self::new(name, internal_name, param_type, description, false)
    }

    pub fn with_default(mut self, value: ParamValue) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min_value = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max_value = Some(max);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn internal_name(&self) -> &str {
        &self.internal_name
    }

    pub fn param_type(&self) -> ParamType {
        self.param_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&ParamValue> {
        self.default_value.as_ref()
    }

    pub fn min_value(&self) -> Option<f64> {
        self.min_value
    }

    pub fn max_value(&self) -> Option<f64> {
        self.max_value
    }

    /// First broken invariant, if any.
    pub(super) fn check(&self) -> Result<(), String> {
        if self.required && self.default_value.is_some() {
            return Err(format!("required parameter '{}' must not have a default", self.name));
        }
        let has_bounds = self.min_value.is_some() || self.max_value.is_some();
        if has_bounds && self.param_type != ParamType::Number {
            return Err(format!(
                "parameter '{}' of type {} cannot carry numeric bounds",
                self.name, self.param_type
            ));
        }
        if let (Some(min), Some(max)) = (self.min_value, self.max_value) {
            if min > max {
                return Err(format!("parameter '{}' has min {min} above max {max}", self.name));
            }
        }
        if let Some(default) = &self.default_value {
            if !default.fits(self.param_type) {
                return Err(format!(
                    "default '{default}' does not fit parameter '{}' of type {}",
                    self.name, self.param_type
                ));
            }
            if let Some(v) = default.as_number() {
                let below = self.min_value.is_some_and(|min| v < min);
                let above = self.max_value.is_some_and(|max| v > max);
                if below || above {
                    return Err(format!("default {v} of parameter '{}' is out of range", self.name));
                }
            }
        }
        Ok(())
    }
}

pub mod catalog;
pub mod reference;
pub mod validation;

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::model::ComponentDefinition;

pub use validation::ValidatedParams;

/// In-memory catalog of component kinds, keyed by lowercased name.
///
/// Populated once at startup and then shared read-only behind an `Arc`, so
/// lookups and validation never contend with remote exchanges.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    components: IndexMap<String, Arc<ComponentDefinition>>,
}

/// Registry and identity-table key form of a name.
pub(crate) fn canonical(name: &str) -> String {
    name.trim().to_lowercase()
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in catalog.
    pub fn builtin() -> Result<Self, AppError> {
        let mut registry = Self::new();
        for definition in catalog::builtin_components()? {
            registry.register(definition);
        }
        tracing::debug!(count = registry.len(), "loaded component definitions");
        Ok(registry)
    }

    /// Insert or replace a definition. Last write wins: a replaced key keeps
    /// its original position in [`list`](Self::list).
    pub fn register(&mut self, definition: ComponentDefinition) -> Option<Arc<ComponentDefinition>> {
        let key = definition.key();
        let replaced = self.components.insert(key, Arc::new(definition));
        if let Some(old) = &replaced {
            tracing::warn!(component = old.name(), "replaced existing component definition");
        }
        replaced
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<ComponentDefinition>> {
        self.components.get(&canonical(name)).cloned()
    }

    /// Registry keys in insertion order.
    pub fn list(&self) -> Vec<&str> {
        self.components.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Arc<ComponentDefinition>> {
        self.components.values()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Arc<ComponentDefinition>)> {
        self.components.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Distinct categories, in the order they first appear.
    pub fn categories(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for def in self.components.values() {
            if !out.contains(&def.category()) {
                out.push(def.category());
            }
        }
        out
    }

    pub fn by_category(&self, category: &str) -> Vec<Arc<ComponentDefinition>> {
        let wanted = canonical(category);
        self.components
            .values()
            .filter(|def| def.category().to_lowercase() == wanted)
            .cloned()
            .collect()
    }

    /// Definitions whose name, description, or any example contains `query`,
    /// case-insensitively.
    pub fn search(&self, query: &str) -> Vec<Arc<ComponentDefinition>> {
        let query = query.to_lowercase();
        self.components
            .values()
            .filter(|def| {
                def.name().to_lowercase().contains(&query)
                    || def.description().to_lowercase().contains(&query)
                    || def.examples().iter().any(|e| e.to_lowercase().contains(&query))
            })
            .cloned()
            .collect()
    }

    /// Validate `supplied` against the inputs of component `name`.
    ///
    /// Unknown names fail with [`AppError::UnknownComponent`]; parameter
    /// problems are collected into one [`AppError::InvalidParameters`].
    pub fn validate(&self, name: &str, supplied: &Map<String, Value>) -> Result<ValidatedParams, AppError> {
        self.prepare(name, supplied).map(|(_, validated)| validated)
    }

    /// Like [`validate`](Self::validate), also handing back the definition.
    pub fn prepare(
        &self,
        name: &str,
        supplied: &Map<String, Value>,
    ) -> Result<(Arc<ComponentDefinition>, ValidatedParams), AppError> {
        let definition = self.lookup(name).ok_or_else(|| AppError::UnknownComponent {
            name: name.to_string(),
        })?;
        let validated =
            validation::validate_params(&definition, supplied).map_err(|messages| AppError::InvalidParameters {
                component: definition.key(),
                messages,
            })?;
        Ok((definition, validated))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;
    use crate::model::{ParamType, Parameter};
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn registry() -> ComponentRegistry {
        ComponentRegistry::builtin().unwrap()
    }

    fn messages(err: AppError) -> Vec<String> {
        match err {
            AppError::InvalidParameters { messages, .. } => messages,
            other => panic!("expected InvalidParameters, got {other:?}"),
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let reg = registry();
        assert_eq!(reg.lookup("CIRCLE").unwrap().internal_name(), "GH_Circle");
        assert_eq!(reg.lookup("Number Slider").unwrap().internal_name(), "GH_NumberSlider");
        assert!(reg.lookup("torus").is_none());
    }

    #[test]
    fn test_list_in_insertion_order() {
        let reg = registry();
        let keys = reg.list();
        assert_eq!(keys.len(), 16);
        assert_eq!(&keys[..4], &["point", "vector", "plane", "circle"]);
        assert_eq!(keys[15], "number slider");
    }

    #[test]
    fn test_register_last_write_wins_keeps_position() {
        let mut reg = registry();
        let replacement = ComponentDefinition::builder("Vector", "GH_VectorXYZ")
            .category("Vector", "Vector")
            .build()
            .unwrap();
        let old = reg.register(replacement).unwrap();
        assert_eq!(old.internal_name(), "GH_Vector");
        assert_eq!(reg.lookup("vector").unwrap().internal_name(), "GH_VectorXYZ");
        assert_eq!(reg.list()[1], "vector");
        assert_eq!(reg.len(), 16);
    }

    #[test]
    fn test_by_category_case_insensitive() {
        let reg = registry();
        let curves: Vec<_> = reg.by_category("curve").iter().map(|d| d.name().to_string()).collect();
        assert_eq!(curves, vec!["Circle", "Line", "Rectangle", "Polyline"]);
        assert!(reg.by_category("Nope").is_empty());
    }

    #[test]
    fn test_categories_first_seen_order() {
        let reg = registry();
        assert_eq!(reg.categories(), vec!["Params", "Vector", "Curve", "Surface", "Transform", "Math"]);
    }

    #[test]
    fn test_search_matches_name_description_and_examples() {
        let reg = registry();
        let names = |q: &str| -> Vec<String> { reg.search(q).iter().map(|d| d.name().to_string()).collect() };
        assert_eq!(names("CIRC"), vec!["Circle", "Extrude"]);
        assert!(names("cylinder").contains(&"Extrude".to_string()));
        assert!(names("multiply").contains(&"Multiplication".to_string()));
        assert!(names("zzz").is_empty());
    }

    #[test]
    fn test_validate_unknown_component() {
        let err = registry().validate("torus", &Map::new()).unwrap_err();
        assert!(matches!(err, AppError::UnknownComponent { ref name } if name == "torus"));
    }

    #[test]
    fn test_validate_fills_defaults_in_declaration_order() {
        let validated = registry().validate("circle", &params(json!({ "Radius": 10 }))).unwrap();
        let keys: Vec<&String> = validated.keys().collect();
        assert_eq!(keys, vec!["Plane", "Radius"]);
        assert_eq!(validated["Plane"], json!("XY plane"));
        assert_eq!(validated["Radius"], json!(10.0));
    }

    #[test]
    fn test_negative_radius_is_range_error() {
        let err = registry().validate("circle", &params(json!({ "Radius": -5 }))).unwrap_err();
        assert!(err.to_string().contains("Radius must be >= 0"));
    }

    #[test]
    fn test_non_numeric_radius_is_type_error() {
        let err = registry().validate("circle", &params(json!({ "Radius": "abc" }))).unwrap_err();
        assert_eq!(messages(err), vec!["Radius must be a number"]);
    }

    #[test]
    fn test_numeric_string_is_coerced() {
        let validated = registry().validate("circle", &params(json!({ "Radius": "2.5" }))).unwrap();
        assert_eq!(validated["Radius"], json!(2.5));
    }

    #[test]
    fn test_missing_required_named_once_each() {
        let err = registry().validate("point", &params(json!({ "Y": 1 }))).unwrap_err();
        let msgs = messages(err);
        assert_eq!(
            msgs,
            vec!["Required parameter 'X' is missing", "Required parameter 'Z' is missing"]
        );
        assert_eq!(msgs.iter().filter(|m| m.contains("'X'")).count(), 1);
    }

    #[test]
    fn test_errors_collected_and_joined() {
        let err = registry()
            .validate("rectangle", &params(json!({ "X Size": -1, "Y Size": "wide" })))
            .unwrap_err();
        assert_eq!(err.to_string(), "X Size must be >= 0; Y Size must be a number");
    }

    #[test]
    fn test_max_bound_checked() {
        let mut reg = ComponentRegistry::new();
        reg.register(
            ComponentDefinition::builder("Percent", "GH_Percent")
                .input(Parameter::required("Value", "V", ParamType::Number, "Percent").with_min(0.0).with_max(100.0))
                .build()
                .unwrap(),
        );
        let err = reg.validate("percent", &params(json!({ "Value": 150 }))).unwrap_err();
        assert_eq!(err.to_string(), "Value must be <= 100");
    }

    #[test]
    fn test_non_number_types_pass_through_and_unknown_keys_ignored() {
        let validated = registry()
            .validate("line", &params(json!({ "Start": [0, 0, 0], "End": "pt2", "Colour": "red" })))
            .unwrap();
        assert_eq!(validated.len(), 2);
        assert_eq!(validated["Start"], json!([0, 0, 0]));
        assert_eq!(validated["End"], json!("pt2"));
        assert!(!validated.contains_key("Colour"));
    }

    #[test]
    fn test_optional_without_default_is_omitted() {
        let mut reg = ComponentRegistry::new();
        reg.register(
            ComponentDefinition::builder("Tag", "GH_Tag")
                .input(Parameter::optional("Label", "L", ParamType::Text, "Label"))
                .build()
                .unwrap(),
        );
        assert!(reg.validate("tag", &Map::new()).unwrap().is_empty());
    }

    #[test]
    fn test_validation_is_deterministic() {
        let reg = registry();
        let input = params(json!({ "X": "1", "Y": -3, "Z": "oops", "W": 9 }));
        let first = reg.validate("point", &input).unwrap_err().to_string();
        for _ in 0..5 {
            assert_eq!(reg.validate("point", &input).unwrap_err().to_string(), first);
        }
        let ok = params(json!({ "X": 1, "Y": 2, "Z": 3 }));
        assert_eq!(reg.validate("point", &ok).unwrap(), reg.validate("point", &ok).unwrap());
    }
}

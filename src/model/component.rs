use std::collections::HashSet;

use serde::Serialize;

use super::Parameter;
use crate::error::AppError;

/// Immutable descriptor of one component kind the remote tool can create.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentDefinition {
    name: String,
    internal_name: String,
    category: String,
    subcategory: String,
    description: String,
    input_params: Vec<Parameter>,
    output_params: Vec<Parameter>,
    examples: Vec<String>,
}

impl ComponentDefinition {
    /// Start a definition. Finish with [`ComponentBuilder::build`], which checks
    /// every parameter invariant.
    pub fn builder(name: &str, internal_name: &str) -> ComponentBuilder {
        ComponentBuilder {
            name: name.to_string(),
            internal_name: internal_name.to_string(),
            category: String::new(),
            subcategory: String::new(),
            description: String::new(),
            input_params: Vec::new(),
            output_params: Vec::new(),
            examples: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registry key: the lowercased display name.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn internal_name(&self) -> &str {
        &self.internal_name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn subcategory(&self) -> &str {
        &self.subcategory
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input_params(&self) -> &[Parameter] {
        &self.input_params
    }

    pub fn output_params(&self) -> &[Parameter] {
        &self.output_params
    }

    pub fn examples(&self) -> &[String] {
        &self.examples
    }
}

pub struct ComponentBuilder {
    name: String,
    internal_name: String,
    category: String,
    subcategory: String,
    description: String,
    input_params: Vec<Parameter>,
    output_params: Vec<Parameter>,
    examples: Vec<String>,
}

impl ComponentBuilder {
    pub fn category(mut self, category: &str, subcategory: &str) -> Self {
        self.category = category.to_string();
        self.subcategory = subcategory.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn input(mut self, param: Parameter) -> Self {
        self.input_params.push(param);
        self
    }

    pub fn output(mut self, param: Parameter) -> Self {
        self.output_params.push(param);
        self
    }

    pub fn example(mut self, example: &str) -> Self {
        self.examples.push(example.to_string());
        self
    }

    pub fn build(self) -> Result<ComponentDefinition, AppError> {
        let invalid = |message: String| AppError::Definition {
            component: self.name.clone(),
            message,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty".into()));
        }
        for (list, params) in [("input", &self.input_params), ("output", &self.output_params)] {
            let mut seen = HashSet::new();
            for param in params {
                if !seen.insert(param.name()) {
                    return Err(invalid(format!("duplicate {list} parameter '{}'", param.name())));
                }
                param.check().map_err(invalid)?;
            }
        }
        for param in &self.output_params {
            if param.is_required() {
                return Err(invalid(format!("output parameter '{}' cannot be required", param.name())));
            }
        }

        Ok(ComponentDefinition {
            name: self.name,
            internal_name: self.internal_name,
            category: self.category,
            subcategory: self.subcategory,
            description: self.description,
            input_params: self.input_params,
            output_params: self.output_params,
            examples: self.examples,
        })
    }
}

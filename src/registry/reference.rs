use std::fmt::Write;
use std::path::Path;

use indexmap::IndexMap;

use super::ComponentRegistry;
use crate::error::AppError;
use crate::model::{ComponentDefinition, Parameter};

fn input_line(param: &Parameter) -> String {
    let requirement = if param.is_required() { "required" } else { "optional" };
    let mut line = format!(
        "- {} ({}): {} ({requirement})",
        param.name(),
        param.param_type(),
        param.description(),
    );
    if let Some(default) = param.default_value() {
        let _ = write!(line, " [default: {default}]");
    }
    match (param.min_value(), param.max_value()) {
        (Some(min), Some(max)) => {
            let _ = write!(line, " [range: {min}..{max}]");
        }
        (Some(min), None) => {
            let _ = write!(line, " [min: {min}]");
        }
        (None, Some(max)) => {
            let _ = write!(line, " [max: {max}]");
        }
        (None, None) => {}
    }
    line
}

fn component_section(out: &mut String, key: &str, def: &ComponentDefinition) {
    let _ = writeln!(out, "### {} ({key})", def.name());
    let _ = writeln!(out, "{}\n", def.description());

    if !def.input_params().is_empty() {
        out.push_str("**Inputs:**\n");
        for param in def.input_params() {
            out.push_str(&input_line(param));
            out.push('\n');
        }
        out.push('\n');
    }

    if !def.output_params().is_empty() {
        out.push_str("**Outputs:**\n");
        for param in def.output_params() {
            let _ = writeln!(out, "- {} ({}): {}", param.name(), param.param_type(), param.description());
        }
        out.push('\n');
    }

    if !def.examples().is_empty() {
        out.push_str("**Examples:**\n");
        for example in def.examples() {
            let _ = writeln!(out, "- {example}");
        }
        out.push('\n');
    }

    out.push_str("---\n\n");
}

/// Markdown reference of every component, grouped by category, for an LLM
/// system prompt.
pub fn component_reference(registry: &ComponentRegistry) -> String {
    let mut out = String::from("Available Grasshopper Components:\n\n");

    for category in registry.categories() {
        let _ = writeln!(out, "## {category}\n");
        for (key, def) in registry.entries().filter(|(_, d)| d.category() == category) {
            component_section(&mut out, key, def);
        }
    }

    out
}

/// Reference for a single component, or `None` if it is not registered.
pub fn describe_component(registry: &ComponentRegistry, name: &str) -> Option<String> {
    let def = registry.lookup(name)?;
    let mut out = String::new();
    component_section(&mut out, &def.key(), &def);
    Some(out)
}

/// Write the registry as a JSON knowledge base keyed by registry key.
pub fn export_knowledge_base(registry: &ComponentRegistry, path: &Path) -> Result<usize, AppError> {
    let data: IndexMap<&str, &ComponentDefinition> =
        registry.entries().map(|(key, def)| (key, def.as_ref())).collect();
    crate::persist::write_json(path, &data)?;
    tracing::info!(path = %path.display(), count = data.len(), "exported component knowledge base");
    Ok(data.len())
}

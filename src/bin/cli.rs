// CLI binary: exiting or panicking on unrecoverable errors is acceptable here.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use gh_bridge::error::AppError;
use gh_bridge::model::ComponentDefinition;
use gh_bridge::registry::{reference, ComponentRegistry};
use gh_bridge::settings::{self, BridgeSettings};
use gh_bridge::state::AppState;
use gh_bridge::{logging, paths};

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "gh-bridge-cli", about = "Grasshopper bridge headless CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config directory override
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Remote host override
    #[arg(long, global = true)]
    remote_host: Option<String>,

    /// Remote port override
    #[arg(long, global = true)]
    remote_port: Option<u16>,

    /// Per-operation timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Output raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered component names
    List,
    /// Search names, descriptions, and examples
    Search { query: String },
    /// Components in a category
    Category { name: String },
    /// Markdown reference for one component, or all of them
    Describe { name: Option<String> },
    /// Validate parameters without contacting the remote
    Validate {
        component: String,
        /// Parameters as a JSON object
        params: Option<String>,
    },
    /// Export the registry as a JSON knowledge base
    Export { path: Option<PathBuf> },
    /// Create one component on the remote canvas
    Create {
        component: String,
        /// Parameters as a JSON object
        params: Option<String>,
        /// Record the instance under this name
        #[arg(long = "as")]
        instance: Option<String>,
    },
    /// Clear the remote canvas
    Clear,
    /// Run a JSON array of create/connect/clear steps in one session
    Run { file: PathBuf },
    /// Show effective settings
    Config {
        /// Persist the effective settings to settings.json
        #[arg(long)]
        save: bool,
    },
}

// ── Scripted sessions ────────────────────────────────────────────

/// One step of a `run` script, e.g.
/// `{"op": "create", "component": "circle", "parameters": {"Radius": 10}}`.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Step {
    Create {
        component: String,
        #[serde(default, rename = "as")]
        instance: Option<String>,
        #[serde(default)]
        parameters: Map<String, Value>,
    },
    Connect {
        source: String,
        source_param: String,
        target: String,
        target_param: String,
    },
    Clear,
}

fn parse_steps(text: &str) -> Result<Vec<Step>, String> {
    serde_json::from_str(text).map_err(|e| format!("Invalid steps file: {e}"))
}

async fn run_step(state: &AppState, step: &Step) -> Result<(String, Value), AppError> {
    match step {
        Step::Create {
            component,
            instance,
            parameters,
        } => {
            let name = instance.as_deref().unwrap_or(component);
            let created = state.bridge.create_component_as(name, component, parameters).await?;
            let message = format!(
                "Created {} as '{}' ({})",
                created.component,
                created.instance_name,
                created.component_guid.as_deref().unwrap_or("no guid")
            );
            Ok((message, to_value(&created)))
        }
        Step::Connect {
            source,
            source_param,
            target,
            target_param,
        } => {
            let connection = state
                .bridge
                .connect_components(source, source_param, target, target_param)
                .await?;
            let message = format!(
                "Connected {}.{} -> {}.{}",
                connection.source_component, connection.source_param, connection.target_component, connection.target_param
            );
            Ok((message, to_value(&connection)))
        }
        Step::Clear => {
            let cleared = state.bridge.clear_canvas().await?;
            Ok((format!("Canvas cleared ({} forgotten)", cleared.forgotten), to_value(&cleared)))
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn parse_params(raw: Option<&str>) -> Result<Map<String, Value>, String> {
    match raw {
        None => Ok(Map::new()),
        Some(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err("Parameters must be a JSON object".to_string()),
            Err(e) => Err(format!("Invalid parameters JSON: {e}")),
        },
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {message}");
    process::exit(1);
}

fn effective_settings(cli: &Cli, config_dir: &std::path::Path) -> BridgeSettings {
    let mut settings = settings::load_or_default(config_dir);
    if let Some(host) = &cli.remote_host {
        settings.remote.host.clone_from(host);
    }
    if let Some(port) = cli.remote_port {
        settings.remote.port = port;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        settings.remote.timeout_ms = timeout_ms;
    }
    settings
}

fn initialize_state(cli: &Cli) -> Arc<AppState> {
    let config_dir = cli.config_dir.clone().unwrap_or_else(paths::default_config_dir);
    let settings = effective_settings(cli, &config_dir);
    Arc::new(AppState::new(settings).unwrap_or_else(|e| fail(e)))
}

// ── Output formatting ────────────────────────────────────────────

fn print_output(message: &str, data: &Value, raw_json: bool) {
    if raw_json {
        let json = serde_json::json!({ "message": message, "data": data });
        println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        return;
    }
    println!("{message}");
}

fn print_definitions(defs: &[Arc<ComponentDefinition>], raw_json: bool) {
    let data: Vec<&ComponentDefinition> = defs.iter().map(AsRef::as_ref).collect();
    let lines: Vec<String> = defs
        .iter()
        .map(|d| format!("{:<16} {:<20} {}", d.key(), format!("{}/{}", d.category(), d.subcategory()), d.description()))
        .collect();
    let message = if lines.is_empty() {
        "No matching components".to_string()
    } else {
        lines.join("\n")
    };
    print_output(&message, &to_value(&data), raw_json);
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("[gh-bridge] {e}");
    }

    let registry = || ComponentRegistry::builtin().unwrap_or_else(|e| fail(e));

    match &cli.command {
        Commands::List => {
            let registry = registry();
            let names = registry.list();
            print_output(&names.join("\n"), &to_value(&names), cli.json);
        }
        Commands::Search { query } => print_definitions(&registry().search(query), cli.json),
        Commands::Category { name } => print_definitions(&registry().by_category(name), cli.json),
        Commands::Describe { name } => {
            let registry = registry();
            let text = match name {
                Some(name) => reference::describe_component(&registry, name)
                    .unwrap_or_else(|| fail(AppError::UnknownComponent { name: name.clone() })),
                None => reference::component_reference(&registry),
            };
            print_output(&text, &Value::String(text.clone()), cli.json);
        }
        Commands::Validate { component, params } => {
            let supplied = parse_params(params.as_deref()).unwrap_or_else(|e| fail(e));
            let validated = registry().validate(component, &supplied).unwrap_or_else(|e| fail(e));
            let message = format!("Valid parameters for {component}");
            print_output(&message, &Value::Object(validated), cli.json);
        }
        Commands::Export { path } => {
            let path = path.clone().unwrap_or_else(|| {
                paths::knowledge_base_path(&cli.config_dir.clone().unwrap_or_else(paths::default_config_dir))
            });
            let count = reference::export_knowledge_base(&registry(), &path).unwrap_or_else(|e| fail(e));
            let message = format!("Exported {count} components to {}", path.display());
            print_output(&message, &serde_json::json!({ "path": path, "count": count }), cli.json);
        }
        Commands::Create {
            component,
            params,
            instance,
        } => {
            let state = initialize_state(&cli);
            let parameters = parse_params(params.as_deref()).unwrap_or_else(|e| fail(e));
            let step = Step::Create {
                component: component.clone(),
                instance: instance.clone(),
                parameters,
            };
            let (message, data) = run_step(&state, &step).await.unwrap_or_else(|e| fail(e));
            print_output(&message, &data, cli.json);
        }
        Commands::Clear => {
            let state = initialize_state(&cli);
            let (message, data) = run_step(&state, &Step::Clear).await.unwrap_or_else(|e| fail(e));
            print_output(&message, &data, cli.json);
        }
        Commands::Run { file } => {
            let text = std::fs::read_to_string(file)
                .unwrap_or_else(|e| fail(format!("Failed to read {}: {e}", file.display())));
            let steps = parse_steps(&text).unwrap_or_else(|e| fail(e));
            let state = initialize_state(&cli);

            for (i, step) in steps.iter().enumerate() {
                match run_step(&state, step).await {
                    Ok((message, data)) => print_output(&format!("[{}] {message}", i + 1), &data, cli.json),
                    Err(e) => fail(format!("step {} failed: {e}", i + 1)),
                }
            }

            let table = state.bridge.created_components().await;
            print_output(
                &format!("{} steps completed, {} components recorded", steps.len(), table.len()),
                &to_value(&table),
                cli.json,
            );
        }
        Commands::Config { save } => {
            let config_dir = cli.config_dir.clone().unwrap_or_else(paths::default_config_dir);
            let settings = effective_settings(&cli, &config_dir);
            settings.validate().unwrap_or_else(|e| fail(e));
            if *save {
                settings::save_settings(&config_dir, &settings).unwrap_or_else(|e| fail(e));
                eprintln!("[gh-bridge] Saved {}", paths::settings_path(&config_dir).display());
            }
            let message = format!(
                "remote: {} (timeout {} ms)\napi:    {}:{}\nconfig: {}",
                settings.remote.address(),
                settings.remote.timeout_ms,
                settings.api.host,
                settings.api.port,
                config_dir.display()
            );
            print_output(&message, &to_value(&settings), cli.json);
        }
    }
}

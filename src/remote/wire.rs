//! Newline-delimited JSON messages exchanged with the design-tool process.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One request to the remote process. Serialized with the `command` tag the
/// remote dispatches on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WireCommand {
    CreateComponent {
        component_name: String,
        parameters: Map<String, Value>,
    },
    ConnectParameters {
        source_component_guid: String,
        source_parameter_name: String,
        target_component_guid: String,
        target_parameter_name: String,
    },
    ClearCanvas,
}

impl WireCommand {
    pub fn name(&self) -> &'static str {
        match self {
            WireCommand::CreateComponent { .. } => "create_component",
            WireCommand::ConnectParameters { .. } => "connect_parameters",
            WireCommand::ClearCanvas => "clear_canvas",
        }
    }

    /// Encode as a single line, newline included.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// The remote's answer. Only `success` is guaranteed; anything beyond the
/// known fields is kept in `extra` and passed back to callers untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RemoteResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            component_guid: None,
            error: None,
            message: None,
            extra: Map::new(),
        }
    }

    pub fn created(guid: impl Into<String>) -> Self {
        Self {
            component_guid: Some(guid.into()),
            ..Self::ok()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::ok()
        }
    }

    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim_end_matches(['\r', '\n']))
    }

    /// The remote's failure payload, or a placeholder if it sent none.
    pub fn error_text(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "Remote reported failure without an error message".to_string())
    }
}

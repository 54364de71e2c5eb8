use std::fmt;

use serde::Serialize;

/// Which end of a connection request failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Source,
    Target,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Source => f.write_str("source"),
            Endpoint::Target => f.write_str("target"),
        }
    }
}

/// A symbolic name that has no recorded external identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedName {
    pub side: Endpoint,
    pub name: String,
}

/// Structured error type for the bridge. Callers branch on the variant, never
/// on the message text; the HTTP layer serializes it as `{code, detail}`.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[serde(tag = "code", content = "detail")]
pub enum AppError {
    #[error("Unknown component: {name}")]
    UnknownComponent { name: String },

    #[error("{}", .messages.join("; "))]
    InvalidParameters {
        component: String,
        messages: Vec<String>,
    },

    #[error("Component not created: {}", describe_unresolved(.missing))]
    ComponentNotCreated { missing: Vec<UnresolvedName> },

    #[error("Remote unavailable: {message}")]
    RemoteUnavailable { message: String },

    /// The remote answered `success: false`; `message` is its payload verbatim.
    #[error("{message}")]
    RemoteRejected { message: String },

    #[error("Invalid component definition '{component}': {message}")]
    Definition { component: String, message: String },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

fn describe_unresolved(missing: &[UnresolvedName]) -> String {
    missing
        .iter()
        .map(|m| format!("{} '{}'", m.side, m.name))
        .collect::<Vec<_>>()
        .join(", ")
}

impl AppError {
    pub(crate) fn remote_unavailable(message: impl Into<String>) -> Self {
        AppError::RemoteUnavailable {
            message: message.into(),
        }
    }

    /// Stable machine-readable code, matching the serialized `code` tag.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::UnknownComponent { .. } => "UnknownComponent",
            AppError::InvalidParameters { .. } => "InvalidParameters",
            AppError::ComponentNotCreated { .. } => "ComponentNotCreated",
            AppError::RemoteUnavailable { .. } => "RemoteUnavailable",
            AppError::RemoteRejected { .. } => "RemoteRejected",
            AppError::Definition { .. } => "Definition",
            AppError::Io { .. } => "Io",
            AppError::Config { .. } => "Config",
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io {
            message: e.to_string(),
        }
    }
}

impl From<crate::persist::PersistError> for AppError {
    fn from(e: crate::persist::PersistError) -> Self {
        match e {
            crate::persist::PersistError::Io(io_err) => AppError::Io {
                message: io_err.to_string(),
            },
            crate::persist::PersistError::Json(json_err) => AppError::Config {
                message: json_err.to_string(),
            },
        }
    }
}

/// Allow converting AppError to String for CLI output.
impl From<AppError> for String {
    fn from(e: AppError) -> String {
        e.to_string()
    }
}

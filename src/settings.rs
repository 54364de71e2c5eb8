use std::path::Path;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::persist::{read_json, write_json, PersistError};

// ── Remote connection ────────────────────────────────────────────

/// Where the design-tool process listens, and how long to wait on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RemoteSettings {
    pub host: String,
    pub port: u16,
    /// Bound applied to connect, write, and read separately.
    pub timeout_ms: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8888,
            timeout_ms: 10_000,
        }
    }
}

impl RemoteSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ── HTTP front door ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ApiSettings {
    pub host: String,
    /// 0 picks a free port.
    pub port: u16,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
        }
    }
}

// ── Bridge settings ──────────────────────────────────────────────

/// Process settings stored as `settings.json` in the config directory.
/// Missing sections fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BridgeSettings {
    pub version: u32,
    #[serde(default)]
    pub remote: RemoteSettings,
    #[serde(default)]
    pub api: ApiSettings,
}

const SETTINGS_VERSION: u32 = 1;

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            remote: RemoteSettings::default(),
            api: ApiSettings::default(),
        }
    }
}

impl BridgeSettings {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.remote.host.trim().is_empty() {
            return Err(AppError::Config {
                message: "remote.host must not be empty".into(),
            });
        }
        if self.remote.port == 0 {
            return Err(AppError::Config {
                message: "remote.port must not be 0".into(),
            });
        }
        if self.remote.timeout_ms == 0 {
            return Err(AppError::Config {
                message: "remote.timeout_ms must be greater than 0".into(),
            });
        }
        if self.api.host.trim().is_empty() {
            return Err(AppError::Config {
                message: "api.host must not be empty".into(),
            });
        }
        Ok(())
    }
}

/// Load settings from the config directory. Returns None if no settings file
/// exists or it cannot be parsed.
pub fn load_settings(config_dir: &Path) -> Option<BridgeSettings> {
    let path = crate::paths::settings_path(config_dir);
    if !path.exists() {
        return None;
    }
    match read_json::<BridgeSettings>(&path) {
        Ok(settings) => Some(settings),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable settings file");
            None
        }
    }
}

/// Saved settings, or defaults when there are none.
pub fn load_or_default(config_dir: &Path) -> BridgeSettings {
    load_settings(config_dir).unwrap_or_default()
}

/// Save settings to the config directory.
pub fn save_settings(config_dir: &Path, settings: &BridgeSettings) -> Result<(), PersistError> {
    std::fs::create_dir_all(config_dir)?;
    write_json(&crate::paths::settings_path(config_dir), settings)
}

use std::sync::atomic::AtomicU16;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::bridge::CommandBridge;
use crate::error::AppError;
use crate::registry::ComponentRegistry;
use crate::remote::RemoteHandle;
use crate::settings::BridgeSettings;

// ── Application State ──────────────────────────────────────────────

/// Process state shared by the HTTP API and the CLI.
pub struct AppState {
    pub settings: Mutex<BridgeSettings>,
    pub registry: Arc<ComponentRegistry>,
    pub bridge: CommandBridge,
    /// Port the HTTP API is listening on (0 = not running).
    pub api_port: AtomicU16,
}

impl AppState {
    /// Build the registry and a bridge pointed at the configured remote. No
    /// connection is opened yet.
    pub fn new(settings: BridgeSettings) -> Result<Self, AppError> {
        settings.validate()?;
        let registry = Arc::new(ComponentRegistry::builtin()?);
        let remote = RemoteHandle::new(settings.remote.address(), settings.remote.timeout());
        tracing::info!(
            components = registry.len(),
            remote = %settings.remote.address(),
            "bridge state initialized"
        );
        Ok(Self {
            settings: Mutex::new(settings),
            bridge: CommandBridge::new(Arc::clone(&registry), remote),
            registry,
            api_port: AtomicU16::new(0),
        })
    }

    /// Read-only access to settings. Locks the mutex for the duration of `f`.
    pub fn with_settings<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&BridgeSettings) -> R,
    {
        let guard = self.settings.lock();
        f(&guard)
    }

    pub fn remote_address(&self) -> String {
        self.with_settings(|s| s.remote.address())
    }
}

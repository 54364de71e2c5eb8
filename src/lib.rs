#[cfg(feature = "http-api")]
pub mod api;
pub mod bridge;
pub mod error;
pub mod logging;
pub mod model;
pub mod paths;
pub mod persist;
pub mod registry;
pub mod remote;
pub mod settings;
pub mod state;

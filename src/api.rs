use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tower_http::cors::CorsLayer;

use crate::error::AppError;
use crate::model::ComponentDefinition;
use crate::registry::reference;
use crate::settings::BridgeSettings;
use crate::state::AppState;

// ── Response types ───────────────────────────────────────────────

#[derive(Serialize)]
struct ApiOk<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Serialize)]
struct ApiErr {
    ok: bool,
    error: AppError,
    message: String,
}

fn ok_json<T: Serialize>(data: T) -> Response {
    Json(ApiOk { ok: true, data }).into_response()
}

fn err_json(status: StatusCode, error: AppError) -> Response {
    let message = error.to_string();
    (
        status,
        Json(ApiErr {
            ok: false,
            error,
            message,
        }),
    )
        .into_response()
}

fn app_err(error: AppError) -> Response {
    err_json(status_for(&error), error)
}

/// HTTP status for a failed operation.
pub fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::UnknownComponent { .. }
        | AppError::InvalidParameters { .. }
        | AppError::ComponentNotCreated { .. } => StatusCode::BAD_REQUEST,
        AppError::RemoteRejected { .. } => StatusCode::BAD_GATEWAY,
        AppError::RemoteUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AppError::Definition { .. } | AppError::Io { .. } | AppError::Config { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

// ── Request bodies ───────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateComponentRequest {
    /// Registry name of the component kind, e.g. "circle".
    pub component_name: String,
    /// Name to record the created instance under. Defaults to `component_name`.
    #[serde(default)]
    pub instance_name: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ConnectComponentsRequest {
    pub source_component: String,
    pub source_param: String,
    pub target_component: String,
    pub target_param: String,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    remote_address: String,
    /// As of the last connect or exchange; a dropped peer shows up on the next call.
    remote_connected: bool,
    last_error: Option<String>,
    exchanges: u64,
    components_loaded: usize,
}

// ── Handlers ─────────────────────────────────────────────────────

async fn get_health(Extension(state): Extension<Arc<AppState>>) -> Response {
    let status = state.bridge.status();
    ok_json(Health {
        status: "healthy",
        remote_address: state.remote_address(),
        remote_connected: status.connected,
        last_error: status.last_error,
        exchanges: status.exchanges,
        components_loaded: state.registry.len(),
    })
}

async fn get_components(Extension(state): Extension<Arc<AppState>>) -> Response {
    ok_json(serde_json::json!({
        "components": state.registry.list(),
        "info": reference::component_reference(&state.registry),
    }))
}

async fn search_components(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let matches = state.registry.search(&query.q);
    ok_json(matches.iter().map(AsRef::as_ref).collect::<Vec<&ComponentDefinition>>())
}

async fn get_category(
    Extension(state): Extension<Arc<AppState>>,
    Path(category): Path<String>,
) -> Response {
    let defs = state.registry.by_category(&category);
    ok_json(defs.iter().map(AsRef::as_ref).collect::<Vec<&ComponentDefinition>>())
}

async fn get_component(Extension(state): Extension<Arc<AppState>>, Path(name): Path<String>) -> Response {
    match state.registry.lookup(&name) {
        Some(def) => ok_json(def.as_ref()),
        None => err_json(StatusCode::NOT_FOUND, AppError::UnknownComponent { name }),
    }
}

async fn post_create_component(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<CreateComponentRequest>,
) -> Response {
    let instance = body
        .instance_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(&body.component_name);
    match state
        .bridge
        .create_component_as(instance, &body.component_name, &body.parameters)
        .await
    {
        Ok(created) => ok_json(created),
        Err(e) => app_err(e),
    }
}

async fn post_connect_components(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<ConnectComponentsRequest>,
) -> Response {
    match state
        .bridge
        .connect_components(
            &body.source_component,
            &body.source_param,
            &body.target_component,
            &body.target_param,
        )
        .await
    {
        Ok(connection) => ok_json(connection),
        Err(e) => app_err(e),
    }
}

async fn post_clear_canvas(Extension(state): Extension<Arc<AppState>>) -> Response {
    match state.bridge.clear_canvas().await {
        Ok(cleared) => ok_json(cleared),
        Err(e) => app_err(e),
    }
}

async fn get_created_components(Extension(state): Extension<Arc<AppState>>) -> Response {
    ok_json(state.bridge.created_components().await)
}

async fn get_schema() -> Response {
    ok_json(serde_json::json!({
        "create_component": schemars::schema_for!(CreateComponentRequest),
        "connect_components": schemars::schema_for!(ConnectComponentsRequest),
        "settings": schemars::schema_for!(BridgeSettings),
    }))
}

// ── Server startup ───────────────────────────────────────────────

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/components", get(get_components))
        .route("/components/search", get(search_components))
        .route("/components/category/{category}", get(get_category))
        .route("/components/{name}", get(get_component))
        .route("/create_component", post(post_create_component))
        .route("/connect_components", post(post_connect_components))
        .route("/clear_canvas", post(post_clear_canvas))
        .route("/created_components", get(get_created_components))
        .route("/schema", get(get_schema))
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}

/// Bind the HTTP API on the configured address and serve it on a background
/// task. Returns the bound address.
pub async fn start_api_server(state: Arc<AppState>) -> Result<SocketAddr, AppError> {
    let bind = state.with_settings(|s| format!("{}:{}", s.api.host, s.api.port));
    let listener = tokio::net::TcpListener::bind(&bind).await.map_err(|e| AppError::Config {
        message: format!("Failed to bind API server on {bind}: {e}"),
    })?;
    let addr = listener.local_addr()?;
    state.api_port.store(addr.port(), Ordering::Relaxed);

    let app = router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "API server error");
        }
    });

    tracing::info!(%addr, "API server listening");
    Ok(addr)
}

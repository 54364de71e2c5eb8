//! Stateful protocol layer between callers and the remote design tool.
//!
//! Validation happens against the shared registry before any lock is taken.
//! The transport and the identity table sit behind one async lock, so every
//! exchange and the table update that follows it happen as a unit and
//! concurrent callers are served one at a time.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{AppError, Endpoint, UnresolvedName};
use crate::registry::{canonical, ComponentRegistry, ValidatedParams};
use crate::remote::{RemoteHandle, RemoteResponse, RemoteTransport, WireCommand};

/// Connection snapshot for health reporting. Readable while an exchange is
/// in flight.
///
/// Values are as last observed by `connect()` or an exchange. A peer that
/// closes the socket between calls is only noticed by the next exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub last_error: Option<String>,
    /// Completed exchanges, successful or rejected.
    pub exchanges: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedComponent {
    pub instance_name: String,
    pub component: String,
    pub internal_name: String,
    pub component_guid: Option<String>,
    pub parameters: ValidatedParams,
    pub response: RemoteResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    pub source_component: String,
    pub source_guid: String,
    pub source_param: String,
    pub target_component: String,
    pub target_guid: String,
    pub target_param: String,
    pub response: RemoteResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct CanvasCleared {
    /// Identities forgotten by the clear.
    pub forgotten: usize,
    pub response: RemoteResponse,
}

struct Session<T> {
    remote: T,
    /// Symbolic name to remote `component_guid`, in first-creation order.
    identities: IndexMap<String, String>,
}

pub struct CommandBridge<T: RemoteTransport = RemoteHandle> {
    registry: Arc<ComponentRegistry>,
    session: tokio::sync::Mutex<Session<T>>,
    status: Mutex<ConnectionStatus>,
}

impl<T: RemoteTransport> CommandBridge<T> {
    pub fn new(registry: Arc<ComponentRegistry>, remote: T) -> Self {
        Self {
            registry,
            session: tokio::sync::Mutex::new(Session {
                remote,
                identities: IndexMap::new(),
            }),
            status: Mutex::new(ConnectionStatus::default()),
        }
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.lock().clone()
    }

    /// Connect now rather than on the first command.
    pub async fn connect(&self) -> Result<(), AppError> {
        let mut session = self.session.lock().await;
        let result = session.remote.connect().await;
        let mut status = self.status.lock();
        status.connected = session.remote.is_connected();
        match &result {
            Ok(()) => status.last_error = None,
            Err(e) => status.last_error = Some(e.to_string()),
        }
        result
    }

    /// Remote identity recorded for a symbolic name, if any.
    pub async fn identity(&self, name: &str) -> Option<String> {
        self.session.lock().await.identities.get(&canonical(name)).cloned()
    }

    /// Snapshot of the identity table in first-creation order.
    pub async fn created_components(&self) -> IndexMap<String, String> {
        self.session.lock().await.identities.clone()
    }

    /// Create a component and record its identity under the component's
    /// own name.
    pub async fn create_component(
        &self,
        component_name: &str,
        parameters: &Map<String, Value>,
    ) -> Result<CreatedComponent, AppError> {
        self.create_component_as(component_name, component_name, parameters).await
    }

    /// Create a component of kind `component_name` and record its identity
    /// under `instance_name`, replacing any earlier identity for that name.
    pub async fn create_component_as(
        &self,
        instance_name: &str,
        component_name: &str,
        parameters: &Map<String, Value>,
    ) -> Result<CreatedComponent, AppError> {
        let (definition, validated) = self.registry.prepare(component_name, parameters)?;
        let instance = canonical(instance_name);
        let command = WireCommand::CreateComponent {
            component_name: definition.internal_name().to_string(),
            parameters: validated.clone(),
        };

        let mut session = self.session.lock().await;
        let response = self.send(&mut session, &command).await?;

        match &response.component_guid {
            Some(guid) => {
                tracing::info!(instance = %instance, component = definition.name(), guid = %guid, "component created");
                session.identities.insert(instance.clone(), guid.clone());
            }
            None => {
                tracing::warn!(instance = %instance, component = definition.name(), "remote created component without an identity");
            }
        }

        Ok(CreatedComponent {
            instance_name: instance,
            component: definition.key(),
            internal_name: definition.internal_name().to_string(),
            component_guid: response.component_guid.clone(),
            parameters: validated,
            response,
        })
    }

    /// Wire an output of one created component into an input of another.
    ///
    /// Both names must already have identities; otherwise nothing is sent and
    /// every unresolved side is reported.
    pub async fn connect_components(
        &self,
        source: &str,
        source_param: &str,
        target: &str,
        target_param: &str,
    ) -> Result<Connection, AppError> {
        let source = canonical(source);
        let target = canonical(target);

        let mut session = self.session.lock().await;
        let source_guid = session.identities.get(&source).cloned();
        let target_guid = session.identities.get(&target).cloned();

        let (source_guid, target_guid) = match (source_guid, target_guid) {
            (Some(s), Some(t)) => (s, t),
            (s, t) => {
                let mut missing = Vec::new();
                if s.is_none() {
                    missing.push(UnresolvedName {
                        side: Endpoint::Source,
                        name: source,
                    });
                }
                if t.is_none() {
                    missing.push(UnresolvedName {
                        side: Endpoint::Target,
                        name: target,
                    });
                }
                return Err(AppError::ComponentNotCreated { missing });
            }
        };

        let command = WireCommand::ConnectParameters {
            source_component_guid: source_guid.clone(),
            source_parameter_name: source_param.to_string(),
            target_component_guid: target_guid.clone(),
            target_parameter_name: target_param.to_string(),
        };
        let response = self.send(&mut session, &command).await?;
        tracing::info!(%source, source_param, %target, target_param, "components connected");

        Ok(Connection {
            source_component: source,
            source_guid,
            source_param: source_param.to_string(),
            target_component: target,
            target_guid,
            target_param: target_param.to_string(),
            response,
        })
    }

    /// Clear the remote canvas. The identity table is emptied only when the
    /// remote confirms.
    pub async fn clear_canvas(&self) -> Result<CanvasCleared, AppError> {
        let mut session = self.session.lock().await;
        let response = self.send(&mut session, &WireCommand::ClearCanvas).await?;
        let forgotten = session.identities.len();
        session.identities.clear();
        tracing::info!(forgotten, "canvas cleared");
        Ok(CanvasCleared { forgotten, response })
    }

    /// One exchange, with status bookkeeping. A `success: false` reply becomes
    /// [`AppError::RemoteRejected`].
    async fn send(&self, session: &mut Session<T>, command: &WireCommand) -> Result<RemoteResponse, AppError> {
        let result = session.remote.exchange(command).await;
        let connected = session.remote.is_connected();

        let response = {
            let mut status = self.status.lock();
            status.connected = connected;
            match result {
                Ok(response) => {
                    status.exchanges += 1;
                    status.last_error = None;
                    response
                }
                Err(e) => {
                    status.last_error = Some(e.to_string());
                    return Err(e);
                }
            }
        };

        if response.success {
            Ok(response)
        } else {
            let message = response.error_text();
            tracing::warn!(command = command.name(), error = %message, "remote rejected command");
            Err(AppError::RemoteRejected { message })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    /// Scripted transport. Replies are popped in order; once the script runs
    /// out, creates get `guid-N` and everything else plain success.
    #[derive(Clone, Default)]
    struct FakeRemote {
        script: Arc<Mutex<VecDeque<Result<RemoteResponse, AppError>>>>,
        sent: Arc<Mutex<Vec<WireCommand>>>,
        connected: bool,
    }

    impl FakeRemote {
        fn push(&self, reply: Result<RemoteResponse, AppError>) {
            self.script.lock().push_back(reply);
        }

        fn sent(&self) -> Vec<WireCommand> {
            self.sent.lock().clone()
        }
    }

    #[async_trait]
    impl RemoteTransport for FakeRemote {
        async fn connect(&mut self) -> Result<(), AppError> {
            self.connected = true;
            Ok(())
        }

        async fn exchange(&mut self, command: &WireCommand) -> Result<RemoteResponse, AppError> {
            let count = {
                let mut sent = self.sent.lock();
                sent.push(command.clone());
                sent.len()
            };
            let reply = self.script.lock().pop_front().unwrap_or_else(|| match command {
                WireCommand::CreateComponent { .. } => Ok(RemoteResponse::created(format!("guid-{count}"))),
                _ => Ok(RemoteResponse::ok()),
            });
            self.connected = reply.is_ok();
            reply
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    fn bridge() -> (CommandBridge<FakeRemote>, FakeRemote) {
        let remote = FakeRemote::default();
        let registry = Arc::new(ComponentRegistry::builtin().unwrap());
        (CommandBridge::new(registry, remote.clone()), remote)
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_sends_internal_name_and_validated_params() {
        let (bridge, remote) = bridge();
        remote.push(Ok(RemoteResponse::created("g1")));

        let created = bridge
            .create_component("Circle", &params(json!({ "Radius": "10", "Colour": "red" })))
            .await
            .unwrap();
        assert_eq!(created.component_guid.as_deref(), Some("g1"));
        assert_eq!(created.instance_name, "circle");
        assert_eq!(bridge.identity("CIRCLE").await.as_deref(), Some("g1"));

        let sent = remote.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            serde_json::to_value(&sent[0]).unwrap(),
            json!({
                "command": "create_component",
                "component_name": "GH_Circle",
                "parameters": { "Plane": "XY plane", "Radius": 10.0 },
            })
        );
    }

    #[tokio::test]
    async fn test_invalid_parameters_never_reach_transport() {
        let (bridge, remote) = bridge();
        let err = bridge
            .create_component("circle", &params(json!({ "Radius": -5 })))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidParameters { .. }));
        assert!(err.to_string().contains("Radius must be >= 0"));

        let err = bridge.create_component("torus", &Map::new()).await.unwrap_err();
        assert!(matches!(err, AppError::UnknownComponent { .. }));

        assert!(remote.sent().is_empty());
        assert!(bridge.created_components().await.is_empty());
        assert_eq!(bridge.status().exchanges, 0);
    }

    #[tokio::test]
    async fn test_transport_failure_leaves_table_untouched() {
        let (bridge, remote) = bridge();
        bridge.create_component("point", &params(json!({ "X": 0, "Y": 0, "Z": 0 }))).await.unwrap();
        let before = bridge.created_components().await;

        remote.push(Err(AppError::remote_unavailable("Connection closed by remote")));
        let err = bridge
            .create_component("point", &params(json!({ "X": 1, "Y": 1, "Z": 1 })))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RemoteUnavailable { .. }));
        assert_eq!(bridge.created_components().await, before);

        let status = bridge.status();
        assert!(!status.connected);
        assert_eq!(status.exchanges, 1);
        assert!(status.last_error.unwrap().contains("Connection closed"));
    }

    #[tokio::test]
    async fn test_remote_rejection_is_passed_through() {
        let (bridge, remote) = bridge();
        remote.push(Ok(RemoteResponse::failed("Unsupported component: GH_Loft")));
        let err = bridge
            .create_component("loft", &params(json!({ "Curves": "c" })))
            .await
            .unwrap_err();
        match err {
            AppError::RemoteRejected { message } => assert_eq!(message, "Unsupported component: GH_Loft"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(bridge.identity("loft").await.is_none());
        // Rejection is still a completed exchange on a live connection.
        let status = bridge.status();
        assert!(status.connected);
        assert_eq!(status.exchanges, 1);
    }

    #[tokio::test]
    async fn test_recreate_overwrites_identity_in_place() {
        let (bridge, remote) = bridge();
        remote.push(Ok(RemoteResponse::created("g1")));
        remote.push(Ok(RemoteResponse::created("g2")));
        remote.push(Ok(RemoteResponse::created("g3")));
        let xyz = params(json!({ "X": 0, "Y": 0, "Z": 0 }));

        bridge.create_component("point", &xyz).await.unwrap();
        bridge.create_component("vector", &xyz).await.unwrap();
        bridge.create_component("Point", &xyz).await.unwrap();

        let table = bridge.created_components().await;
        assert_eq!(table.len(), 2);
        assert_eq!(table.get_index(0).unwrap(), (&"point".to_string(), &"g3".to_string()));
        assert_eq!(table["vector"], "g2");
    }

    #[tokio::test]
    async fn test_success_without_guid_records_nothing() {
        let (bridge, remote) = bridge();
        remote.push(Ok(RemoteResponse::ok()));
        let created = bridge.create_component("number slider", &Map::new()).await.unwrap();
        assert!(created.component_guid.is_none());
        assert!(bridge.created_components().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_as_stores_under_instance_name() {
        let (bridge, _remote) = bridge();
        let xyz = params(json!({ "X": 0, "Y": 0, "Z": 0 }));
        let a = bridge.create_component_as("Corner A", "point", &xyz).await.unwrap();
        let b = bridge.create_component_as("corner b", "POINT", &xyz).await.unwrap();
        assert_eq!(a.component, "point");
        assert_eq!(b.internal_name, "GH_Point");

        let table = bridge.created_components().await;
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["corner a", "corner b"]);
        assert!(bridge.identity("point").await.is_none());
    }

    #[tokio::test]
    async fn test_connect_unresolved_names_every_side() {
        let (bridge, remote) = bridge();
        let err = bridge.connect_components("point", "Point", "circle", "Plane").await.unwrap_err();
        match err {
            AppError::ComponentNotCreated { missing } => {
                assert_eq!(missing.len(), 2);
                assert_eq!(missing[0].side, Endpoint::Source);
                assert_eq!(missing[0].name, "point");
                assert_eq!(missing[1].side, Endpoint::Target);
                assert_eq!(missing[1].name, "circle");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        bridge.create_component("point", &params(json!({ "X": 0, "Y": 0, "Z": 0 }))).await.unwrap();
        let sent_before = remote.sent().len();
        let err = bridge.connect_components("point", "Point", "circle", "Plane").await.unwrap_err();
        assert_eq!(err.to_string(), "Component not created: target 'circle'");
        assert_eq!(remote.sent().len(), sent_before);
    }

    #[tokio::test]
    async fn test_point_circle_connect_end_to_end() {
        let (bridge, remote) = bridge();
        remote.push(Ok(RemoteResponse::created("g1")));
        remote.push(Ok(RemoteResponse::created("g2")));

        bridge.create_component("point", &params(json!({ "X": 0, "Y": 0, "Z": 0 }))).await.unwrap();
        bridge.create_component("circle", &params(json!({ "Radius": 10 }))).await.unwrap();
        let connection = bridge.connect_components("Point", "Point", "Circle", "Plane").await.unwrap();
        assert_eq!(connection.source_guid, "g1");
        assert_eq!(connection.target_guid, "g2");

        let sent = remote.sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(
            serde_json::to_value(&sent[2]).unwrap(),
            json!({
                "command": "connect_parameters",
                "source_component_guid": "g1",
                "source_parameter_name": "Point",
                "target_component_guid": "g2",
                "target_parameter_name": "Plane",
            })
        );
    }

    #[tokio::test]
    async fn test_clear_empties_only_on_success() {
        let (bridge, remote) = bridge();
        let xyz = params(json!({ "X": 0, "Y": 0, "Z": 0 }));
        bridge.create_component("point", &xyz).await.unwrap();
        bridge.create_component("vector", &xyz).await.unwrap();

        remote.push(Ok(RemoteResponse::failed("Document is read-only")));
        let err = bridge.clear_canvas().await.unwrap_err();
        assert_eq!(err.to_string(), "Document is read-only");
        assert_eq!(bridge.created_components().await.len(), 2);

        remote.push(Err(AppError::remote_unavailable("Timed out waiting for response")));
        assert!(bridge.clear_canvas().await.is_err());
        assert_eq!(bridge.created_components().await.len(), 2);

        let cleared = bridge.clear_canvas().await.unwrap();
        assert_eq!(cleared.forgotten, 2);
        assert!(bridge.created_components().await.is_empty());
        assert_eq!(remote.sent().last(), Some(&WireCommand::ClearCanvas));
    }

    #[tokio::test]
    async fn test_eager_connect_updates_status() {
        let (bridge, _remote) = bridge();
        assert!(!bridge.status().connected);
        bridge.connect().await.unwrap();
        let status = bridge.status();
        assert!(status.connected);
        assert!(status.last_error.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_creates_are_serialized() {
        let (bridge, remote) = bridge();
        let bridge = Arc::new(bridge);
        let mut tasks = Vec::new();
        for i in 0..8 {
            let bridge = Arc::clone(&bridge);
            tasks.push(tokio::spawn(async move {
                let xyz = params(json!({ "X": i, "Y": 0, "Z": 0 }));
                bridge.create_component_as(&format!("p{i}"), "point", &xyz).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let table = bridge.created_components().await;
        assert_eq!(table.len(), 8);
        let mut guids: Vec<&String> = table.values().collect();
        guids.sort();
        guids.dedup();
        assert_eq!(guids.len(), 8);
        assert_eq!(remote.sent().len(), 8);
        assert_eq!(bridge.status().exchanges, 8);
    }

    async fn loopback_bridge() -> (CommandBridge, tokio::net::TcpListener) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let registry = Arc::new(ComponentRegistry::builtin().unwrap());
        let remote = RemoteHandle::new(address, std::time::Duration::from_secs(2));
        (CommandBridge::new(registry, remote), listener)
    }

    async fn reply_once(socket: tokio::net::TcpStream, guid: &str, delay_ms: u64) {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
        let mut reader = BufReader::new(socket);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
        let reply = format!("{{\"success\":true,\"component_guid\":\"{guid}\"}}\n");
        let _ = reader.get_mut().write_all(reply.as_bytes()).await;
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    }

    #[tokio::test]
    async fn test_cancelled_create_does_not_leak_reply_into_next() {
        let (bridge, listener) = loopback_bridge().await;
        let peer = tokio::spawn(async move {
            let (first, _) = listener.accept().await.unwrap();
            let late = tokio::spawn(reply_once(first, "g1", 200));
            let (second, _) = listener.accept().await.unwrap();
            reply_once(second, "g2", 0).await;
            late.abort();
        });

        let point = params(json!({ "X": 0, "Y": 0, "Z": 0 }));
        let cancelled =
            tokio::time::timeout(std::time::Duration::from_millis(50), bridge.create_component("point", &point)).await;
        assert!(cancelled.is_err());
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;

        let circle = bridge.create_component("circle", &params(json!({ "Radius": 10 }))).await.unwrap();
        assert_eq!(circle.component_guid.as_deref(), Some("g2"));
        assert_eq!(bridge.identity("circle").await.as_deref(), Some("g2"));
        assert_eq!(bridge.identity("point").await, None);
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_status_reports_last_observed_state() {
        let (bridge, listener) = loopback_bridge().await;
        let peer = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        bridge.connect().await.unwrap();
        peer.await.unwrap();
        // The drop has not been observed yet.
        assert!(bridge.status().connected);

        let err = bridge.clear_canvas().await.unwrap_err();
        assert!(matches!(err, AppError::RemoteUnavailable { .. }));
        let status = bridge.status();
        assert!(!status.connected);
        assert!(status.last_error.is_some());
    }
}

//! Main request dispatcher: receives JSON-RPC messages, routes to handlers.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::Value;

use deepfake_analysis::{CancellationToken, SessionClient};

use crate::tools::ToolRegistry;
use crate::types::*;

use super::negotiation::Handshake;
use super::validator::validate_request;

/// A validated request whose cancellation token is registered.
pub struct AdmittedRequest {
    request: JsonRpcRequest,
    cancel: CancellationToken,
}

fn error_value(error: &McpError, id: RequestId) -> Value {
    serde_json::to_value(error.to_json_rpc_error(id)).unwrap_or_default()
}

/// The main protocol handler that dispatches incoming JSON-RPC messages.
///
/// Requests may be handled concurrently; each one gets a child of the
/// shutdown token so it can be cancelled on its own or together with the
/// whole process.
pub struct ProtocolHandler {
    client: Arc<SessionClient>,
    handshake: Mutex<Handshake>,
    shutdown: CancellationToken,
    in_flight: Mutex<HashMap<RequestId, CancellationToken>>,
}

impl ProtocolHandler {
    pub fn new(client: Arc<SessionClient>, shutdown: CancellationToken) -> Self {
        Self {
            client,
            handshake: Mutex::new(Handshake::default()),
            shutdown,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Requests currently executing.
    pub async fn in_flight_count(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    pub async fn handle_message(&self, msg: JsonRpcMessage) -> Option<Value> {
        match msg {
            JsonRpcMessage::Request(req) => Some(match self.admit(req).await {
                Ok(admitted) => self.run(admitted).await,
                Err(rejection) => rejection,
            }),
            JsonRpcMessage::Notification(notif) => {
                self.handle_notification(notif).await;
                None
            }
            _ => {
                tracing::warn!("Received unexpected message type from client");
                None
            }
        }
    }

    /// Validate a request and register its cancellation token.
    ///
    /// Once this returns, a cancellation notice for the request id takes
    /// effect even if [`run`](Self::run) has not started yet. A rejected
    /// request yields its error response instead.
    pub async fn admit(&self, request: JsonRpcRequest) -> Result<AdmittedRequest, Value> {
        if let Err(e) = validate_request(&request) {
            return Err(error_value(&e, request.id));
        }

        let mut in_flight = self.in_flight.lock().await;
        if in_flight.contains_key(&request.id) {
            let e = McpError::InvalidRequest(format!(
                "Request id {} is already in flight",
                request.id
            ));
            tracing::warn!("Rejecting {} request: {e}", request.method);
            return Err(error_value(&e, request.id));
        }

        let cancel = self.shutdown.child_token();
        in_flight.insert(request.id.clone(), cancel.clone());
        Ok(AdmittedRequest { request, cancel })
    }

    /// Execute an admitted request and build its response.
    pub async fn run(&self, admitted: AdmittedRequest) -> Value {
        let AdmittedRequest { request, cancel } = admitted;
        let result = self.dispatch_request(&request, &cancel).await;
        self.in_flight.lock().await.remove(&request.id);

        match result {
            Ok(value) => {
                serde_json::to_value(JsonRpcResponse::new(request.id, value)).unwrap_or_default()
            }
            Err(e) => {
                tracing::warn!("Request {} ({}) failed: {e}", request.id, request.method);
                error_value(&e, request.id)
            }
        }
    }

    async fn dispatch_request(
        &self,
        request: &JsonRpcRequest,
        cancel: &CancellationToken,
    ) -> McpResult<Value> {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params.clone()).await,
            "shutdown" => self.handle_shutdown().await,

            "tools/list" => self.handle_tools_list().await,
            "tools/call" => self.handle_tools_call(request.params.clone(), cancel).await,

            "ping" => Ok(Value::Object(serde_json::Map::new())),

            _ => Err(McpError::MethodNotFound(request.method.clone())),
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "initialized" | "notifications/initialized" => {
                self.handshake.lock().await.mark_initialized();
            }
            "notifications/cancelled" | "$/cancelRequest" => {
                self.handle_cancel(notification.params).await;
            }
            _ => {
                tracing::debug!("Unknown notification: {}", notification.method);
            }
        }
    }

    async fn handle_cancel(&self, params: Option<Value>) {
        let params: CancelRequestParams = match params.map(serde_json::from_value).transpose() {
            Ok(Some(p)) => p,
            Ok(None) => {
                tracing::warn!("Cancellation notification without params");
                return;
            }
            Err(e) => {
                tracing::warn!("Malformed cancellation notification: {e}");
                return;
            }
        };

        let Some(id) = RequestId::from_value(&params.request_id) else {
            tracing::warn!("Cancellation for unusable request id {}", params.request_id);
            return;
        };

        match self.in_flight.lock().await.get(&id) {
            Some(token) => {
                tracing::info!(
                    "Cancelling request {id}{}",
                    params.reason.map(|r| format!(": {r}")).unwrap_or_default()
                );
                token.cancel();
            }
            None => tracing::debug!("Cancellation for request {id} that is not in flight"),
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> McpResult<Value> {
        let init_params: InitializeParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("Initialize params required".to_string()))?;

        let result = self.handshake.lock().await.negotiate(init_params);

        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_shutdown(&self) -> McpResult<Value> {
        tracing::info!("Shutdown requested, cancelling in-flight analyses");
        for token in self.in_flight.lock().await.values() {
            token.cancel();
        }
        Ok(Value::Object(serde_json::Map::new()))
    }

    async fn handle_tools_list(&self) -> McpResult<Value> {
        let result = ToolListResult {
            tools: ToolRegistry::list_tools(),
            next_cursor: None,
        };
        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_tools_call(
        &self,
        params: Option<Value>,
        cancel: &CancellationToken,
    ) -> McpResult<Value> {
        let call_params: ToolCallParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("Tool call params required".to_string()))?;

        tracing::debug!("Calling tool {}", call_params.name);
        let result =
            ToolRegistry::call(&call_params.name, call_params.arguments, &self.client, cancel)
                .await?;

        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }
}

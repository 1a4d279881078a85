use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParams, CallToolResult, ClientInfo};
use rmcp::service::{Peer, RunningService};
use rmcp::transport::child_process::TokioChildProcess;
use rmcp::transport::IntoTransport;
use rmcp::{serve_client, RoleClient};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use carlot_core::config::ToolsConfig;

/// Body returned for a successful call that produced no content.
pub const NO_RESULTS_PAYLOAD: &str = "Sem resultados";

/// A single remote call: tool name plus JSON object arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolInvocation {
    pub tool_name: &'static str,
    pub parameters: Map<String, Value>,
}

impl ToolInvocation {
    pub fn new(tool_name: &'static str) -> Self {
        Self { tool_name, parameters: Map::new() }
    }

    pub fn with_parameters(tool_name: &'static str, parameters: Map<String, Value>) -> Self {
        Self { tool_name, parameters }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ChannelError(pub String);

/// Opaque request/response channel to the tool server. `Ok(None)` means the
/// call succeeded without content.
#[async_trait]
pub trait ToolChannel: Send + Sync {
    async fn call(
        &self,
        tool_name: &str,
        parameters: Map<String, Value>,
    ) -> Result<Option<String>, ChannelError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("inventory tool server is unavailable")]
    ServerUnavailable,
    #[error("`{tool_name}` failed after {attempts} attempt(s): {last_error}")]
    Failed { tool_name: String, attempts: u32, last_error: String },
}

impl ToolError {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::ServerUnavailable => 0,
            Self::Failed { attempts, .. } => *attempts,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 2, delay: Duration::from_millis(500) }
    }
}

/// Bounded-retry wrapper around a [`ToolChannel`].
#[derive(Clone)]
pub enum ToolClient {
    Disconnected,
    Connected { channel: Arc<dyn ToolChannel>, retry: RetryPolicy },
}

impl ToolClient {
    pub fn connected(channel: Arc<dyn ToolChannel>) -> Self {
        Self::Connected { channel, retry: RetryPolicy::default() }
    }

    /// Every channel error is treated as transient and retried up to the
    /// policy cap with a fixed delay in between.
    pub async fn invoke(&self, invocation: &ToolInvocation) -> Result<String, ToolError> {
        let (channel, retry) = match self {
            Self::Disconnected => {
                warn!(
                    event_name = "agent.tool.unavailable",
                    tool_name = invocation.tool_name,
                    "tool call skipped: no session"
                );
                return Err(ToolError::ServerUnavailable);
            }
            Self::Connected { channel, retry } => (channel, retry),
        };

        let max_attempts = retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match channel.call(invocation.tool_name, invocation.parameters.clone()).await {
                Ok(payload) => {
                    debug!(tool_name = invocation.tool_name, attempt, "tool call succeeded");
                    return Ok(payload
                        .filter(|body| !body.trim().is_empty())
                        .unwrap_or_else(|| NO_RESULTS_PAYLOAD.to_string()));
                }
                Err(error) if attempt < max_attempts => {
                    warn!(
                        event_name = "agent.tool.retry",
                        tool_name = invocation.tool_name,
                        attempt,
                        error = %error,
                        "tool call failed, retrying"
                    );
                    tokio::time::sleep(retry.delay).await;
                }
                Err(error) => {
                    warn!(
                        event_name = "agent.tool.failed",
                        tool_name = invocation.tool_name,
                        attempt,
                        error = %error,
                        "tool call failed"
                    );
                    return Err(ToolError::Failed {
                        tool_name: invocation.tool_name.to_string(),
                        attempts: attempt,
                        last_error: error.0,
                    });
                }
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to spawn tool server `{command}`: {source}")]
    Spawn { command: String, source: std::io::Error },
    #[error("tool server handshake failed: {0}")]
    Handshake(String),
    #[error("tool server shutdown failed: {0}")]
    Shutdown(String),
}

/// MCP client session over a spawned tool server process. Acquire once with
/// [`McpSession::connect`] and release with [`McpSession::shutdown`], which
/// consumes the session.
pub struct McpSession {
    service: RunningService<RoleClient, ClientInfo>,
}

impl McpSession {
    pub async fn connect(config: &ToolsConfig, database_url: &str) -> Result<Self, SessionError> {
        info!(
            event_name = "agent.session.connecting",
            command = %config.command,
            args = ?config.args,
            "spawning inventory tool server"
        );

        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .env("CARLOT_DATABASE_URL", database_url)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let transport = TokioChildProcess::new(command)
            .map_err(|source| SessionError::Spawn { command: config.command.clone(), source })?;
        let session = Self::establish(transport).await?;

        info!(event_name = "agent.session.connected", "tool server session established");
        Ok(session)
    }

    /// Runs the client handshake over an already-open transport.
    pub async fn establish<T, E, A>(transport: T) -> Result<Self, SessionError>
    where
        T: IntoTransport<RoleClient, E, A>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let client_info = ClientInfo {
            meta: None,
            protocol_version: Default::default(),
            capabilities: Default::default(),
            client_info: rmcp::model::Implementation {
                name: "carlot-agent".into(),
                title: Some("Carlot conversational agent".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
        };
        let service = serve_client(client_info, transport)
            .await
            .map_err(|error| SessionError::Handshake(error.to_string()))?;
        Ok(Self { service })
    }

    pub fn channel(&self) -> McpToolChannel {
        McpToolChannel { peer: self.service.peer().clone() }
    }

    pub async fn shutdown(self) -> Result<(), SessionError> {
        let reason =
            self.service.cancel().await.map_err(|error| SessionError::Shutdown(error.to_string()))?;
        info!(event_name = "agent.session.closed", reason = ?reason, "tool server session closed");
        Ok(())
    }
}

#[derive(Clone)]
pub struct McpToolChannel {
    peer: Peer<RoleClient>,
}

fn result_text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|content| content.as_text().map(|text| text.text.to_string()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl ToolChannel for McpToolChannel {
    async fn call(
        &self,
        tool_name: &str,
        parameters: Map<String, Value>,
    ) -> Result<Option<String>, ChannelError> {
        let result = self
            .peer
            .call_tool(CallToolRequestParams {
                meta: None,
                name: tool_name.to_string().into(),
                arguments: Some(parameters),
                task: None,
            })
            .await
            .map_err(|error| ChannelError(error.to_string()))?;

        let text = result_text(&result);
        if result.is_error == Some(true) {
            return Err(ChannelError(if text.is_empty() {
                format!("`{tool_name}` reported an error")
            } else {
                text
            }));
        }
        Ok((!text.is_empty()).then_some(text))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use carlot_db::{demo_vehicles, InMemoryInventoryRepository};
    use carlot_mcp::CarlotMcpServer;
    use rmcp::model::{CallToolRequestParams, CallToolResult};
    use rmcp::service::{RequestContext, RoleServer};
    use rmcp::{ErrorData, ServerHandler};
    use serde_json::{json, Map, Value};
    use tokio::sync::Mutex;

    use super::{
        ChannelError, McpSession, RetryPolicy, ToolChannel, ToolClient, ToolError,
        ToolInvocation, NO_RESULTS_PAYLOAD,
    };

    struct ScriptedChannel {
        responses: Mutex<VecDeque<Result<Option<String>, ChannelError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedChannel {
        fn new(responses: Vec<Result<Option<String>, ChannelError>>) -> Arc<Self> {
            Arc::new(Self { responses: Mutex::new(responses.into()), calls: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl ToolChannel for ScriptedChannel {
        async fn call(
            &self,
            tool_name: &str,
            _parameters: Map<String, Value>,
        ) -> Result<Option<String>, ChannelError> {
            self.calls.lock().await.push(tool_name.to_string());
            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Err(ChannelError("script exhausted".to_string())))
        }
    }

    fn client(channel: Arc<ScriptedChannel>) -> ToolClient {
        ToolClient::Connected {
            channel,
            retry: RetryPolicy { max_attempts: 2, delay: Duration::ZERO },
        }
    }

    #[test]
    fn default_policy_is_two_attempts_half_second_apart() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.delay, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn disconnected_client_fails_without_attempts() {
        let error = ToolClient::Disconnected
            .invoke(&ToolInvocation::new("get_vehicles"))
            .await
            .expect_err("no session");
        assert_eq!(error, ToolError::ServerUnavailable);
        assert_eq!(error.attempts(), 0);
    }

    #[tokio::test]
    async fn two_failures_exhaust_the_retry_budget() {
        let channel = ScriptedChannel::new(vec![
            Err(ChannelError("broken pipe".to_string())),
            Err(ChannelError("timeout".to_string())),
            Ok(Some("never reached".to_string())),
        ]);
        let error = client(channel.clone())
            .invoke(&ToolInvocation::new("get_vehicles"))
            .await
            .expect_err("both attempts fail");

        assert_eq!(
            error,
            ToolError::Failed {
                tool_name: "get_vehicles".to_string(),
                attempts: 2,
                last_error: "timeout".to_string(),
            }
        );
        assert_eq!(channel.calls.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn transient_failure_then_success() {
        let channel = ScriptedChannel::new(vec![
            Err(ChannelError("broken pipe".to_string())),
            Ok(Some("{\"veiculos\": []}".to_string())),
        ]);
        let payload = client(channel.clone())
            .invoke(&ToolInvocation::new("get_vehicles"))
            .await
            .expect("second attempt succeeds");

        assert_eq!(payload, "{\"veiculos\": []}");
        assert_eq!(channel.calls.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn empty_payload_becomes_no_results_sentinel() {
        for response in [None, Some("   ".to_string())] {
            let channel = ScriptedChannel::new(vec![Ok(response)]);
            let payload = client(channel)
                .invoke(&ToolInvocation::new("get_available_brands"))
                .await
                .expect("success");
            assert_eq!(payload, NO_RESULTS_PAYLOAD);
        }
    }

    /// Answers every tool call with a successful, content-free result.
    #[derive(Clone)]
    struct SilentServer;

    impl ServerHandler for SilentServer {
        fn call_tool(
            &self,
            _request: CallToolRequestParams,
            _context: RequestContext<RoleServer>,
        ) -> impl std::future::Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
            std::future::ready(Ok(CallToolResult::success(Vec::new())))
        }
    }

    async fn session_with<S: ServerHandler>(server: S) -> McpSession {
        let (server_io, client_io) = tokio::io::duplex(64 * 1024);
        tokio::spawn(async move {
            if let Ok(service) = rmcp::serve_server(server, server_io).await {
                let _ = service.waiting().await;
            }
        });
        McpSession::establish(client_io).await.expect("client handshake")
    }

    #[tokio::test]
    async fn server_error_results_are_retried_then_reported() {
        let server = CarlotMcpServer::new(Arc::new(InMemoryInventoryRepository::with_vehicles(
            demo_vehicles(),
        )));
        let session = session_with(server).await;
        let client = ToolClient::Connected {
            channel: Arc::new(session.channel()),
            retry: RetryPolicy { max_attempts: 2, delay: Duration::ZERO },
        };

        let mut parameters = Map::new();
        parameters.insert("preco_minimo".to_string(), json!(90000.0));
        parameters.insert("preco_maximo".to_string(), json!(50000.0));
        let error = client
            .invoke(&ToolInvocation::with_parameters("get_vehicles_by_price", parameters))
            .await
            .expect_err("inverted price range is rejected");

        match error {
            ToolError::Failed { tool_name, attempts, last_error } => {
                assert_eq!(tool_name, "get_vehicles_by_price");
                assert_eq!(attempts, 2);
                assert!(last_error.contains("is greater than `preco_maximo`"), "{last_error}");
            }
            other => panic!("expected a failed call, got {other:?}"),
        }

        session.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn content_free_success_maps_to_no_results_sentinel() {
        let session = session_with(SilentServer).await;
        let channel = session.channel();

        let raw = channel.call("get_vehicles", Map::new()).await.expect("successful call");
        assert_eq!(raw, None);

        let payload = ToolClient::connected(Arc::new(channel))
            .invoke(&ToolInvocation::new("get_vehicles"))
            .await
            .expect("success");
        assert_eq!(payload, NO_RESULTS_PAYLOAD);

        session.shutdown().await.expect("shutdown");
    }
}

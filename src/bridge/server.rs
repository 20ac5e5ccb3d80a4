//! Bridge server lifecycle.
//!
//! 1. **Initialisation**: the shim sends `initialize` before anything else
//! 2. **Operation**: `openedFromUrl` runs an import session, `launchClient`
//!    starts the catalog client, `ping` checks liveness
//! 3. **Shutdown**: `shutdown`, an `exit` notification, EOF on stdin or a
//!    termination signal ends the loop and kills tracked clients
//!
//! While a session runs the server is the requesting side: host calls go
//! out as `host/*` requests and the server blocks until each reply comes
//! back. Requests that arrive in the meantime are queued and answered once
//! the session has finished.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tracing::{debug, error, info, warn};

use crate::bridge::host::RpcHost;
use crate::bridge::protocol::{
    parse_message, ErrorCode, IncomingMessage, JsonRpcError, JsonRpcErrorData,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId, PROTOCOL_VERSION,
    SERVER_NAME,
};
use crate::bridge::transport::{LineTransport, StdioTransport};
use crate::import::{ImportController, ImportRequest, ImportSettings, Severity};
use crate::process::ClientProcesses;

/// Default bound on a single host call.
pub const DEFAULT_HOST_TIMEOUT: Duration = Duration::from_secs(120);

/// Server state in the bridge lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Everything the server needs besides its transport.
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// Session settings.
    pub settings: ImportSettings,
    /// Catalog client started by `launchClient`.
    pub client_executable: PathBuf,
    /// Extra image name killed on Windows at shutdown.
    pub client_image_name: Option<String>,
    /// Bound on a single host call.
    pub host_timeout: Duration,
}

/// Parameters for the openedFromUrl request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenedFromUrlParams {
    /// Import payload, as a JSON string or an object.
    #[serde(default)]
    private_info: Value,
}

/// The bridge between the host shim and the import controller.
pub struct BridgeServer<R, W> {
    /// Current server state.
    state: ServerState,
    /// The transport layer.
    transport: LineTransport<R, W>,
    /// Runs import sessions.
    controller: ImportController,
    /// Launched catalog clients.
    clients: ClientProcesses,
    /// Catalog client executable.
    client_executable: PathBuf,
    /// Bound on a single host call.
    host_timeout: Duration,
    /// Last outbound request ID.
    next_host_id: i64,
    /// Inbound lines received while a session was waiting on the host.
    deferred: VecDeque<String>,
}

impl BridgeServer<BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    /// Creates a server on stdin/stdout.
    #[must_use]
    pub fn stdio(options: BridgeOptions) -> Self {
        Self::new(StdioTransport::stdio(), options)
    }
}

impl<R, W> BridgeServer<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a server on an arbitrary transport.
    #[must_use]
    pub fn new(transport: LineTransport<R, W>, options: BridgeOptions) -> Self {
        Self {
            state: ServerState::AwaitingInit,
            transport,
            controller: ImportController::new(options.settings),
            clients: ClientProcesses::new(options.client_image_name),
            client_executable: options.client_executable,
            host_timeout: options.host_timeout,
            next_host_id: 0,
            deferred: VecDeque::new(),
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Launched catalog clients.
    #[must_use]
    pub const fn clients(&self) -> &ClientProcesses {
        &self.clients
    }

    /// Runs the main loop with signal handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> std::io::Result<()> {
        let result = self.run_with_shutdown().await;
        self.clients.terminate_all();
        result
    }

    /// Runs the main loop until shutdown or EOF, without signal handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn serve(&mut self) -> std::io::Result<()> {
        let result = self.read_loop().await;
        self.clients.terminate_all();
        result
    }

    async fn read_loop(&mut self) -> std::io::Result<()> {
        loop {
            let line_result = self.transport.read_line().await;
            if self.handle_transport_result(line_result).await? {
                return Ok(());
            }
        }
    }

    #[cfg(unix)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(std::io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(std::io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    #[cfg(windows)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles the result from transport read, then drains deferred lines.
    ///
    /// Returns `true` if the server should shut down.
    async fn handle_transport_result(
        &mut self,
        line_result: std::io::Result<Option<String>>,
    ) -> std::io::Result<bool> {
        let Some(line) = line_result? else {
            info!("Input closed, shutting down");
            self.state = ServerState::ShuttingDown;
            return Ok(true);
        };

        self.handle_line(&line).await?;

        while self.state != ServerState::ShuttingDown {
            let Some(deferred) = self.deferred.pop_front() else {
                break;
            };
            self.handle_line(&deferred).await?;
        }

        Ok(self.state == ServerState::ShuttingDown)
    }

    /// Handles a single line of input.
    async fn handle_line(&mut self, line: &str) -> std::io::Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }

        match parse_message(line) {
            Ok(msg) => self.handle_message(msg).await,
            Err(error) => self.transport.write_error(&error).await,
        }
    }

    /// Handles a parsed incoming message.
    async fn handle_message(&mut self, msg: IncomingMessage) -> std::io::Result<()> {
        match msg {
            IncomingMessage::Request(req) => self.handle_request(req).await,
            IncomingMessage::Notification(ref notif) => {
                self.handle_notification(notif);
                Ok(())
            }
            IncomingMessage::Reply(reply) => {
                warn!(id = %reply.id, "Ignoring reply outside of a session");
                Ok(())
            }
        }
    }

    /// Handles an incoming request.
    async fn handle_request(&mut self, req: JsonRpcRequest) -> std::io::Result<()> {
        let response = match req.method.as_str() {
            "initialize" => self.handle_initialize(&req),
            "openedFromUrl" => self.handle_opened_from_url(&req).await,
            "launchClient" => self.handle_launch_client(&req),
            "ping" => Ok(Self::handle_ping(&req)),
            "shutdown" => Ok(self.handle_shutdown(&req)),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        };

        match response {
            Ok(resp) => self.transport.write_response(&resp).await,
            Err(error) => self.transport.write_error(&error).await,
        }
    }

    /// Handles an incoming notification.
    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "exit" => {
                info!("Exit notification received");
                self.state = ServerState::ShuttingDown;
            }
            other => debug!(method = other, "Ignoring notification"),
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::new(
                Some(req.id.clone()),
                JsonRpcErrorData::with_message(
                    ErrorCode::InvalidRequest,
                    "Server already initialised",
                ),
            ));
        }

        self.state = ServerState::Running;
        info!("Bridge initialised");

        let result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Runs one import session.
    ///
    /// Session failures are reported in the result, never as a JSON-RPC
    /// error, so the shim has nothing to show.
    async fn handle_opened_from_url(
        &mut self,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let params = match req
            .params
            .clone()
            .map(serde_json::from_value::<OpenedFromUrlParams>)
        {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return Ok(Self::rejected_payload(
                    req,
                    format!("Invalid openedFromUrl params: {e}"),
                ));
            }
            None => OpenedFromUrlParams {
                private_info: Value::Null,
            },
        };

        let request = match ImportRequest::from_payload(&params.private_info) {
            Ok(request) => request,
            Err(e) => return Ok(Self::rejected_payload(req, format!("Invalid privateInfo: {e}"))),
        };

        let mut host = RpcHost::new(
            &mut self.transport,
            &mut self.next_host_id,
            &mut self.deferred,
            self.host_timeout,
        );

        let result = match self.controller.handle(&mut host, &request).await {
            Ok(outcome) => {
                info!(status = outcome.status(), "Import session finished");
                serde_json::to_value(&outcome).map_err(|e| {
                    error!(error = %e, "Failed to serialise session outcome");
                    JsonRpcError::internal_error(
                        req.id.clone(),
                        "Internal error: failed to serialise result",
                    )
                })?
            }
            Err(e) => {
                error!(error = %e, severity = %e.severity(), "Import session aborted");
                json!({
                    "status": "failed",
                    "error": e.to_string(),
                    "severity": e.severity().as_str(),
                })
            }
        };

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Answers an undecodable URL payload with a degraded failure result.
    fn rejected_payload(req: &JsonRpcRequest, message: String) -> JsonRpcResponse {
        warn!(error = %message, "Ignoring URL payload");
        JsonRpcResponse::success(
            req.id.clone(),
            json!({
                "status": "failed",
                "error": message,
                "severity": Severity::Degraded.as_str(),
            }),
        )
    }

    /// Launches the catalog client.
    fn handle_launch_client(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        match self.clients.launch(&self.client_executable) {
            Ok(pid) => Ok(JsonRpcResponse::success(req.id.clone(), json!({ "pid": pid }))),
            Err(e) => {
                error!(
                    executable = %self.client_executable.display(),
                    error = %e,
                    "Failed to launch client"
                );
                Err(JsonRpcError::new(
                    Some(req.id.clone()),
                    JsonRpcErrorData::with_message(
                        ErrorCode::InternalError,
                        format!("Failed to launch client: {e}"),
                    )
                    .with_data(json!({ "path": self.client_executable })),
                ))
            }
        }
    }

    /// Handles the ping request.
    fn handle_ping(req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(req.id.clone(), json!({}))
    }

    /// Kills clients and stops the loop after answering.
    fn handle_shutdown(&mut self, req: &JsonRpcRequest) -> JsonRpcResponse {
        info!(clients = self.clients.len(), "Shutdown requested");
        self.clients.terminate_all();
        self.state = ServerState::ShuttingDown;
        JsonRpcResponse::success(req.id.clone(), json!({}))
    }

    /// Ensures the server is in the Running state.
    fn require_running(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.state != ServerState::Running {
            return Err(JsonRpcError::new(
                Some(id.clone()),
                JsonRpcErrorData::with_message(ErrorCode::InvalidRequest, "Server not initialised"),
            ));
        }
        Ok(())
    }
}

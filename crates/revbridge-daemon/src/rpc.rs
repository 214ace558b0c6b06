//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! newline-delimited JSON-RPC 2.0 method calls to the command handlers.
//! A connection that calls `subscribe_events` switches to streaming
//! `event` notifications until the client disconnects.
//!
//! State-changing methods are authenticated by [`auth::authenticate`] before
//! their handler runs. Reads and subscriptions are open to any local client.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use revbridge_bridge::BridgeError;

use crate::auth;
use crate::commands;
use crate::events::EventFilter;
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Result or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC notification pushed to event subscribers.
#[derive(Debug, Serialize)]
pub struct RpcNotification<'a> {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: &'a revbridge_types::EventRecord,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    /// Stable error code.
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    fn new(code: i32, message: &str, data: Option<serde_json::Value>) -> Self {
        Self {
            code,
            message: message.to_string(),
            data,
        }
    }

    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self::new(-32700, "PARSE_ERROR", None)
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self::new(-32600, "INVALID_REQUEST", None)
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self::new(-32601, "METHOD_NOT_FOUND", Some(serde_json::json!({"method": method})))
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self::new(-32602, "INVALID_PARAMS", Some(serde_json::json!({"detail": detail})))
    }

    /// Missing or invalid request signature (-32001).
    pub fn unauthenticated(detail: &str) -> Self {
        Self::new(-32001, "UNAUTHORIZED", Some(serde_json::json!({"detail": detail})))
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self::new(-32603, "INTERNAL_ERROR", Some(serde_json::json!({"detail": detail})))
    }
}

/// Bridge failures map to stable application codes in -32001..=-32099.
impl From<BridgeError> for RpcError {
    fn from(err: BridgeError) -> Self {
        let detail = err.to_string();
        match err {
            BridgeError::Unauthorized { caller } => Self::new(
                -32001,
                "UNAUTHORIZED",
                Some(serde_json::json!({"caller": caller})),
            ),
            BridgeError::OperationPaused => Self::new(-32002, "OPERATION_PAUSED", None),
            BridgeError::ZeroAddress => Self::new(-32003, "ZERO_ADDRESS", None),
            BridgeError::InvalidBeneficiary => Self::new(-32004, "INVALID_BENEFICIARY", None),
            BridgeError::ZeroAmount => Self::new(-32005, "ZERO_AMOUNT", None),
            BridgeError::InvalidInvoiceId { len, max } => Self::new(
                -32006,
                "INVALID_INVOICE_ID",
                Some(serde_json::json!({"len": len, "max": max})),
            ),
            BridgeError::InvoiceAlreadyProcessed { invoice_id } => Self::new(
                -32010,
                "INVOICE_ALREADY_PROCESSED",
                Some(serde_json::json!({"invoice_id": invoice_id})),
            ),
            BridgeError::SettlementNotFound { settlement_id } => Self::new(
                -32011,
                "SETTLEMENT_NOT_FOUND",
                Some(serde_json::json!({"settlement_id": settlement_id})),
            ),
            BridgeError::InvoiceNotFound { invoice_id } => Self::new(
                -32012,
                "INVOICE_NOT_FOUND",
                Some(serde_json::json!({"invoice_id": invoice_id})),
            ),
            BridgeError::InvalidSettlementStatus {
                settlement_id,
                current,
                required,
            } => Self::new(
                -32013,
                "INVALID_SETTLEMENT_STATUS",
                Some(serde_json::json!({
                    "settlement_id": settlement_id,
                    "current": current,
                    "required": required,
                })),
            ),
            BridgeError::InvalidPercentages { total } => Self::new(
                -32020,
                "INVALID_PERCENTAGES",
                Some(serde_json::json!({"total_bps": total})),
            ),
            BridgeError::Partition(_) => Self::new(
                -32030,
                "PARTITION_STORE_ERROR",
                Some(serde_json::json!({"detail": detail})),
            ),
            BridgeError::Storage(_) => Self::new(
                -32031,
                "STORAGE_ERROR",
                Some(serde_json::json!({"detail": detail})),
            ),
            BridgeError::Overflow => Self::new(-32032, "OVERFLOW", None),
            BridgeError::Internal(_) => Self::internal_error(&detail),
        }
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        let (reader, writer) = stream.into_split();
                        if let Err(e) = handle_connection(state, BufReader::new(reader), writer).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection<R, W>(state: Arc<DaemonState>, mut reader: R, mut writer: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break; // EOF
        }
        if line.trim().is_empty() {
            continue;
        }

        let request = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => request,
            Err(_) => {
                let response = RpcResponse::error(serde_json::Value::Null, RpcError::parse_error());
                write_line(&mut writer, &response).await?;
                continue;
            }
        };

        if request.method == "subscribe_events" && request.jsonrpc == "2.0" {
            let filter = match parse_filter(&request.params) {
                Ok(filter) => filter,
                Err(err) => {
                    write_line(&mut writer, &RpcResponse::error(request.id, err)).await?;
                    continue;
                }
            };
            // Subscribe before acknowledging so no event falls in between
            let rx = state.event_bus.subscribe();
            let ack = RpcResponse::success(request.id, serde_json::json!({"subscribed": true}));
            write_line(&mut writer, &ack).await?;
            return stream_events(rx, filter, reader, writer).await;
        }

        let response = dispatch_request(state.clone(), request).await;
        write_line(&mut writer, &response).await?;
    }

    Ok(())
}

fn parse_filter(params: &serde_json::Value) -> Result<EventFilter, RpcError> {
    if params.is_null() {
        return Ok(EventFilter::default());
    }
    serde_json::from_value(params.clone()).map_err(|e| RpcError::invalid_params(&e.to_string()))
}

/// Push matching events as notifications until the client hangs up.
async fn stream_events<R, W>(
    mut rx: broadcast::Receiver<revbridge_types::EventRecord>,
    filter: EventFilter,
    mut reader: R,
    mut writer: W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut discard = String::new();
    loop {
        tokio::select! {
            read = reader.read_line(&mut discard) => {
                if read? == 0 {
                    break;
                }
                discard.clear();
            }
            received = rx.recv() => match received {
                Ok(record) => {
                    if filter.matches(&record) {
                        let notification = RpcNotification {
                            jsonrpc: "2.0",
                            method: "event",
                            params: &record,
                        };
                        write_line(&mut writer, &notification).await?;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagged, backfill with get_events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
    Ok(())
}

async fn write_line<W, T>(writer: &mut W, message: &T) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut json = serde_json::to_string(message)?;
    json.push('\n');
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
pub async fn dispatch_request(state: Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    if request.jsonrpc != "2.0" {
        return RpcResponse::error(id, RpcError::invalid_request());
    }

    let method = request.method.as_str();
    let params = &request.params;
    debug!(method, "Dispatching RPC method");

    let result = match method {
        // Gateway and control plane
        "bridge_revenue"
        | "bridge_revenue_simple"
        | "reverse_settlement"
        | "dispute_settlement"
        | "set_operator"
        | "set_allocation"
        | "pause"
        | "unpause"
        | "transfer_ownership" => dispatch_write(&state, method, params).await,

        // Queries
        "get_settlement" => commands::query::get_settlement(&state, params).await,
        "get_settlement_by_invoice" => commands::query::get_settlement_by_invoice(&state, params).await,
        "is_invoice_processed" => commands::query::is_invoice_processed(&state, params).await,
        "get_totals" => commands::query::get_totals(&state).await,
        "get_allocation" => commands::query::get_allocation(&state).await,
        "preview_allocation" => commands::query::preview_allocation(&state, params).await,
        "get_partition_balance" => commands::query::get_partition_balance(&state, params).await,
        "get_recent_settlements" => commands::query::get_recent_settlements(&state, params).await,
        "get_events" => commands::query::get_events(&state, params).await,
        "get_status" => commands::query::get_status(&state).await,

        // Only meaningful as the first call on a streaming connection
        "subscribe_events" => Err(RpcError::invalid_request()),

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}

/// Authenticate a write, then run its handler as the signing account.
async fn dispatch_write(state: &Arc<DaemonState>, method: &str, params: &serde_json::Value) -> commands::Result {
    let caller = auth::authenticate(state, method, params, commands::unix_now()).await?;
    match method {
        "bridge_revenue" => commands::bridge::bridge_revenue(state, &caller, params).await,
        "bridge_revenue_simple" => commands::bridge::bridge_revenue_simple(state, &caller, params).await,
        "reverse_settlement" => commands::bridge::reverse_settlement(state, &caller, params).await,
        "dispute_settlement" => commands::bridge::dispute_settlement(state, &caller, params).await,
        "set_operator" => commands::admin::set_operator(state, &caller, params).await,
        "set_allocation" => commands::admin::set_allocation(state, &caller, params).await,
        "pause" => commands::admin::pause(state, &caller).await,
        "unpause" => commands::admin::unpause(state, &caller).await,
        "transfer_ownership" => commands::admin::transfer_ownership(state, &caller, params).await,
        _ => Err(RpcError::method_not_found(method)),
    }
}

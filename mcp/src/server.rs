//! Line-delimited JSON-RPC loop over a reader/writer pair.
//!
//! One request is handled to completion before the next line is read.
//! Responses are written as a single line each and flushed immediately.

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::handlers::{DelegateArgs, Handlers};
use crate::protocol::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND,
    PARSE_ERROR, Request, Response, ToolCallParams, ToolResult,
};
use crate::tools::{DELEGATE_TASK, LIST_AGENTS, ToolSet};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "subagents-mcp";

pub struct Server {
    tools: ToolSet,
    handlers: Handlers,
}

impl Server {
    pub fn new(handlers: Handlers) -> Result<Self> {
        Ok(Self {
            tools: ToolSet::new()?,
            handlers,
        })
    }

    /// Serve until EOF on `reader` or until `cancel` fires.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W, cancel: &CancellationToken) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        loop {
            let line = tokio::select! {
                line = lines.next_line() => line.context("read request")?,
                () = cancel.cancelled() => {
                    info!("shutdown requested");
                    return Ok(());
                }
            };
            let Some(line) = line else {
                debug!("stdin closed");
                return Ok(());
            };

            if let Some(response) = self.handle_line(&line, cancel).await {
                let mut payload = serde_json::to_string(&response).context("encode response")?;
                payload.push('\n');
                writer
                    .write_all(payload.as_bytes())
                    .await
                    .context("write response")?;
                writer.flush().await.context("flush response")?;
            }

            if cancel.is_cancelled() {
                info!("shutdown requested");
                return Ok(());
            }
        }
    }

    /// Decode one line and produce its response, if it warrants one.
    pub async fn handle_line(&self, line: &str, cancel: &CancellationToken) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "undecodable request");
                return Some(Response::error(Value::Null, PARSE_ERROR, "parse error"));
            }
        };
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: Request = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "malformed request");
                return Some(Response::error(id, INVALID_REQUEST, "invalid request"));
            }
        };

        self.handle(request, cancel).await
    }

    async fn handle(&self, request: Request, cancel: &CancellationToken) -> Option<Response> {
        debug!(method = %request.method, "incoming request");
        if request.is_notification() {
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);
        if request.jsonrpc != JSONRPC_VERSION {
            return Some(Response::error(
                id,
                INVALID_REQUEST,
                "jsonrpc must be 2.0",
            ));
        }

        let response = match request.method.as_str() {
            "initialize" => self.initialize(id, request.params.as_ref()),
            "tools/list" => Response::ok(id, json!({ "tools": self.tools.definitions() })),
            "tools/call" => self.call_tool(id, request.params, cancel).await,
            _ => Response::error(id, METHOD_NOT_FOUND, "method not found"),
        };
        Some(response)
    }

    fn initialize(&self, id: Value, params: Option<&Value>) -> Response {
        if params.is_some_and(|params| !params.is_object() && !params.is_null()) {
            return Response::error(id, INVALID_PARAMS, "invalid initialize params");
        }
        Response::ok(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        )
    }

    async fn call_tool(
        &self,
        id: Value,
        params: Option<Value>,
        cancel: &CancellationToken,
    ) -> Response {
        let params: ToolCallParams = match params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            _ => return Response::error(id, INVALID_PARAMS, "invalid params"),
        };
        if !self.tools.contains(&params.name) {
            return Response::error(id, METHOD_NOT_FOUND, "tool not found");
        }

        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        if let Err(err) = self.tools.validate(&params.name, &arguments) {
            return Response::error(id, INVALID_PARAMS, err.to_string());
        }

        let outcome = match params.name.as_str() {
            LIST_AGENTS => self.handlers.list_agents(),
            DELEGATE_TASK => match serde_json::from_value::<DelegateArgs>(arguments) {
                Ok(args) => self.handlers.delegate_task(&args, cancel).await,
                Err(_) => {
                    return Response::error(
                        id,
                        INVALID_PARAMS,
                        "invalid delegate_task arguments",
                    );
                }
            },
            _ => return Response::error(id, METHOD_NOT_FOUND, "tool not found"),
        };

        match outcome {
            Ok(text) => match serde_json::to_value(ToolResult::text(text)) {
                Ok(result) => Response::ok(id, result),
                Err(err) => Response::error(id, INTERNAL_ERROR, err.to_string()),
            },
            Err(err) => {
                error!(tool = %params.name, error = %err, "tool call failed");
                Response::error(id, INTERNAL_ERROR, err.to_string())
            }
        }
    }
}

//! Tool gateway: JSON-RPC dispatch for the `save_to_sheet` tool.

use std::future::Future;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::errors::InvoiceParserResult;
use crate::invoice::parse_invoice_data;
use crate::mcp::tools::{load_tools, SAVE_TO_SHEET};
use crate::mcp::transport::McpTransport;
use crate::mcp::types::{
    CallToolParams, CallToolResult, ErrorCode, JsonRpcRequest, JsonRpcResponse, McpError, McpTool,
    ToolContent, DEFAULT_PROTOCOL_VERSION, JSONRPC_VERSION,
};
use crate::sheets::SheetWriter;

pub const SERVER_NAME: &str = "invoice-parser";

pub struct McpServer {
    writer: Arc<SheetWriter>,
    tools: Vec<McpTool>,
}

impl McpServer {
    pub fn new(writer: Arc<SheetWriter>) -> InvoiceParserResult<Self> {
        Ok(Self {
            writer,
            tools: load_tools()?,
        })
    }

    /// Serves requests one at a time until the peer closes the stream or
    /// `shutdown` resolves. Shutdown is only observed between requests, so a
    /// started append always runs to completion.
    pub async fn serve<T, F>(&self, mut transport: T, shutdown: F) -> InvoiceParserResult<()>
    where
        T: McpTransport,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            let message = tokio::select! {
                message = transport.recv() => message?,
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested, closing transport");
                    break;
                }
            };
            let Some(message) = message else {
                tracing::info!("input closed, stopping server");
                break;
            };
            if let Some(response) = self.handle_message(&message).await {
                transport.send(&serde_json::to_value(&response)?).await?;
            }
        }
        transport.close().await
    }

    /// Handles one raw message. Returns `None` for notifications and for
    /// responses sent by the client.
    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable message");
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    McpError::new(ErrorCode::ParseError, format!("Parse error: {e}")),
                ));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        if value.get("method").is_none()
            && (value.get("result").is_some() || value.get("error").is_some())
        {
            tracing::debug!(id = %id, "ignoring client response");
            return None;
        }

        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(r) => r,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    id,
                    McpError::new(ErrorCode::InvalidRequest, format!("Invalid request: {e}")),
                ));
            }
        };
        if !request.jsonrpc.is_empty() && request.jsonrpc != JSONRPC_VERSION {
            tracing::debug!(version = %request.jsonrpc, "unexpected jsonrpc version");
        }

        let Some(id) = request.id else {
            tracing::debug!(method = %request.method, "notification received");
            return None;
        };

        tracing::debug!(method = %request.method, id = %id, "request received");
        Some(match self.dispatch(&request.method, request.params).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => {
                tracing::warn!(
                    method = %request.method,
                    code = err.code.code(),
                    reason = %err.message,
                    "request failed"
                );
                JsonRpcResponse::failure(id, err)
            }
        })
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        match method {
            "initialize" => Ok(self.initialize(params.as_ref())),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.tools })),
            "tools/call" => {
                let params = params.ok_or_else(|| {
                    McpError::new(ErrorCode::InvalidParams, "tools/call requires params")
                })?;
                let params: CallToolParams = serde_json::from_value(params).map_err(|e| {
                    McpError::new(
                        ErrorCode::InvalidParams,
                        format!("Invalid tools/call params: {e}"),
                    )
                })?;
                let result = self.call_tool(&params.name, params.arguments).await?;
                serde_json::to_value(result)
                    .map_err(|e| McpError::new(ErrorCode::InternalError, e.to_string()))
            }
            other => Err(McpError::new(
                ErrorCode::MethodNotFound,
                format!("Method not found: {other}"),
            )),
        }
    }

    fn initialize(&self, params: Option<&Value>) -> Value {
        let protocol_version = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);
        tracing::info!(protocol_version, "client initialized");
        json!({
            "protocolVersion": protocol_version,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            }
        })
    }

    /// Runs a named tool. Exactly one append per successful call; nothing
    /// reaches the sheet when the name or arguments are rejected.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> Result<CallToolResult, McpError> {
        if name != SAVE_TO_SHEET {
            return Err(McpError::new(
                ErrorCode::MethodNotFound,
                format!("Unknown tool: {name}"),
            ));
        }

        let arguments = arguments.unwrap_or(Value::Null);
        let data = parse_invoice_data(&arguments).map_err(|e| {
            McpError::new(ErrorCode::InvalidParams, format!("Invalid invoice data format: {e}"))
        })?;

        let report = self.writer.append(&data).await.map_err(|e| {
            tracing::error!(error = %e, "append failed");
            McpError::new(
                ErrorCode::InternalError,
                format!("Error saving to spreadsheet: {e}"),
            )
        })?;

        let text = serde_json::to_string_pretty(&json!({
            "message": "Invoice data saved successfully",
            "savedData": data,
            "appended": report,
        }))
        .map_err(|e| McpError::new(ErrorCode::InternalError, e.to_string()))?;

        Ok(CallToolResult {
            content: vec![ToolContent::Text { text }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::memory::{FailMode, InMemorySheet};

    fn server_with(sheet: Arc<InMemorySheet>) -> McpServer {
        McpServer::new(Arc::new(SheetWriter::new(sheet, None))).unwrap()
    }

    fn saved_payload(result: &CallToolResult) -> Value {
        let ToolContent::Text { text } = &result.content[0];
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn saves_valid_invoice() {
        let sheet = Arc::new(InMemorySheet::new());
        let server = server_with(sheet.clone());

        let result = server
            .call_tool(
                SAVE_TO_SHEET,
                Some(json!({"items": [{"item": "Widget A", "amount": 100}], "sender": "Acme"})),
            )
            .await
            .unwrap();

        let payload = saved_payload(&result);
        assert_eq!(payload["message"], "Invoice data saved successfully");
        assert_eq!(payload["savedData"]["items"][0]["amount"], 100);
        assert_eq!(payload["savedData"]["sender"], "Acme");
        assert_eq!(payload["appended"]["startRow"], 1);
        assert_eq!(sheet.rows().await.len(), 2);
    }

    #[tokio::test]
    async fn unknown_tool_does_not_touch_store() {
        let sheet = Arc::new(InMemorySheet::new());
        let server = server_with(sheet.clone());

        let err = server
            .call_tool("delete_sheet", Some(json!({"items": []})))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::MethodNotFound);
        assert_eq!(err.message, "Unknown tool: delete_sheet");
        assert_eq!(sheet.read_count(), 0);
        assert_eq!(sheet.write_count(), 0);
    }

    #[tokio::test]
    async fn invalid_arguments_are_rejected_before_writing() {
        let sheet = Arc::new(InMemorySheet::new());
        let server = server_with(sheet.clone());

        for args in [
            None,
            Some(json!({})),
            Some(json!({"items": []})),
            Some(json!({"items": [{"item": "Widget", "amount": "100"}]})),
        ] {
            let err = server.call_tool(SAVE_TO_SHEET, args).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidParams);
            assert!(err.message.starts_with("Invalid invoice data format"));
        }
        assert_eq!(sheet.read_count(), 0);
    }

    #[tokio::test]
    async fn store_failure_becomes_internal_error() {
        let sheet = Arc::new(InMemorySheet::new().failing(FailMode::OnWrite));
        let server = server_with(sheet.clone());

        let err = server
            .call_tool(SAVE_TO_SHEET, Some(json!({"items": [{"item": "A", "amount": 1}]})))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InternalError);
        assert_eq!(
            err.message,
            "Error saving to spreadsheet: Sheets API error: simulated write failure"
        );
        assert_eq!(sheet.write_count(), 1);
    }

    #[tokio::test]
    async fn malformed_json_gets_parse_error() {
        let server = server_with(Arc::new(InMemorySheet::new()));
        let response = server.handle_message("{not json").await.unwrap();
        assert_eq!(response.id, Value::Null);
        assert_eq!(response.error.unwrap().code, ErrorCode::ParseError.code());
    }

    #[tokio::test]
    async fn request_without_method_is_invalid() {
        let server = server_with(Arc::new(InMemorySheet::new()));
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":4,"params":{}}"#)
            .await
            .unwrap();
        assert_eq!(response.id, json!(4));
        assert_eq!(response.error.unwrap().code, ErrorCode::InvalidRequest.code());
    }

    #[tokio::test]
    async fn notifications_and_client_responses_get_no_reply() {
        let server = server_with(Arc::new(InMemorySheet::new()));
        assert!(server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await
            .is_none());
        assert!(server
            .handle_message(r#"{"jsonrpc":"2.0","id":9,"result":{}}"#)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn unknown_method_is_not_found() {
        let server = server_with(Arc::new(InMemorySheet::new()));
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":"x","method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, ErrorCode::MethodNotFound.code());
    }

    #[tokio::test]
    async fn initialize_echoes_requested_protocol() {
        let server = server_with(Arc::new(InMemorySheet::new()));
        let response = server
            .handle_message(
                &json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "method": "initialize",
                    "params": {"protocolVersion": "2025-03-26"}
                })
                .to_string(),
            )
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2025-03-26");
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert!(result["capabilities"]["tools"].is_object());
    }
}

//! Server runtime: JSON-RPC dispatch and MCP transports (stdio, Streamable
//! HTTP and SSE) in front of the orchestration [`Pipeline`].

pub mod pipeline;

use axum::{
    body::Bytes,
    routing::{get, post},
    Json, Router,
};
use projdev_core::{IdeaExpander, PagePublisher, ProjectRequest, RepositoryProvisioner};
use projdev_proto as proto;
use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, ErrorCode, Implementation, ListToolsResult,
        PaginatedRequestParam, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    transport::{
        io,
        sse_server::{SseServer, SseServerConfig},
        streamable_http_server::{session::local::LocalSessionManager, StreamableHttpService},
    },
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
};
use schemars::schema::RootSchema;
use schemars::schema_for;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub use crate::pipeline::{Pipeline, PipelineError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("rmcp: {0}")]
    Rmcp(String),
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    #[allow(dead_code)]
    pub jsonrpc: Option<String>,
    pub id: Option<serde_json::Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

pub struct Server<E, R, P> {
    pipeline: Arc<Pipeline<E, R, P>>,
}

impl<E, R, P> Clone for Server<E, R, P> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

impl<E, R, P> Server<E, R, P>
where
    E: IdeaExpander + 'static,
    R: RepositoryProvisioner + 'static,
    P: PagePublisher + 'static,
{
    #[must_use]
    pub fn new(pipeline: Pipeline<E, R, P>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    pub async fn run_stdio(&self) -> Result<(), ServerError> {
        info!("server running (stdio rmcp)");
        let adapter = RmcpAdapter::new(self.clone());
        let service = adapter
            .serve(io::stdio())
            .await
            .map_err(|e| ServerError::Rmcp(e.to_string()))?;
        service
            .waiting()
            .await
            .map_err(|e| ServerError::Rmcp(e.to_string()))?;
        info!("stdio session closed");
        Ok(())
    }

    /// Routes served over HTTP: Streamable HTTP MCP at `/mcp`, the SSE pair
    /// (`/sse`, `/message`), raw JSON-RPC at `/rpc` and `/healthz`.
    pub fn http_router(&self, bind_addr: SocketAddr, shutdown_token: CancellationToken) -> Router {
        let config = SseServerConfig {
            bind: bind_addr,
            sse_path: "/sse".to_string(),
            post_path: "/message".to_string(),
            ct: shutdown_token,
            sse_keep_alive: None,
        };
        let (sse_server, sse_router) = SseServer::new(config);
        let sse_adapter = RmcpAdapter::new(self.clone());
        sse_server.with_service(move || sse_adapter.clone());

        let streamable_adapter = RmcpAdapter::new(self.clone());
        let streamable = StreamableHttpService::new(
            move || Ok(streamable_adapter.clone()),
            LocalSessionManager::default().into(),
            Default::default(),
        );

        let rpc_server = self.clone();
        sse_router
            .nest_service("/mcp", streamable)
            .route("/healthz", get(healthz))
            .route(
                "/rpc",
                post(move |body: Bytes| {
                    let server = rpc_server.clone();
                    async move { Json(server.handle_rpc_body(&body).await) }
                }),
            )
    }

    pub async fn run_http(&self, addr: &str) -> Result<(), ServerError> {
        let bind_addr: SocketAddr = addr
            .parse()
            .map_err(|e: std::net::AddrParseError| ServerError::Io(e.to_string()))?;

        let shutdown_token = CancellationToken::new();
        let app = self.http_router(bind_addr, shutdown_token.clone());

        let listener = tokio::net::TcpListener::bind(bind_addr)
            .await
            .map_err(|e| ServerError::Io(e.to_string()))?;

        info!(%addr, "http server listening (streamable http at /mcp, SSE at /sse)");
        let server_shutdown = shutdown_token.child_token();
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                server_shutdown.cancelled().await;
            })
            .into_future();
        tokio::pin!(server);

        tokio::select! {
            res = &mut server => {
                res.map_err(|e| ServerError::Io(e.to_string()))
            }
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl_c received; shutting down http server");
                shutdown_token.cancel();
                server.as_mut().await.map_err(|e| ServerError::Io(e.to_string()))
            }
        }
    }

    /// Decode one raw JSON-RPC request body and dispatch it. Malformed JSON
    /// is `-32700`; well-formed JSON that is not a request is `-32600`.
    pub async fn handle_rpc_body(&self, body: &[u8]) -> JsonRpcResponse {
        let value: serde_json::Value = match serde_json::from_slice(body) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "rejecting unparsable JSON-RPC body");
                return rpc_error(None, -32700, "Parse error", e.to_string());
            }
        };
        let id = value.get("id").cloned();
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(req) => self.handle_request(req).await,
            Err(e) => rpc_error(id, -32600, "Invalid Request", e.to_string()),
        }
    }

    pub async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let method_name = req.method.clone();
        let id_repr = req.id.as_ref().map(|v| v.to_string());
        debug!(method = %method_name, id = %id_repr.as_deref().unwrap_or("null"), "handling JSON-RPC request");
        match req.method.as_str() {
            proto::METHOD_INITIALIZE => self.handle_initialize(req).await,
            proto::METHOD_TOOLS_LIST => self.handle_tools_list(req).await,
            proto::METHOD_TOOLS_CALL => self.handle_tools_call(req).await,
            other => match proto::canonical_tool_name(other) {
                Some(proto::TOOL_DEVELOP_AND_CREATE_PROJECT) => self.handle_develop(req).await,
                Some(proto::TOOL_CREATE_NOTION_PROJECT_PAGE) => {
                    self.handle_notion_page(req).await
                }
                _ => {
                    debug!(method = %method_name, "unknown method");
                    method_not_found(req.id)
                }
            },
        }
    }

    async fn handle_initialize(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let idv = req.id.clone();
        let params: proto::InitializeParams = match parse_params(req.params) {
            Ok(p) => p,
            Err(e) => return invalid_params(idv, e),
        };
        let protocol_version = params
            .protocol_version
            .unwrap_or_else(|| proto::MCP_PROTOCOL_VERSION.to_string());
        debug!(protocol_version = %protocol_version, "initialize handshake");

        let result = proto::InitializeResult {
            protocol_version,
            capabilities: json!({
                "tools": {
                    "list": { "available": true },
                    "call": { "available": true }
                }
            }),
            server_info: proto::ServerInfo {
                name: proto::SERVER_NAME.into(),
                title: Some(SERVER_TITLE.into()),
                version: env!("CARGO_PKG_VERSION").into(),
            },
            instructions: Some(SERVER_INSTRUCTIONS.into()),
        };
        JsonRpcResponse {
            jsonrpc: "2.0",
            id: idv,
            result: Some(json!(result)),
            error: None,
        }
    }

    async fn handle_tools_list(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let idv = req.id.clone();
        let params: proto::ListToolsParams = match parse_params(req.params) {
            Ok(p) => p,
            Err(e) => return invalid_params(idv, e),
        };
        // single page; cursor is accepted and ignored
        let _ = params;
        let tools = match build_tool_definitions() {
            Ok(t) => t,
            Err(e) => {
                error!(error=%e, "failed to build tool definitions");
                return internal_error(idv, "failed to build tool definitions");
            }
        };
        debug!(tool_count = tools.len(), "tools.list returning definitions");
        let result = match serde_json::to_value(proto::ListToolsResult {
            tools,
            next_cursor: None,
        }) {
            Ok(v) => v,
            Err(e) => {
                error!(error=%e, "failed to serialize tool list");
                return internal_error(idv, "failed to serialize tool list");
            }
        };
        JsonRpcResponse {
            jsonrpc: "2.0",
            id: idv,
            result: Some(result),
            error: None,
        }
    }

    async fn handle_tools_call(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let idv = req.id.clone();
        let params: proto::CallToolParams = match parse_params(req.params) {
            Ok(p) => p,
            Err(e) => return invalid_params(idv, e),
        };
        let proto::CallToolParams {
            tool_name,
            arguments,
        } = params;
        debug!(requested_tool = %tool_name, "tools.call requested");
        let Some(canonical_name) = proto::canonical_tool_name(&tool_name) else {
            return method_not_found(idv);
        };
        let arguments = match normalize_tool_arguments(arguments) {
            Ok(v) => v,
            Err(e) => return invalid_params(idv, e),
        };
        let inner_req = JsonRpcRequest {
            jsonrpc: Some("2.0".into()),
            id: idv.clone(),
            method: canonical_name.into(),
            params: Some(arguments),
        };
        let inner_resp = match canonical_name {
            proto::TOOL_DEVELOP_AND_CREATE_PROJECT => self.handle_develop(inner_req).await,
            proto::TOOL_CREATE_NOTION_PROJECT_PAGE => self.handle_notion_page(inner_req).await,
            _ => method_not_found(idv.clone()),
        };
        let JsonRpcResponse {
            result: inner_result,
            error: inner_error,
            ..
        } = inner_resp;
        if let Some(err) = inner_error {
            return JsonRpcResponse {
                jsonrpc: "2.0",
                id: idv,
                result: None,
                error: Some(err),
            };
        }
        let payload = inner_result.unwrap_or(serde_json::Value::Null);
        let call_result = tool_call_result(payload);
        debug!(requested_tool = %tool_name, canonical_tool = canonical_name, "tools.call completed");
        JsonRpcResponse {
            jsonrpc: "2.0",
            id: idv,
            result: Some(call_result),
            error: None,
        }
    }

    async fn handle_develop(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let idv = req.id.clone();
        let params: proto::DevelopParams = match parse_params(req.params) {
            Ok(p) => p,
            Err(e) => return invalid_params(idv, e),
        };
        let request = ProjectRequest::new(params.idea, params.project_name)
            .with_page(params.create_notion_page);
        match self.pipeline.develop(&request).await {
            Ok(report) => JsonRpcResponse {
                jsonrpc: "2.0",
                id: idv,
                result: Some(json!(report)),
                error: None,
            },
            Err(PipelineError::Validation(e)) => invalid_params(idv, e.to_string()),
            Err(e) => {
                error!(error = %e, code = e.code(), project = %request.project_name, "develop_and_create_project failed");
                mcp_error_response(idv, e.code(), &e.to_string())
            }
        }
    }

    async fn handle_notion_page(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let idv = req.id.clone();
        let params: proto::NotionPageParams = match parse_params(req.params) {
            Ok(p) => p,
            Err(e) => return invalid_params(idv, e),
        };
        let outcome = self
            .pipeline
            .publish_page(&params.idea, &params.project_name, &params.github_url)
            .await;
        let text = outcome.legacy_text().unwrap_or_default();
        JsonRpcResponse {
            jsonrpc: "2.0",
            id: idv,
            result: Some(serde_json::Value::String(text)),
            error: None,
        }
    }
}

const SERVER_TITLE: &str = "Project Development Server";
const SERVER_INSTRUCTIONS: &str = "Call develop_and_create_project with an idea and a repository name to expand the idea into a specification, create a GitHub repository seeded with it, and optionally mirror it into Notion.";

/// Objects are exposed as `structuredContent`; every payload is also sent as
/// a text block.
fn tool_call_result(payload: serde_json::Value) -> serde_json::Value {
    let text = match &payload {
        serde_json::Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "null".to_string()),
    };
    let mut result = json!({
        "content": [
            {
                "type": "text",
                "text": text
            }
        ]
    });
    if payload.is_object() {
        result["structuredContent"] = payload;
    }
    result
}

fn rpc_error(
    id: Option<serde_json::Value>,
    code: i64,
    message: &str,
    detail: String,
) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(JsonRpcError {
            code,
            message: message.into(),
            data: Some(json!({"code": "E_PARSE", "message": detail})),
        }),
    }
}

fn method_not_found(id: Option<serde_json::Value>) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(JsonRpcError {
            code: -32601,
            message: "Method not found".into(),
            data: None,
        }),
    }
}

fn invalid_params(id: Option<serde_json::Value>, msg: String) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(JsonRpcError {
            code: -32602,
            message: "Invalid params".into(),
            data: Some(json!({"code":"E_VALIDATION","message": msg})),
        }),
    }
}

fn mcp_error_response(id: Option<serde_json::Value>, code: &str, message: &str) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(JsonRpcError {
            code: -32000,
            message: message.to_string(),
            data: Some(json!({"code": code})),
        }),
    }
}

fn internal_error(id: Option<serde_json::Value>, msg: &str) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(JsonRpcError {
            code: -32603,
            message: "Internal error".into(),
            data: Some(json!({"code": "E_INTERNAL", "message": msg})),
        }),
    }
}

fn build_tool_definitions() -> Result<Vec<proto::ToolDefinition>, ServerError> {
    let mut tools = Vec::new();
    push_tool_definition(
        &mut tools,
        proto::TOOL_DEVELOP_AND_CREATE_PROJECT,
        "Develop an idea using Claude and create a GitHub repo with project spec, optionally mirrored to a Notion page.",
        schema_for!(proto::DevelopParams),
    )?;
    push_tool_definition(
        &mut tools,
        proto::TOOL_CREATE_NOTION_PROJECT_PAGE,
        "Create a Notion project page linking an existing GitHub repository.",
        schema_for!(proto::NotionPageParams),
    )?;
    Ok(tools)
}

fn push_tool_definition(
    tools: &mut Vec<proto::ToolDefinition>,
    name: &str,
    description: &str,
    schema: RootSchema,
) -> Result<(), ServerError> {
    let schema_value = root_schema_to_value(schema)?;
    tools.push(proto::ToolDefinition {
        name: proto::exported_tool_name(name),
        description: Some(description.to_string()),
        input_schema: schema_value,
    });
    Ok(())
}

fn root_schema_to_value(schema: RootSchema) -> Result<serde_json::Value, ServerError> {
    serde_json::to_value(schema).map_err(|e| ServerError::Parse(e.to_string()))
}

fn parse_params<T: DeserializeOwned>(v: Option<serde_json::Value>) -> Result<T, String> {
    let value = match v {
        None | Some(serde_json::Value::Null) => json!({}),
        Some(serde_json::Value::Array(items)) if items.is_empty() => json!({}),
        Some(other) => other,
    };
    serde_json::from_value(value).map_err(|e| e.to_string())
}

/// Some clients wrap tool arguments as `{"type": "input_json", "json": {...}}`
/// or send them as a JSON string; unwrap those to a plain object.
fn normalize_tool_arguments(arguments: serde_json::Value) -> Result<serde_json::Value, String> {
    match arguments {
        serde_json::Value::Null => Ok(json!({})),
        serde_json::Value::Object(map) => {
            let wrapped = map
                .get("type")
                .and_then(|t| t.as_str())
                .map(|t| t.to_ascii_lowercase().replace(['-', ' '], "_"));
            match wrapped.as_deref() {
                Some("input_json" | "json" | "object" | "input_object") => map
                    .get("json")
                    .or_else(|| map.get("object"))
                    .cloned()
                    .ok_or_else(|| "json argument missing `json` payload".to_string()),
                _ => Ok(serde_json::Value::Object(map)),
            }
        }
        serde_json::Value::String(raw) => match serde_json::from_str(raw.trim()) {
            Ok(serde_json::Value::Object(obj)) => Ok(serde_json::Value::Object(obj)),
            _ => Err("string arguments must contain a JSON object".into()),
        },
        other => Err(format!("unsupported arguments type: {other}")),
    }
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({"ok": true}))
}

struct RmcpAdapter<E, R, P> {
    inner: Server<E, R, P>,
}

impl<E, R, P> Clone for RmcpAdapter<E, R, P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E, R, P> RmcpAdapter<E, R, P>
where
    E: IdeaExpander + 'static,
    R: RepositoryProvisioner + 'static,
    P: PagePublisher + 'static,
{
    fn new(inner: Server<E, R, P>) -> Self {
        Self { inner }
    }
}

impl<E, R, P> ServerHandler for RmcpAdapter<E, R, P>
where
    E: IdeaExpander + 'static,
    R: RepositoryProvisioner + 'static,
    P: PagePublisher + 'static,
{
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: proto::SERVER_NAME.to_string(),
                title: Some(SERVER_TITLE.to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            ..ServerInfo::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let req = JsonRpcRequest {
            jsonrpc: Some("2.0".into()),
            id: Some(json!(0)),
            method: proto::METHOD_TOOLS_LIST.into(),
            params: None,
        };
        let resp = self.inner.handle_tools_list(req).await;
        json_rpc_result_to::<ListToolsResult>(resp)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let CallToolRequestParam { name, arguments } = request;
        let arguments_value = arguments
            .map(serde_json::Value::Object)
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));
        let params = proto::CallToolParams {
            tool_name: name.to_string(),
            arguments: arguments_value,
        };
        let params_value =
            serde_json::to_value(params).map_err(|e| mcp_internal_error(e.to_string()))?;
        let req = JsonRpcRequest {
            jsonrpc: Some("2.0".into()),
            id: Some(json!(0)),
            method: proto::METHOD_TOOLS_CALL.into(),
            params: Some(params_value),
        };
        let resp = self.inner.handle_tools_call(req).await;
        json_rpc_result_to::<CallToolResult>(resp)
    }
}

fn json_rpc_result_to<T>(resp: JsonRpcResponse) -> Result<T, McpError>
where
    T: DeserializeOwned,
{
    if let Some(err) = resp.error {
        return Err(jsonrpc_error_to_mcp(err));
    }
    let value = resp.result.unwrap_or(serde_json::Value::Null);
    serde_json::from_value(value).map_err(|e| mcp_internal_error(e.to_string()))
}

fn jsonrpc_error_to_mcp(err: JsonRpcError) -> McpError {
    McpError::new(ErrorCode(err.code as i32), err.message, err.data)
}

fn mcp_internal_error(message: impl Into<String>) -> McpError {
    let msg = message.into();
    McpError::new(
        ErrorCode::INTERNAL_ERROR,
        msg.clone(),
        Some(json!({ "code": "E_INTERNAL", "message": msg })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{healthy, FakeExpander, FakeProvisioner, FakePublisher};
    use projdev_core::{PageOutcome, NOT_CONFIGURED_MESSAGE};

    fn call_result_json(value: &serde_json::Value) -> serde_json::Value {
        if let Some(structured) = value.get("structuredContent") {
            return structured.clone();
        }
        if let Some(content) = value.get("content").and_then(|c| c.as_array()) {
            if let Some(entry) = content.first() {
                if let Some(text) = entry.get("text").and_then(|t| t.as_str()) {
                    return serde_json::from_str(text)
                        .unwrap_or_else(|_| serde_json::Value::String(text.to_string()));
                }
            }
        }
        serde_json::Value::Null
    }

    fn request(id: i64, method: &str, params: serde_json::Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: Some("2.0".into()),
            id: Some(json!(id)),
            method: method.into(),
            params: Some(params),
        }
    }

    #[test]
    fn normalize_tool_arguments_unwraps_input_json() {
        let args = json!({
            "type": "input_json",
            "json": { "idea": "x", "project_name": "y" }
        });
        let normalized = normalize_tool_arguments(args).expect("expected normalization");
        assert_eq!(normalized, json!({ "idea": "x", "project_name": "y" }));
    }

    #[test]
    fn normalize_tool_arguments_parses_json_strings() {
        let args = json!(r#"{"idea":"x","project_name":"y"}"#);
        let normalized = normalize_tool_arguments(args).expect("expected normalization");
        assert_eq!(normalized, json!({ "idea": "x", "project_name": "y" }));
        assert!(normalize_tool_arguments(json!("plain words")).is_err());
        assert!(normalize_tool_arguments(json!(42)).is_err());
    }

    #[tokio::test]
    async fn notification_request_produces_no_id() {
        let server = Server::new(healthy(PageOutcome::NotConfigured));
        let req = JsonRpcRequest {
            jsonrpc: Some("2.0".into()),
            id: None,
            method: proto::METHOD_TOOLS_LIST.to_string(),
            params: Some(json!({})),
        };
        let resp = server.handle_request(req).await;
        assert!(resp.id.is_none());
        assert!(resp.error.is_none());
    }

    #[tokio::test]
    async fn tools_list_exposes_both_tools() {
        let server = Server::new(healthy(PageOutcome::NotConfigured));
        let resp = server
            .handle_request(request(1, proto::METHOD_TOOLS_LIST, json!({})))
            .await;
        let result = resp.result.expect("tools list result");
        let names: Vec<&str> = result["tools"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|t| t["name"].as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                proto::TOOL_DEVELOP_AND_CREATE_PROJECT,
                proto::TOOL_CREATE_NOTION_PROJECT_PAGE
            ]
        );
        let schema = &result["tools"][0]["inputSchema"];
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["create_notion_page"].is_object());
    }

    #[tokio::test]
    async fn initialize_echoes_protocol_version() {
        let server = Server::new(healthy(PageOutcome::NotConfigured));
        let resp = server
            .handle_request(request(
                1,
                proto::METHOD_INITIALIZE,
                json!({"protocolVersion": "2025-03-26"}),
            ))
            .await;
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], "2025-03-26");
        assert_eq!(result["serverInfo"]["name"], proto::SERVER_NAME);
    }

    #[tokio::test]
    async fn tools_call_develop_returns_structured_report() {
        let server = Server::new(healthy(PageOutcome::NotConfigured));
        let resp = server
            .handle_request(request(
                7,
                proto::METHOD_TOOLS_CALL,
                json!({
                    "name": "develop_and_create_project",
                    "arguments": {"idea": "drink water", "project_name": "hydrate-bot"}
                }),
            ))
            .await;
        assert!(resp.error.is_none(), "unexpected error: {:?}", resp.error);
        assert_eq!(resp.id, Some(json!(7)));
        let payload = call_result_json(resp.result.as_ref().unwrap());
        assert_eq!(payload["github_url"], "https://github.com/octo/hydrate-bot");
        assert_eq!(payload["status"], "success");
        assert_eq!(payload["notion_url"], NOT_CONFIGURED_MESSAGE);
        assert_eq!(payload["notion"]["outcome"], "not_configured");
    }

    #[tokio::test]
    async fn develop_without_page_omits_notion_url() {
        let server = Server::new(healthy(PageOutcome::Created {
            url: "https://notion.so/p".into(),
        }));
        let resp = server
            .handle_request(request(
                1,
                proto::TOOL_DEVELOP_AND_CREATE_PROJECT,
                json!({"idea": "x", "project_name": "y", "create_notion_page": false}),
            ))
            .await;
        let result = resp.result.unwrap();
        assert!(result.get("notion_url").is_none());
        assert!(result.get("notion").is_none());
    }

    #[tokio::test]
    async fn failed_page_still_reports_success() {
        let server = Server::new(healthy(PageOutcome::Failed {
            status: Some(503),
            message: "unavailable".into(),
        }));
        let resp = server
            .handle_request(request(
                1,
                proto::TOOL_DEVELOP_AND_CREATE_PROJECT,
                json!({"idea": "x", "project_name": "y"}),
            ))
            .await;
        let result = resp.result.unwrap();
        assert_eq!(result["status"], "success");
        assert!(result["notion_url"].as_str().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn provisioning_error_maps_to_rpc_error() {
        let pipeline = Pipeline::new(
            FakeExpander {
                reply: Ok("spec".into()),
            },
            FakeProvisioner {
                fail_with: Some("github returned 422: name already exists".into()),
                ..FakeProvisioner::default()
            },
            FakePublisher::new(PageOutcome::NotConfigured),
        );
        let server = Server::new(pipeline);
        let resp = server
            .handle_request(request(
                3,
                proto::METHOD_TOOLS_CALL,
                json!({
                    "name": "develop_and_create_project",
                    "arguments": {"idea": "x", "project_name": "dup"}
                }),
            ))
            .await;
        assert!(resp.result.is_none());
        let err = resp.error.expect("error");
        assert_eq!(err.code, -32000);
        assert_eq!(err.message, "github returned 422: name already exists");
        assert_eq!(err.data, Some(json!({"code": "E_PROVISION"})));
    }

    #[tokio::test]
    async fn missing_arguments_are_invalid_params() {
        let server = Server::new(healthy(PageOutcome::NotConfigured));
        let resp = server
            .handle_request(request(
                1,
                proto::TOOL_DEVELOP_AND_CREATE_PROJECT,
                json!({"idea": "x"}),
            ))
            .await;
        let err = resp.error.expect("error");
        assert_eq!(err.code, -32602);

        let resp = server
            .handle_request(request(
                2,
                proto::TOOL_DEVELOP_AND_CREATE_PROJECT,
                json!({"idea": "", "project_name": "y"}),
            ))
            .await;
        let err = resp.error.expect("error");
        assert_eq!(err.code, -32602);
        assert_eq!(
            err.data,
            Some(json!({"code": "E_VALIDATION", "message": "idea must not be empty"}))
        );
    }

    #[tokio::test]
    async fn notion_page_tool_returns_legacy_string() {
        let server = Server::new(healthy(PageOutcome::NotConfigured));
        let resp = server
            .handle_request(request(
                1,
                proto::METHOD_TOOLS_CALL,
                json!({
                    "name": "create_notion_project_page",
                    "arguments": {
                        "idea": "x",
                        "project_name": "y",
                        "github_url": "https://github.com/octo/y"
                    }
                }),
            ))
            .await;
        let result = resp.result.unwrap();
        assert!(result.get("structuredContent").is_none());
        assert_eq!(result["content"][0]["text"], NOT_CONFIGURED_MESSAGE);
    }

    #[tokio::test]
    async fn unparsable_rpc_body_is_parse_error() {
        let server = Server::new(healthy(PageOutcome::NotConfigured));
        let resp = server.handle_rpc_body(b"{\"jsonrpc\": \"2.0\", ").await;
        assert!(resp.id.is_none());
        assert_eq!(resp.error.expect("error").code, -32700);
    }

    #[tokio::test]
    async fn rpc_body_without_method_is_invalid_request() {
        let server = Server::new(healthy(PageOutcome::NotConfigured));
        let resp = server.handle_rpc_body(br#"{"jsonrpc": "2.0", "id": 4}"#).await;
        assert_eq!(resp.id, Some(json!(4)));
        assert_eq!(resp.error.expect("error").code, -32600);

        let resp = server
            .handle_rpc_body(br#"{"jsonrpc": "2.0", "id": 5, "method": "tools/list"}"#)
            .await;
        assert!(resp.error.is_none());
        assert_eq!(resp.id, Some(json!(5)));
    }

    async fn serve_router() -> (String, CancellationToken) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let token = CancellationToken::new();
        let app =
            Server::new(healthy(PageOutcome::NotConfigured)).http_router(addr, token.clone());
        let shutdown = token.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
        });
        (format!("http://{addr}"), token)
    }

    #[tokio::test]
    async fn streamable_http_initialize_on_mcp_path() {
        let (base, token) = serve_router().await;
        let client = reqwest::Client::new();
        let mut resp = client
            .post(format!("{base}/mcp"))
            .header("accept", "application/json, text/event-stream")
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "initialize",
                "params": {
                    "protocolVersion": "2025-03-26",
                    "capabilities": {},
                    "clientInfo": {"name": "projdev-tests", "version": "0.0.0"}
                }
            }))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success(), "status: {}", resp.status());
        assert!(resp.headers().contains_key("mcp-session-id"));

        let mut body = String::new();
        let read = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while let Some(chunk) = resp.chunk().await.unwrap() {
                body.push_str(&String::from_utf8_lossy(&chunk));
                if body.contains("serverInfo") && body.contains("\"name\":\"projdev\"") {
                    break;
                }
            }
        })
        .await;
        assert!(read.is_ok(), "initialize response not received: {body}");
        assert!(body.contains("\"name\":\"projdev\""), "body: {body}");
        token.cancel();
    }

    #[tokio::test]
    async fn http_rpc_and_healthz_routes() {
        let (base, token) = serve_router().await;
        let client = reqwest::Client::new();

        let health: serde_json::Value = client
            .get(format!("{base}/healthz"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health, json!({"ok": true}));

        let resp = client
            .post(format!("{base}/rpc"))
            .header("content-type", "application/json")
            .body("not json")
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], -32700);
        assert_eq!(body["jsonrpc"], "2.0");
        token.cancel();
    }

    #[tokio::test]
    async fn unknown_tool_is_method_not_found() {
        let server = Server::new(healthy(PageOutcome::NotConfigured));
        let resp = server
            .handle_request(request(
                1,
                proto::METHOD_TOOLS_CALL,
                json!({"name": "delete_repository", "arguments": {}}),
            ))
            .await;
        assert_eq!(resp.error.unwrap().code, -32601);
        let resp = server
            .handle_request(request(2, "bogus/method", json!({})))
            .await;
        assert_eq!(resp.error.unwrap().code, -32601);
    }
}

mod jsonrpc;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::tools::ToolRegistry;
use jsonrpc::{INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR, Request, Response};

const PROTOCOL_VERSION: &str = "2025-06-18";

/// 在 stdin/stdout 上运行 JSON-RPC 2.0 循环
///
/// 每行一条消息；stdin EOF 时正常返回，由 main 负责收尾。
/// 日志走 stderr，stdout 只承载协议消息。
pub async fn serve_stdio(registry: &ToolRegistry) -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(stdin).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let Some(response) = handle_line(registry, &line).await else {
            continue;
        };
        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}

async fn handle_line(registry: &ToolRegistry, line: &str) -> Option<Response> {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "无法解析 JSON-RPC 请求");
            return Some(Response::err(PARSE_ERROR, "Parse error", Value::Null));
        }
    };
    dispatch(registry, request).await
}

async fn dispatch(registry: &ToolRegistry, request: Request) -> Option<Response> {
    let id = request.id;
    match request.method.as_str() {
        "initialize" => id.map(|id| Response::ok(initialize_result(), id)),
        "ping" => id.map(|id| Response::ok(json!({}), id)),
        "tools/list" => {
            id.map(|id| Response::ok(json!({ "tools": registry.definitions() }), id))
        }
        "tools/call" => {
            // tools/call 一定带 id，通知形式直接忽略
            let id = id?;
            Some(call_tool(registry, request.params, id).await)
        }
        method if method.starts_with("notifications/") => {
            debug!(method = %method, "忽略通知");
            None
        }
        method => {
            warn!(method = %method, "未知的 JSON-RPC 方法");
            id.map(|id| Response::err(METHOD_NOT_FOUND, "Method not found", id))
        }
    }
}

async fn call_tool(registry: &ToolRegistry, params: Value, id: Value) -> Response {
    let Some(name) = params.get("name").and_then(|v| v.as_str()) else {
        return Response::err(INVALID_PARAMS, "missing tool name", id);
    };
    let arguments = params
        .get("arguments")
        .cloned()
        .unwrap_or_else(|| json!({}));

    match registry.call(name, arguments).await {
        Some(outcome) => Response::ok(
            json!({
                "content": [{ "type": "text", "text": outcome.payload.to_string() }],
                "isError": outcome.is_error,
            }),
            id,
        ),
        None => Response::err(INVALID_PARAMS, format!("unknown tool: {}", name), id),
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": {
            "name": "mcp-server",
            "version": env!("CARGO_PKG_VERSION"),
        }
    })
}

use dotenvy::dotenv;
use std::sync::Arc;

mod config;
mod tools;
mod transport;

use crate::config::AppConfig;
use crate::tools::ToolRegistry;
use mcp_share::EmqxClient;

#[tokio::main]
async fn main() {
    dotenv().ok();
    // stdout 被 JSON-RPC 协议占用，日志一律走 stderr
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .with_writer(std::io::stderr)
        .init();

    // 配置缺失在这里直接终止进程，而不是等到第一次调用
    let cfg = AppConfig::load().expect("加载 EMQX 配置失败");

    // 创建发布网关（复用的 HTTP 客户端，进程生命周期内只构造一次）
    let emqx = Arc::new(
        EmqxClient::connect(cfg.emqx.clone().into_client_config()).expect("创建 EMQX 客户端失败"),
    );

    // 显式注册：构造网关，把注册表交给传输层
    let registry = ToolRegistry::new(emqx.clone());
    tracing::info!(endpoint = %cfg.emqx.api_endpoint, "MCP 服务器启动，等待 stdin 上的请求");

    if let Err(e) = transport::serve_stdio(&registry).await {
        tracing::error!(error = %e, "stdio 传输异常退出");
    }

    // stdin EOF 之后关闭网关，之后的调用会快速失败
    emqx.close();
    tracing::info!("MCP 服务器已退出");
}

use serde_json::{Value, json};
use thiserror::Error;

/// 发布操作的内部错误分类
///
/// 对外（工具调用方）统一折叠成 `{"error": "..."}` 信封，
/// 内部保留分类，方便日志和测试区分失败原因。
#[derive(Debug, Error)]
pub enum PublishError {
    /// 请求结构不合法，在任何网络请求之前被拒绝
    #[error("{0}")]
    Validation(String),
    /// HTTP 请求本身没有完成（超时、连接拒绝、DNS、TLS 等）
    #[error("Network error while publishing message: {0}")]
    Transport(String),
    /// broker 返回了非 2xx 状态码
    #[error("EMQX API Error: {status} - {body}")]
    Status { status: u16, body: String },
    /// broker 返回 2xx 但响应体不是合法 JSON
    #[error("Error processing response: {0}")]
    Decode(String),
    /// 客户端已经关闭，不再发起任何请求
    #[error("EMQX client is closed")]
    Closed,
    /// 其他意外错误
    #[error("Unexpected error while publishing message: {0}")]
    Unexpected(String),
}

/// 把发布结果折叠成工具边界的统一 JSON 形状
///
/// 成功时原样返回 broker 的响应体，失败时返回 `{"error": "..."}`。
/// 调用方只能通过消息文本区分校验失败和下游失败，这一点与线上行为保持一致。
pub fn error_envelope(err: &PublishError) -> Value {
    json!({ "error": err.to_string() })
}

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Value, json};
use tracing::{debug, error, info};

use crate::error::PublishError;
use crate::request::PublishRequest;

/// EMQX HTTP API 的连接配置
///
/// 进程启动时构造一次，之后只读；凭证轮换需要重启进程。
#[derive(Clone)]
pub struct EmqxConfig {
    pub api_endpoint: String,
    pub app_id: String,
    pub app_secret: String,
    pub timeout_secs: u64,
}

impl EmqxConfig {
    pub fn new(
        api_endpoint: impl Into<String>,
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
    ) -> Self {
        Self {
            api_endpoint: api_endpoint.into(),
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            timeout_secs: 60,
        }
    }
}

// app_secret 不能随 Debug 输出进日志
impl fmt::Debug for EmqxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmqxConfig")
            .field("api_endpoint", &self.api_endpoint)
            .field("app_id", &self.app_id)
            .field("app_secret", &"***")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// EMQX HTTP API 客户端（发布网关）
///
/// 内部持有一个复用的 `reqwest::Client`，超时在构造时配置一次，
/// 对客户端生命周期内的所有请求生效。多个 publish 调用可以并发
/// 使用同一个客户端，互相之间没有顺序保证。
pub struct EmqxClient {
    http: reqwest::Client,
    config: EmqxConfig,
    closed: AtomicBool,
}

impl EmqxClient {
    /// 创建客户端并初始化复用的 HTTP 连接池
    pub fn connect(config: EmqxConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("创建 HTTP 客户端失败: {}", e))?;
        Ok(Self {
            http,
            config,
            closed: AtomicBool::new(false),
        })
    }

    /// 构造 EMQX Cloud API 的 Basic 认证头
    pub(crate) fn auth_header(&self) -> String {
        let auth_string = format!("{}:{}", self.config.app_id, self.config.app_secret);
        format!("Basic {}", BASE64.encode(auth_string.as_bytes()))
    }

    /// 完整的发布管线：先校验，后发布
    ///
    /// 校验失败的请求不会发起任何网络请求，只记录一条诊断日志。
    pub async fn publish_validated(&self, request: &PublishRequest) -> Result<Value, PublishError> {
        if let Err(e) = request.validate() {
            error!(error = %e, "发布请求校验未通过");
            return Err(e);
        }
        self.publish(&request.topic, &request.payload, request.qos, request.retain)
            .await
    }

    /// 向 `{api_endpoint}/publish` 发起一次 HTTP POST
    ///
    /// 每次调用只尝试一次，不重试、不排队；重试策略由调用方协议层决定。
    /// payload 原文透传，不做重编码。
    pub async fn publish(
        &self,
        topic: &str,
        payload: &str,
        qos: u8,
        retain: bool,
    ) -> Result<Value, PublishError> {
        if self.closed.load(Ordering::SeqCst) {
            let err = PublishError::Closed;
            error!(topic = %topic, "客户端已关闭，拒绝发布");
            return Err(err);
        }

        let url = format!("{}/publish", self.config.api_endpoint);
        let body = json!({
            "topic": topic,
            "payload": payload,
            "qos": qos,
            "retain": retain,
        });
        // payload 内容只在 debug 级别出现
        debug!(topic = %topic, payload = %payload, "发布 MQTT 消息");

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.auth_header())
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let err = transport_error(e);
                error!(topic = %topic, error = %err, "发布请求未能完成");
                err
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            // 响应已到达但读取响应体中途失败，既不算传输失败也不算解码失败
            let err = PublishError::Unexpected(e.to_string());
            error!(topic = %topic, error = %err, "读取响应体失败");
            err
        })?;

        if status.is_success() {
            match serde_json::from_str::<Value>(&text) {
                Ok(json) => {
                    info!(topic = %topic, "消息发布成功");
                    Ok(json)
                }
                Err(e) => {
                    let err = PublishError::Decode(e.to_string());
                    error!(topic = %topic, error = %err, "解析 broker 响应失败");
                    Err(err)
                }
            }
        } else {
            let err = PublishError::Status {
                status: status.as_u16(),
                body: text,
            };
            error!(topic = %topic, status = %status, "EMQX API 返回错误");
            Err(err)
        }
    }

    /// 关闭客户端，之后的 publish 调用快速失败而不是挂起
    ///
    /// 正常在进程退出时调用一次；重复调用没有额外效果。
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        info!("EMQX 客户端已关闭");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// 把 reqwest 的失败归类成传输错误，超时单独注明
fn transport_error(e: reqwest::Error) -> PublishError {
    if e.is_timeout() {
        PublishError::Transport(format!("request timed out: {}", e))
    } else {
        PublishError::Transport(e.to_string())
    }
}

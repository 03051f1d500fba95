use std::sync::Arc;

use mcp_share::{EmqxClient, PublishRequest, error_envelope};
use serde_json::{Value, json};
use tracing::{error, info};

/// 单次工具调用的结果
///
/// `payload` 是返回给调用方的 JSON：成功时为 broker 的原始响应，
/// 失败时为 `{"error": "..."}` 信封，`is_error` 同步标记。
pub struct ToolOutcome {
    pub payload: Value,
    pub is_error: bool,
}

/// 工具注册表：显式持有发布网关，由传输层按名称分发调用
///
/// 注册就是「构造网关、把注册表交给传输层」，没有全局状态。
pub struct ToolRegistry {
    emqx: Arc<EmqxClient>,
}

impl ToolRegistry {
    pub fn new(emqx: Arc<EmqxClient>) -> Self {
        Self { emqx }
    }

    /// tools/list 暴露的工具定义
    pub fn definitions(&self) -> Value {
        json!([{
            "name": "publish_mqtt_message",
            "description": "Publish an MQTT message to the configured EMQX broker over its HTTP API. \
                The payload must be a valid JSON string and is forwarded verbatim; \
                qos is the MQTT Quality of Service level (0, 1 or 2); \
                retain asks the broker to store the last message on the topic for future subscribers.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "topic": {
                        "type": "string",
                        "description": "The MQTT topic to publish to"
                    },
                    "payload": {
                        "type": "string",
                        "description": "The JSON message content to publish"
                    },
                    "qos": {
                        "type": "integer",
                        "enum": [0, 1, 2],
                        "description": "Quality of Service level (0, 1, or 2)"
                    },
                    "retain": {
                        "type": "boolean",
                        "description": "Whether to retain the message"
                    }
                },
                "required": ["topic", "payload"]
            }
        }])
    }

    /// 按名称分发工具调用；未知工具返回 None
    pub async fn call(&self, name: &str, arguments: Value) -> Option<ToolOutcome> {
        match name {
            "publish_mqtt_message" => Some(self.publish_mqtt_message(arguments).await),
            _ => None,
        }
    }

    async fn publish_mqtt_message(&self, arguments: Value) -> ToolOutcome {
        info!("处理 publish_mqtt_message 调用");

        // 参数形状不对（缺字段、retain 非布尔等）视作校验失败，
        // 和下游失败共用同一个信封形状
        let request: PublishRequest = match serde_json::from_value(arguments) {
            Ok(request) => request,
            Err(e) => {
                let message = format!("Invalid publish request: {}", e);
                error!(error = %e, "请求参数解析失败");
                return ToolOutcome {
                    payload: json!({ "error": message }),
                    is_error: true,
                };
            }
        };

        match self.emqx.publish_validated(&request).await {
            Ok(body) => {
                info!(topic = %request.topic, "publish_mqtt_message 调用完成");
                ToolOutcome {
                    payload: body,
                    is_error: false,
                }
            }
            Err(e) => {
                error!(topic = %request.topic, error = %e, "publish_mqtt_message 调用失败");
                ToolOutcome {
                    payload: error_envelope(&e),
                    is_error: true,
                }
            }
        }
    }
}

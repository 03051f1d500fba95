use serde::Deserialize;

use crate::error::PublishError;

/// MQTT 消息发布请求（由工具调用方提供）
///
/// `qos` 和 `retain` 省略时取默认值（0 / false）。
/// `retain` 的布尔类型由反序列化本身保证，非布尔值在边界处直接失败。
#[derive(Debug, Clone, Deserialize)]
pub struct PublishRequest {
    pub topic: String,
    pub payload: String,
    #[serde(default)]
    pub qos: u8,
    #[serde(default)]
    pub retain: bool,
}

impl PublishRequest {
    /// 在任何网络请求之前校验请求结构
    ///
    /// 校验不通过的请求不会被转发给发布网关。
    /// payload 只要求是合法 JSON 文本，内容和 schema 不在这里约束。
    pub fn validate(&self) -> Result<(), PublishError> {
        if self.topic.is_empty() {
            return Err(PublishError::Validation(
                "Missing required parameter: topic".to_string(),
            ));
        }
        if serde_json::from_str::<serde_json::Value>(&self.payload).is_err() {
            return Err(PublishError::Validation(
                "payload must be a valid JSON string".to_string(),
            ));
        }
        if self.qos > 2 {
            return Err(PublishError::Validation(format!(
                "qos must be 0, 1 or 2, got {}",
                self.qos
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(topic: &str, payload: &str, qos: u8) -> PublishRequest {
        PublishRequest {
            topic: topic.to_string(),
            payload: payload.to_string(),
            qos,
            retain: false,
        }
    }

    #[test]
    fn empty_topic_is_rejected() {
        let err = request("", "{}", 0).validate().unwrap_err();
        assert!(err.to_string().contains("topic"));
    }

    #[test]
    fn non_json_payload_is_rejected() {
        let err = request("t/1", "not json", 0).validate().unwrap_err();
        assert!(err.to_string().contains("valid JSON"));
    }

    #[test]
    fn qos_out_of_range_is_rejected() {
        let err = request("t/1", "{}", 3).validate().unwrap_err();
        assert!(err.to_string().contains("qos"));
        assert!(request("t/1", "{}", 2).validate().is_ok());
    }

    #[test]
    fn payload_content_is_not_constrained() {
        // 标量、数组、对象都算合法 JSON，schema 是外部的事
        assert!(request("t/1", "\"on\"", 0).validate().is_ok());
        assert!(request("t/1", "[1,2,3]", 1).validate().is_ok());
        assert!(request("t/1", "{\"command\":\"on\"}", 0).validate().is_ok());
    }

    #[test]
    fn defaults_apply_when_fields_omitted() {
        let request: PublishRequest =
            serde_json::from_value(json!({"topic": "t/1", "payload": "{}"})).unwrap();
        assert_eq!(request.qos, 0);
        assert!(!request.retain);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn non_boolean_retain_fails_deserialization() {
        let result: Result<PublishRequest, _> =
            serde_json::from_value(json!({"topic": "t/1", "payload": "{}", "retain": "yes"}));
        assert!(result.is_err());
    }

    #[test]
    fn missing_payload_fails_deserialization() {
        let result: Result<PublishRequest, _> =
            serde_json::from_value(json!({"topic": "t/1"}));
        assert!(result.is_err());
    }
}

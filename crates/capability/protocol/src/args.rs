//! invoke 参数解析辅助

use crate::error::ProtocolError;
use serde_json::Value;

/// 将参数转换为待发送字节
///
/// - 字符串：UTF-8 字节
/// - 数组：逐个元素视为 0-255 的字节
/// - 其他：序列化为 JSON 文本
pub fn payload_bytes(value: &Value) -> Result<Vec<u8>, ProtocolError> {
    match value {
        Value::String(text) => Ok(text.as_bytes().to_vec()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .filter(|byte| *byte <= u8::MAX as u64)
                    .map(|byte| byte as u8)
                    .ok_or_else(|| ProtocolError::InvalidArgs(format!("invalid byte: {item}")))
            })
            .collect(),
        Value::Null => Err(ProtocolError::InvalidArgs("payload required".to_string())),
        other => Ok(other.to_string().into_bytes()),
    }
}

/// 取第一个参数作为负载
pub fn first_payload(args: &[Value]) -> Result<Vec<u8>, ProtocolError> {
    let value = args
        .first()
        .ok_or_else(|| ProtocolError::InvalidArgs("payload required".to_string()))?;
    payload_bytes(value)
}

/// 必填字符串参数
pub fn required_str<'a>(args: &'a [Value], index: usize, name: &str) -> Result<&'a str, ProtocolError> {
    args.get(index)
        .and_then(|value| value.as_str())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ProtocolError::InvalidArgs(format!("{name} required")))
}

/// 可选无符号整数参数
pub fn optional_u64(args: &[Value], index: usize) -> Option<u64> {
    args.get(index).and_then(|value| value.as_u64())
}

/// 接收到的字节转为返回值：UTF-8 时为字符串，否则为字节数组
pub fn bytes_to_value(bytes: &[u8]) -> Value {
    match std::str::from_utf8(bytes) {
        Ok(text) => Value::String(text.to_string()),
        Err(_) => Value::Array(bytes.iter().map(|byte| Value::from(*byte)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_bytes() {
        assert_eq!(payload_bytes(&json!("hi")).unwrap(), b"hi".to_vec());
        assert_eq!(payload_bytes(&json!([1, 2, 255])).unwrap(), vec![1, 2, 255]);
        assert_eq!(payload_bytes(&json!({"a": 1})).unwrap(), br#"{"a":1}"#.to_vec());
        assert!(payload_bytes(&json!([256])).is_err());
        assert!(payload_bytes(&Value::Null).is_err());
    }

    #[test]
    fn test_bytes_to_value() {
        assert_eq!(bytes_to_value(b"ok"), json!("ok"));
        assert_eq!(bytes_to_value(&[0xff, 0x00]), json!([255, 0]));
    }

    #[test]
    fn test_required_str() {
        let args = vec![json!("topic/a"), json!(1)];
        assert_eq!(required_str(&args, 0, "topic").unwrap(), "topic/a");
        assert!(required_str(&args, 1, "payload").is_err());
        assert_eq!(optional_u64(&args, 1), Some(1));
    }
}

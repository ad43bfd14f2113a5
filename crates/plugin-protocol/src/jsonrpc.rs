//! JSON-RPC 2.0 envelope for the persistent-socket transport.
//!
//! Each WebSocket text frame carries exactly one message.  Methods are named
//! `"<ServiceName>.<MethodName>"`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::fault::{Fault, FaultCode};

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
/// Implementation-defined: the plugin is shutting down.
pub const UNAVAILABLE: i64 = -32000;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Requests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A request, or a notification when `id` is absent.
///
/// An explicit `"id": null` is still a request and gets a reply, so `id`
/// records whether the key was present rather than whether it was null.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(
        default,
        deserialize_with = "present_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id: Some(Value::from(id)),
            method: method.into(),
            params,
        }
    }

    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id: None,
            method: method.into(),
            params,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Split `"Service.Method"` at the last dot.
    pub fn service_and_method(&self) -> Option<(&str, &str)> {
        split_method(&self.method)
    }
}

fn present_id<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

pub fn split_method(method: &str) -> Option<(&str, &str)> {
    method
        .rsplit_once('.')
        .filter(|(service, name)| !service.is_empty() && !name.is_empty())
}

pub fn join_method(service: &str, method: &str) -> String {
    format!("{service}.{method}")
}

/// Why an inbound frame could not be treated as a request.  Carries the id
/// when one could be recovered so the error reply can be correlated.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeError {
    pub id: Value,
    pub error: JsonRpcError,
}

/// Parse one inbound text frame.
pub fn parse_request(text: &str) -> Result<JsonRpcRequest, EnvelopeError> {
    let value: Value = serde_json::from_str(text).map_err(|e| EnvelopeError {
        id: Value::Null,
        error: JsonRpcError::new(PARSE_ERROR, format!("parse error: {e}")),
    })?;

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let invalid = |message: &str| EnvelopeError {
        id: id.clone(),
        error: JsonRpcError::new(INVALID_REQUEST, message),
    };

    if value.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(invalid("invalid request: jsonrpc must be \"2.0\""));
    }
    if !value.get("method").is_some_and(Value::is_string) {
        return Err(invalid("invalid request: method must be a string"));
    }
    serde_json::from_value(value).map_err(|e| invalid(&format!("invalid request: {e}")))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Responses
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        if let Some(err) = self.error {
            Err(err)
        } else {
            Ok(self.result.unwrap_or(Value::Null))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcError {}

impl From<Fault> for JsonRpcError {
    fn from(fault: Fault) -> Self {
        let code = match fault.code {
            FaultCode::UnknownService | FaultCode::UnknownMethod => METHOD_NOT_FOUND,
            FaultCode::InvalidParams => INVALID_PARAMS,
            FaultCode::Unavailable => UNAVAILABLE,
            FaultCode::Internal => INTERNAL_ERROR,
        };
        JsonRpcError::new(code, fault.message)
    }
}

impl From<JsonRpcError> for Fault {
    fn from(err: JsonRpcError) -> Self {
        let code = match err.code {
            METHOD_NOT_FOUND => FaultCode::UnknownMethod,
            INVALID_PARAMS => FaultCode::InvalidParams,
            UNAVAILABLE => FaultCode::Unavailable,
            _ => FaultCode::Internal,
        };
        Fault::new(code, err.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_without_id_is_notification() {
        let req = parse_request(r#"{"jsonrpc":"2.0","method":"command.Ping"}"#).unwrap();
        assert!(req.is_notification());
        assert_eq!(req.service_and_method(), Some(("command", "Ping")));
    }

    #[test]
    fn explicit_null_id_is_a_request() {
        let req = parse_request(
            r#"{"jsonrpc":"2.0","id":null,"method":"Health.Check","params":{"service":""}}"#,
        )
        .unwrap();
        assert!(!req.is_notification());
        assert_eq!(req.id, Some(Value::Null));

        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["id"], Value::Null);
        assert!(v.as_object().unwrap().contains_key("id"));
    }

    #[test]
    fn string_ids_are_preserved() {
        let req = parse_request(r#"{"jsonrpc":"2.0","id":"abc","method":"a.B","params":[1]}"#)
            .unwrap();
        assert_eq!(req.id, Some(json!("abc")));
        assert_eq!(req.params, Some(json!([1])));
    }

    #[test]
    fn garbage_is_parse_error_with_null_id() {
        let err = parse_request("{not json").unwrap_err();
        assert_eq!(err.id, Value::Null);
        assert_eq!(err.error.code, PARSE_ERROR);
    }

    #[test]
    fn wrong_version_is_invalid_request_with_id() {
        let err = parse_request(r#"{"jsonrpc":"1.0","id":7,"method":"a.B"}"#).unwrap_err();
        assert_eq!(err.id, json!(7));
        assert_eq!(err.error.code, INVALID_REQUEST);
    }

    #[test]
    fn missing_method_is_invalid_request() {
        let err = parse_request(r#"{"jsonrpc":"2.0","id":1}"#).unwrap_err();
        assert_eq!(err.error.code, INVALID_REQUEST);
    }

    #[test]
    fn split_method_rejects_undotted_names() {
        assert_eq!(split_method("Ping"), None);
        assert_eq!(split_method(".Ping"), None);
        assert_eq!(split_method("a.b.Check"), Some(("a.b", "Check")));
    }

    #[test]
    fn success_response_serializes_without_error() {
        let resp = JsonRpcResponse::success(json!(1), json!("pong"));
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v, json!({"jsonrpc": "2.0", "id": 1, "result": "pong"}));
        assert!(!resp.is_error());
        assert_eq!(resp.into_result().unwrap(), json!("pong"));
    }

    #[test]
    fn failure_response_is_error() {
        let resp = JsonRpcResponse::failure(Value::Null, JsonRpcError::new(INTERNAL_ERROR, "boom"));
        assert!(resp.is_error());
        assert_eq!(resp.into_result().unwrap_err().code, INTERNAL_ERROR);
    }

    #[test]
    fn fault_maps_to_method_not_found() {
        let err: JsonRpcError = Fault::new(FaultCode::UnknownService, "no such service").into();
        assert_eq!(err.code, METHOD_NOT_FOUND);
    }
}

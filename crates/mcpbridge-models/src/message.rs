//! Inbound JSON-RPC messages.
//!
//! Every line read from the local transport becomes a [`JsonRpcMessage`]:
//! the original JSON object plus its [`MessageKind`]. The object is kept
//! whole so fields the bridge does not know about reach the remote
//! untouched.

use serde_json::{Map, Value};

use crate::error::MessageError;
use crate::id::RequestId;
use crate::JSONRPC_VERSION;

// ---------------------------------------------------------------------------
// MessageKind
// ---------------------------------------------------------------------------

/// Classification of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum MessageKind {
    /// Has `method` and `id`; expects exactly one response.
    Request,
    /// Has `method` but no `id`; never answered.
    Notification,
    /// Has `id` and `result` or `error`; an answer to a server-initiated request.
    Response,
}

// ---------------------------------------------------------------------------
// JsonRpcMessage
// ---------------------------------------------------------------------------

/// A structurally valid JSON-RPC 2.0 message.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcMessage {
    kind: MessageKind,
    id: Option<RequestId>,
    body: Map<String, Value>,
}

impl JsonRpcMessage {
    /// Parse and validate one line of input.
    ///
    /// # Examples
    ///
    /// ```
    /// use mcpbridge_models::{JsonRpcMessage, MessageKind};
    ///
    /// let msg = JsonRpcMessage::parse(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
    /// assert_eq!(msg.kind(), MessageKind::Request);
    /// assert_eq!(msg.method(), Some("ping"));
    /// ```
    pub fn parse(line: &str) -> Result<Self, MessageError> {
        let value: Value =
            serde_json::from_str(line).map_err(|e| MessageError::Parse(e.to_string()))?;
        Self::from_value(value)
    }

    /// Validate an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, MessageError> {
        let Value::Object(body) = value else {
            return Err(MessageError::invalid("message must be a JSON object"));
        };

        if body.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(MessageError::invalid("jsonrpc must be \"2.0\""));
        }

        let id = match body.get("id") {
            Some(raw) => RequestId::from_value(raw)?,
            None => None,
        };

        let kind = match body.get("method") {
            Some(Value::String(_)) if body.contains_key("id") => MessageKind::Request,
            Some(Value::String(_)) => MessageKind::Notification,
            Some(_) => return Err(MessageError::invalid("method must be a string")),
            None => {
                let has_outcome = body.contains_key("result") || body.contains_key("error");
                if !body.contains_key("id") || !has_outcome {
                    return Err(MessageError::invalid(
                        "message must have a method, or an id with a result or error",
                    ));
                }
                MessageKind::Response
            }
        };

        Ok(Self { kind, id, body })
    }

    /// Request, notification or response.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// The message id, `None` when absent or `null`.
    pub fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }

    /// The method name for requests and notifications.
    pub fn method(&self) -> Option<&str> {
        self.body.get("method").and_then(Value::as_str)
    }

    /// The body to send upstream.
    ///
    /// A message with a `method` always carries `params`; an empty object is
    /// inserted when the caller omitted it, since some servers reject
    /// requests without one.
    pub fn normalized(&self) -> Value {
        let mut body = self.body.clone();
        if body.contains_key("method") && !body.contains_key("params") {
            body.insert("params".to_string(), Value::Object(Map::new()));
        }
        Value::Object(body)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<JsonRpcMessage, MessageError> {
        JsonRpcMessage::parse(&value.to_string())
    }

    #[test]
    fn classifies_request() {
        let msg = parse(json!({"jsonrpc":"2.0","id":1,"method":"tools/list","params":{}})).unwrap();
        assert_eq!(msg.kind(), MessageKind::Request);
        assert_eq!(msg.id(), Some(&RequestId::from(1)));
        assert_eq!(msg.method(), Some("tools/list"));
    }

    #[test]
    fn classifies_notification() {
        let msg = parse(json!({"jsonrpc":"2.0","method":"notifications/initialized"})).unwrap();
        assert_eq!(msg.kind(), MessageKind::Notification);
        assert_eq!(msg.id(), None);
    }

    #[test]
    fn classifies_response() {
        let msg = parse(json!({"jsonrpc":"2.0","id":"srv-1","result":{}})).unwrap();
        assert_eq!(msg.kind(), MessageKind::Response);
        assert_eq!(msg.id(), Some(&RequestId::from("srv-1")));

        let msg = parse(json!({"jsonrpc":"2.0","id":3,"error":{"code":1,"message":"x"}})).unwrap();
        assert_eq!(msg.kind(), MessageKind::Response);
    }

    #[test]
    fn null_id_request_is_still_a_request() {
        let msg = parse(json!({"jsonrpc":"2.0","id":null,"method":"ping"})).unwrap();
        assert_eq!(msg.kind(), MessageKind::Request);
        assert_eq!(msg.id(), None);
    }

    #[test]
    fn rejects_bad_json() {
        let err = JsonRpcMessage::parse("{not json").unwrap_err();
        assert!(matches!(err, MessageError::Parse(_)));
    }

    #[test]
    fn rejects_wrong_version() {
        let err = parse(json!({"jsonrpc":"1.0","id":1,"method":"ping"})).unwrap_err();
        assert!(matches!(err, MessageError::InvalidRequest { .. }));
        let err = parse(json!({"id":1,"method":"ping"})).unwrap_err();
        assert!(matches!(err, MessageError::InvalidRequest { .. }));
    }

    #[test]
    fn rejects_non_string_method() {
        let err = parse(json!({"jsonrpc":"2.0","id":1,"method":5})).unwrap_err();
        assert!(matches!(err, MessageError::InvalidRequest { .. }));
    }

    #[test]
    fn rejects_non_objects() {
        assert!(parse(json!([1, 2])).is_err());
        assert!(parse(json!("hello")).is_err());
    }

    #[test]
    fn rejects_response_without_outcome() {
        let err = parse(json!({"jsonrpc":"2.0","id":1})).unwrap_err();
        assert!(matches!(err, MessageError::InvalidRequest { .. }));
    }

    #[test]
    fn rejects_object_id() {
        let err = parse(json!({"jsonrpc":"2.0","id":{"x":1},"method":"ping"})).unwrap_err();
        assert!(matches!(err, MessageError::InvalidRequest { .. }));
    }

    #[test]
    fn normalized_adds_missing_params() {
        let msg = parse(json!({"jsonrpc":"2.0","id":1,"method":"ping"})).unwrap();
        assert_eq!(
            msg.normalized(),
            json!({"jsonrpc":"2.0","id":1,"method":"ping","params":{}})
        );
    }

    #[test]
    fn normalized_keeps_existing_params_and_extra_fields() {
        let original = json!({
            "jsonrpc": "2.0",
            "id": "a",
            "method": "tools/call",
            "params": {"name": "x"},
            "_meta": 1,
        });
        let msg = parse(original.clone()).unwrap();
        assert_eq!(msg.normalized(), original);
    }

    #[test]
    fn normalized_leaves_responses_alone() {
        let original = json!({"jsonrpc":"2.0","id":1,"result":{}});
        let msg = parse(original.clone()).unwrap();
        assert_eq!(msg.normalized(), original);
    }
}

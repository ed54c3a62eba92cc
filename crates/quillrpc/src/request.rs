use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC 2.0 request envelope.
///
/// <http://www.jsonrpc.org/specification#request_object>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// MUST be exactly "2.0". Anything else is rejected as InvalidRequest,
    /// but the envelope still parses so the id can be echoed back.
    #[serde(rename = "jsonrpc", default)]
    pub version: String,

    /// Identifier established by the client: string, number or null.
    /// An absent id marks the request as a notification; an explicit JSON
    /// `null` does not (it decodes to `Some(Value::Null)`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    /// Name of the method to be invoked, optionally `namespace.method`.
    #[serde(default)]
    pub method: String,

    /// Structured value holding the parameter values; may be omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            version: crate::VERSION.to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// Request without an id: side-effecting but non-responding.
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            version: crate::VERSION.to_string(),
            id: None,
            method: method.into(),
            params,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_id_is_notification() {
        let req: Request =
            serde_json::from_str(r#"{"jsonrpc": "2.0", "method": "arith.pi"}"#).unwrap();
        assert!(req.is_notification());
    }

    #[test]
    fn null_id_is_not_notification() {
        let req: Request =
            serde_json::from_str(r#"{"jsonrpc": "2.0", "method": "arith.pi", "id": null}"#)
                .unwrap();
        assert!(!req.is_notification());
        assert_eq!(req.id, Some(Value::Null));
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let req: Request = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert_eq!(req.version, "");
        assert_eq!(req.method, "");
        assert!(req.params.is_none());
    }

    #[test]
    fn non_string_method_fails_to_parse() {
        assert!(serde_json::from_str::<Request>(r#"{"jsonrpc": "2.0", "method": 1}"#).is_err());
    }

    #[test]
    fn id_round_trip() {
        for id in [json!(0), json!("1"), json!(2.5)] {
            let req = Request::new(id.clone(), "arith.divide", Some(json!({"a": 1, "b": 2})));
            let text = serde_json::to_string(&req).unwrap();
            let back: Request = serde_json::from_str(&text).unwrap();
            assert_eq!(back.id, Some(id));
        }
    }
}

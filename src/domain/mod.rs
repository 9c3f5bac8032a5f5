use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Header name to every value received for it, in arrival order.
pub type HeaderMultiMap = BTreeMap<String, Vec<String>>;

/// Query key to every value received for it, in arrival order.
pub type QueryMultiMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub event_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub endpoint_id: Uuid,
    pub received_at: DateTime<Utc>,
    pub method: String,
    pub headers: HeaderMultiMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query_params: QueryMultiMap,
    pub body: Map<String, Value>,
    pub replay_count: u64,
}

/// A captured request before the store assigns it an id and timestamp.
#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    pub method: String,
    pub headers: HeaderMultiMap,
    pub query_params: QueryMultiMap,
    pub body: Map<String, Value>,
}

/// Outcome of a single replay attempt.
///
/// `success` means the target answered, whatever the status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replayed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReplayResult {
    pub fn delivered(replayed_at: DateTime<Utc>, response_code: u16) -> Self {
        Self {
            success: true,
            replayed_at: Some(replayed_at),
            response_code: Some(response_code),
            error: None,
        }
    }

    pub fn failed(replayed_at: Option<DateTime<Utc>>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            replayed_at,
            response_code: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateEndpointRequest {
    pub name: String,
    #[serde(default)]
    pub ttl_seconds: Option<i64>,
}

/// Endpoint as returned over HTTP, with the public capture URL attached.
#[derive(Debug, Serialize)]
pub struct EndpointResponse {
    #[serde(flatten)]
    pub endpoint: Endpoint,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplayRequest {
    #[serde(default)]
    pub target_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CaptureResponse {
    pub status: &'static str,
}

/// Normalizes an inbound payload into a JSON object.
///
/// An empty payload becomes `{}`. Anything that is not a JSON object is kept
/// verbatim under `"raw"`; an unparsable body is data, not an error.
pub fn parse_body(bytes: &[u8]) -> Map<String, Value> {
    if bytes.is_empty() {
        return Map::new();
    }

    match serde_json::from_slice::<Map<String, Value>>(bytes) {
        Ok(object) => object,
        Err(_) => {
            let mut wrapped = Map::new();
            wrapped.insert(
                "raw".to_owned(),
                Value::String(String::from_utf8_lossy(bytes).into_owned()),
            );
            wrapped
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_object_body_is_kept() {
        let body = parse_body(br#"{"amount":42,"nested":{"ok":true}}"#);
        assert_eq!(Value::Object(body), json!({"amount": 42, "nested": {"ok": true}}));
    }

    #[test]
    fn invalid_json_is_wrapped_as_raw() {
        let body = parse_body(b"not json");
        assert_eq!(Value::Object(body), json!({"raw": "not json"}));
    }

    #[test]
    fn non_object_json_is_wrapped_as_raw() {
        let body = parse_body(b"[1,2,3]");
        assert_eq!(Value::Object(body), json!({"raw": "[1,2,3]"}));
    }

    #[test]
    fn empty_body_is_empty_object() {
        assert!(parse_body(b"").is_empty());
    }

    #[test]
    fn failed_replay_omits_response_code() {
        let value = serde_json::to_value(ReplayResult::failed(None, "boom")).unwrap();
        assert_eq!(value, json!({"success": false, "error": "boom"}));
    }
}

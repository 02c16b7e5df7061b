//! JSON-RPC envelopes.

use serde::{Deserialize, Serialize};

/// Outgoing call. The node expects positional params and a fixed id.
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub method: &'a str,
    pub params: Vec<serde_json::Value>,
    pub id: u64,
}

impl<'a> RpcRequest<'a> {
    pub fn new(method: &'a str, params: Vec<serde_json::Value>) -> Self {
        Self {
            method,
            params,
            id: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<RpcResponseError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcResponseError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_shape() {
        let req = RpcRequest::new("flip_get", vec![json!("0xabc")]);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"method": "flip_get", "params": ["0xabc"], "id": 1})
        );
    }

    #[test]
    fn parses_result_and_error() {
        let ok: RpcResponse = serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":[1]}"#).unwrap();
        assert_eq!(ok.result, Some(json!([1])));
        assert!(ok.error.is_none());

        let err: RpcResponse =
            serde_json::from_str(r#"{"id":1,"error":{"code":-32000,"message":"boom"}}"#).unwrap();
        assert!(err.result.is_none());
        let err = err.error.unwrap();
        assert_eq!(err.code, -32000);
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn null_result_reads_as_none() {
        let resp: RpcResponse = serde_json::from_str(r#"{"id":1,"result":null}"#).unwrap();
        assert!(resp.result.is_none());
    }
}

//! HTTP implementation of [`RemoteNode`].

use std::time::Duration;

use async_trait::async_trait;
use ceremony_types::{
    CeremonyIntervals, EpochInfo, FlipHash, FlipHashEntry, FlipPayload, SessionType,
    SubmitAnswersRequest,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, trace};

use crate::{RemoteNode, RpcError, RpcRequest, RpcResponse};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// JSON-RPC client for a node reachable over HTTP.
#[derive(Clone)]
pub struct HttpRemoteNode {
    http: reqwest::Client,
    url: String,
}

impl HttpRemoteNode {
    /// Create a client for `url` (e.g. `http://127.0.0.1:9009`).
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| RpcError::Client(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one call and return its `result`, if the node produced one.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<Option<T>, RpcError> {
        trace!(method, "rpc call");
        let response = self
            .http
            .post(&self.url)
            .json(&RpcRequest::new(method, params))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RpcError::Status(response.status().as_u16()));
        }

        let body: RpcResponse = response.json().await?;
        if let Some(err) = body.error {
            debug!(method, code = err.code, message = %err.message, "node returned error");
            return Err(RpcError::Node {
                code: err.code,
                message: err.message,
            });
        }

        body.result
            .map(|value| serde_json::from_value(value).map_err(|e| RpcError::Decode(e.to_string())))
            .transpose()
    }

    async fn call_required<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<T, RpcError> {
        self.call(method, params)
            .await?
            .ok_or_else(|| RpcError::MissingResult(method.to_string()))
    }
}

pub(crate) fn hashes_method(session_type: SessionType) -> String {
    format!("flip_{}Hashes", session_type.as_str())
}

pub(crate) fn submit_method(session_type: SessionType) -> &'static str {
    match session_type {
        SessionType::Short => "flip_submitShortAnswers",
        SessionType::Long => "flip_submitLongAnswers",
    }
}

#[async_trait]
impl RemoteNode for HttpRemoteNode {
    async fn epoch(&self) -> Result<EpochInfo, RpcError> {
        self.call_required("dna_epoch", vec![]).await
    }

    async fn ceremony_intervals(&self) -> Result<CeremonyIntervals, RpcError> {
        self.call_required("dna_ceremonyIntervals", vec![]).await
    }

    async fn flip_hashes(
        &self,
        session_type: SessionType,
    ) -> Result<Option<Vec<FlipHashEntry>>, RpcError> {
        self.call(&hashes_method(session_type), vec![]).await
    }

    async fn flip(&self, hash: &FlipHash) -> Result<FlipPayload, RpcError> {
        Ok(self
            .call("flip_get", vec![json!(hash)])
            .await?
            .unwrap_or_default())
    }

    async fn submit_answers(
        &self,
        session_type: SessionType,
        request: &SubmitAnswersRequest,
    ) -> Result<serde_json::Value, RpcError> {
        let params = serde_json::to_value(request).map_err(|e| RpcError::Decode(e.to_string()))?;
        Ok(self
            .call(submit_method(session_type), vec![params])
            .await?
            .unwrap_or(serde_json::Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ceremony_types::{AnswerPayload, AnswerType};

    #[test]
    fn method_names() {
        assert_eq!(hashes_method(SessionType::Short), "flip_shortHashes");
        assert_eq!(hashes_method(SessionType::Long), "flip_longHashes");
        assert_eq!(submit_method(SessionType::Short), "flip_submitShortAnswers");
        assert_eq!(submit_method(SessionType::Long), "flip_submitLongAnswers");
    }

    #[test]
    fn submit_params_are_one_object() {
        let request = SubmitAnswersRequest {
            answers: vec![AnswerPayload {
                hash: FlipHash::new("0x1"),
                answer: AnswerType::Inappropriate,
                easy: false,
            }],
            nonce: 0,
            epoch: 0,
        };
        let req = RpcRequest::new(
            submit_method(SessionType::Short),
            vec![serde_json::to_value(&request).unwrap()],
        );
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "method": "flip_submitShortAnswers",
                "params": [{
                    "answers": [{"hash": "0x1", "answer": 3, "easy": false}],
                    "nonce": 0,
                    "epoch": 0
                }],
                "id": 1
            })
        );
    }

    #[test]
    fn hash_list_parses() {
        let resp: RpcResponse = serde_json::from_str(
            r#"{"result":[{"hash":"0xa","extra":false,"ready":true},{"hash":"0xb","extra":true,"ready":false}]}"#,
        )
        .unwrap();
        let hashes: Vec<FlipHashEntry> = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(hashes.len(), 2);
        assert!(hashes[0].ready && !hashes[0].extra);
        assert!(hashes[1].extra && !hashes[1].ready);
    }

    #[test]
    fn client_builds() {
        let node = HttpRemoteNode::new("http://127.0.0.1:9009", Duration::from_secs(3)).unwrap();
        assert_eq!(node.url(), "http://127.0.0.1:9009");
    }
}

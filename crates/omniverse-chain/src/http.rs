//! JSON-over-HTTP transport to a node gateway

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::ChainError;
use crate::ledger::{InclusionResult, LedgerCall, LedgerClient};

/// Posts every [`LedgerCall`] to `{node}/query` or `{node}/submit`
pub struct HttpLedgerClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpLedgerClient {
    pub fn new(endpoint: &str) -> Self {
        HttpLedgerClient {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, call: &LedgerCall) -> Result<T, ChainError> {
        let url = self.url(path);
        debug!("POST {} {}.{}", url, call.module, call.method);

        let response = self.client.post(&url).json(call).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChainError::Network(format!("{} returned {}: {}", url, status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| ChainError::UnexpectedResponse(format!("{}: {}", url, e)))
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn query(&self, call: LedgerCall) -> Result<Value, ChainError> {
        self.post("query", &call).await
    }

    async fn submit(&self, call: LedgerCall) -> Result<InclusionResult, ChainError> {
        self.post("submit", &call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trailing_slash() {
        let client = HttpLedgerClient::new("http://127.0.0.1:9944/");
        assert_eq!(client.endpoint(), "http://127.0.0.1:9944");
        assert_eq!(client.url("query"), "http://127.0.0.1:9944/query");
    }

    #[tokio::test]
    async fn test_unreachable_node_is_network_error() {
        let client = HttpLedgerClient::new("http://127.0.0.1:1");
        let err = client
            .query(LedgerCall::new("assets", "tokens", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Network(_)));
    }
}

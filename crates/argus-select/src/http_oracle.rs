//! Ranking oracle backed by an HTTP endpoint.
//!
//! Posts the [`RankingRequest`] as JSON and expects a [`RankingResponse`]
//! back. Typically fronts an LLM prompt that scores source relevance.

use std::time::Duration;

use argus_config::OracleConfig;
use async_trait::async_trait;

use crate::{OracleError, RankingOracle, RankingRequest, RankingResponse};

pub struct HttpRankingOracle {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpRankingOracle {
    /// # Errors
    ///
    /// Returns [`OracleError::Http`] if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, OracleError> {
        Ok(Self {
            http: reqwest::Client::builder()
                .user_agent(concat!("argus/", env!("CARGO_PKG_VERSION")))
                .timeout(timeout)
                .build()?,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    /// Build from configuration. `None` when no endpoint is configured.
    ///
    /// The API key is read from the environment variable the config names.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &OracleConfig) -> Result<Option<Self>, OracleError> {
        if !config.is_configured() {
            return Ok(None);
        }
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty());
        Self::new(
            config.endpoint.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
        .map(Some)
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Map a raw oracle response to a ranking.
async fn decode(resp: reqwest::Response) -> Result<RankingResponse, OracleError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(OracleError::Api {
            status: status.as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| OracleError::Malformed(e.to_string()))
}

#[async_trait]
impl RankingOracle for HttpRankingOracle {
    async fn rank(&self, request: &RankingRequest) -> Result<RankingResponse, OracleError> {
        let mut builder = self.http.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        decode(builder.send().await?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mock_response(status: u16, body: &str) -> reqwest::Response {
        reqwest::Response::from(
            ::http::Response::builder()
                .status(status)
                .body(body.to_string())
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn decodes_ranking() {
        let resp = mock_response(
            200,
            r#"{"ranking":[{"source_id":"emailrep","confidence":0.9}]}"#,
        );
        let ranking = decode(resp).await.unwrap();
        assert_eq!(ranking.ranking.len(), 1);
        assert_eq!(ranking.ranking[0].source_id, "emailrep");
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let resp = mock_response(200, "I think emailrep is best");
        assert!(matches!(
            decode(resp).await,
            Err(OracleError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn server_error_is_api_error() {
        let resp = mock_response(503, "overloaded");
        let err = decode(resp).await.unwrap_err();
        assert!(matches!(err, OracleError::Api { status: 503, .. }));
    }

    #[test]
    fn unconfigured_oracle_is_none() {
        let config = OracleConfig::default();
        assert!(HttpRankingOracle::from_config(&config).unwrap().is_none());
    }

    #[tokio::test]
    #[ignore] // requires network
    async fn unreachable_endpoint_is_http_error() {
        let oracle = HttpRankingOracle::new(
            "http://127.0.0.1:9/rank",
            None,
            Duration::from_millis(200),
        )
        .unwrap();
        let request = RankingRequest {
            signals: Vec::new(),
            candidates: Vec::new(),
        };
        assert!(matches!(
            oracle.rank(&request).await,
            Err(OracleError::Http(_))
        ));
    }
}

//! The oracle port and its HTTP implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use trail_types::Decision;

use crate::errors::OracleError;
use crate::request::OracleRequest;
use crate::wire::WireDecision;

/// Abstraction over the external decision service so multiple backends
/// (and the scripted oracle) plug into the step machine.
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    /// Request the single next action for the current state.
    ///
    /// `Ok(None)` is the oracle's null response: it answered but proposed
    /// nothing, which is fatal for the current episode.
    async fn decide(&self, request: &OracleRequest) -> Result<Option<Decision>, OracleError>;
}

/// Configuration for the HTTP oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpOracleConfig {
    /// Decision endpoint, e.g. `https://oracle.internal/v1/decide`.
    pub endpoint: Url,
    /// Bearer token attached to each request, if any.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Round-trip deadline in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    60_000
}

/// JSON-over-HTTP oracle client.
pub struct HttpOracle {
    client: reqwest::Client,
    config: HttpOracleConfig,
}

impl HttpOracle {
    pub fn new(config: HttpOracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| OracleError::Unavailable(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl DecisionOracle for HttpOracle {
    async fn decide(&self, request: &OracleRequest) -> Result<Option<Decision>, OracleError> {
        debug!(
            elements = request.state_summary.len(),
            retries = request.failed_candidates.len(),
            "requesting decision"
        );

        let mut builder = self.client.post(self.config.endpoint.clone()).json(request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout(self.config.timeout_ms)
            } else {
                OracleError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "oracle returned error status");
            return Err(OracleError::Unavailable(format!("{status}: {body}")));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(e.to_string()))?;

        // An explicit JSON null is the oracle's "no decision" answer.
        if value.is_null() {
            return Ok(None);
        }

        let wire: WireDecision =
            serde_json::from_value(value).map_err(|e| OracleError::Malformed(e.to_string()))?;
        wire.into_decision().map(Some)
    }
}

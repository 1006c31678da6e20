//! Configuration service client.
//!
//! # Responsibilities
//! - Build the rule document URL for a page key
//! - Fetch and decode the document under a hard deadline
//! - Collapse every failure into an empty RuleSet for the pipeline
//!
//! # Design Decisions
//! - No retries and no caching; every request fetches fresh
//! - A slow configuration service must never hold up the origin response

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::time::timeout;
use url::Url;

use crate::config::RulesConfig;
use crate::observability::metrics;
use crate::rules::key::ConfigKey;
use crate::rules::set::RuleSet;

/// Errors that can occur while fetching a rule document.
#[derive(Debug, Error)]
pub enum RuleFetchError {
    /// The base URL cannot carry path segments.
    #[error("Invalid rules URL: {0}")]
    InvalidUrl(String),

    /// Connection or protocol failure.
    #[error("Rules request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Rules service returned status {0}")]
    Status(u16),

    /// The body was not JSON.
    #[error("Rules document is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// The whole exchange exceeded the configured deadline.
    #[error("Rules request timed out after {0} ms")]
    Timeout(u64),
}

impl RuleFetchError {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RuleFetchError::InvalidUrl(_) => "invalid_url",
            RuleFetchError::Network(_) => "network",
            RuleFetchError::Status(404) => "not_found",
            RuleFetchError::Status(_) => "status",
            RuleFetchError::Decode(_) => "decode",
            RuleFetchError::Timeout(_) => "timeout",
        }
    }
}

/// Fetches per-page rule documents for one tenant.
#[derive(Clone)]
pub struct RuleClient {
    http: reqwest::Client,
    base_url: Url,
    tenant_id: String,
    timeout: Duration,
}

impl RuleClient {
    /// Create a client from validated configuration.
    pub fn new(config: &RulesConfig) -> Result<Self, RuleFetchError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| RuleFetchError::InvalidUrl(format!("'{}': {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(RuleFetchError::InvalidUrl(config.base_url.clone()));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("edge-augment/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()?;

        Ok(Self {
            http,
            base_url,
            tenant_id: config.tenant_id.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }

    /// `<base>/<tenant>/<key>.json`
    pub fn document_url(&self, key: &ConfigKey) -> Result<Url, RuleFetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RuleFetchError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(&self.tenant_id)
            .push(&format!("{}.json", key));
        Ok(url)
    }

    /// Fetch the rules for `key`.
    pub async fn fetch(&self, key: &ConfigKey) -> Result<RuleSet, RuleFetchError> {
        match timeout(self.timeout, self.request(key)).await {
            Ok(result) => result,
            Err(_) => Err(RuleFetchError::Timeout(self.timeout.as_millis() as u64)),
        }
    }

    async fn request(&self, key: &ConfigKey) -> Result<RuleSet, RuleFetchError> {
        let url = self.document_url(key)?;
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RuleFetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let document: Value = serde_json::from_slice(&body)?;
        Ok(RuleSet::from_document(document))
    }

    /// Fetch the rules for `key`, treating any failure as "no rules".
    pub async fn fetch_or_empty(&self, key: &ConfigKey) -> RuleSet {
        match self.fetch(key).await {
            Ok(rules) => {
                tracing::debug!(
                    config_key = %key,
                    content_rules = rules.content_rules().len(),
                    schema_rules = rules.schema_rules().len(),
                    "Rules loaded"
                );
                metrics::record_rule_fetch("ok");
                metrics::record_rules_loaded(rules.len());
                rules
            }
            Err(RuleFetchError::Status(404)) => {
                tracing::debug!(config_key = %key, "No rules published for page");
                metrics::record_rule_fetch("not_found");
                RuleSet::default()
            }
            Err(e) => {
                tracing::warn!(config_key = %key, error = %e, "Rules unavailable, serving origin content");
                metrics::record_rule_fetch(e.label());
                RuleSet::default()
            }
        }
    }
}

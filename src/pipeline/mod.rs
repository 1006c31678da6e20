//! Per-request augmentation pipeline.
//!
//! # Data Flow
//! ```text
//! request ──▶ ConfigKey
//!    │            │
//!    │            ▼
//!    │       RuleClient::fetch_or_empty ─┐
//!    ▼                                   │  (concurrent)
//! OriginClient::forward ─────────────────┤
//!                                        ▼
//!                      no rules / ineligible / busy ──▶ origin response as-is
//!                                        │
//!                                        ▼
//!                       transform_body ──▶ rewritten streaming response
//! ```
//!
//! # Design Decisions
//! - The rules fetch never delays the origin request; both start together
//! - Any rules failure means "no rules" and the page is served unmodified
//! - Only an origin failure is an error for the caller

pub mod origin;

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::{AugmentConfig, TransformConfig};
use crate::http::response::{check_eligible, prepare_rewritten_headers};
use crate::observability::metrics;
use crate::rewrite::{transform_body, TransformLimits};
use crate::rules::{ConfigKey, KeySource, RuleClient, RuleFetchError, RuleSet, TransformContext};

pub use origin::{OriginClient, OriginError};

/// Errors building the pipeline from configuration.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Rules client: {0}")]
    Rules(#[from] RuleFetchError),

    #[error("Origin client: {0}")]
    Origin(#[from] OriginError),
}

/// How a request was served, for metrics and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Transformed,
    NoRules,
    Ineligible,
    Busy,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Transformed => "transformed",
            Outcome::NoRules => "passthrough_no_rules",
            Outcome::Ineligible => "passthrough_ineligible",
            Outcome::Busy => "passthrough_busy",
        }
    }
}

/// Fetches rules and origin content for each request and joins them.
pub struct RequestPipeline {
    rules: RuleClient,
    origin: OriginClient,
    transform: TransformConfig,
    limits: TransformLimits,
    key_source: KeySource,
    public_scheme: String,
    workers: Arc<Semaphore>,
}

impl RequestPipeline {
    pub fn new(config: &AugmentConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            rules: RuleClient::new(&config.rules)?,
            origin: OriginClient::new(&config.origin)?,
            transform: config.transform.clone(),
            limits: TransformLimits::from(&config.transform),
            key_source: config.rules.key_source,
            public_scheme: config.rules.public_scheme.clone(),
            workers: Arc::new(Semaphore::new(config.transform.max_concurrent)),
        })
    }

    /// Serve one request.
    ///
    /// Returns the origin's response, rewritten when the page has rules and
    /// the response is HTML.
    pub async fn handle(&self, request: Request<Body>) -> Result<Response<Body>, OriginError> {
        let start = Instant::now();
        let method = request.method().clone();
        let key = ConfigKey::for_request(&request, self.key_source, &self.public_scheme);
        let wants_rules = self.transform.enabled && method != Method::HEAD;

        let rules = async {
            if wants_rules {
                self.rules.fetch_or_empty(&key).await
            } else {
                RuleSet::default()
            }
        };
        let (rules, response) = tokio::join!(rules, self.origin.forward(request));
        let response = response?;

        let (response, outcome) = self.augment(&method, key, rules, response);
        tracing::debug!(
            status = response.status().as_u16(),
            outcome = outcome.label(),
            "Response ready"
        );
        metrics::record_request(outcome.label(), start);
        Ok(response)
    }

    fn augment(
        &self,
        method: &Method,
        key: ConfigKey,
        rules: RuleSet,
        response: Response<Body>,
    ) -> (Response<Body>, Outcome) {
        if rules.is_empty() {
            return (response, Outcome::NoRules);
        }

        if let Err(reason) =
            check_eligible(method, response.status(), response.headers(), &self.transform.content_types)
        {
            tracing::debug!(config_key = %key, reason = reason.label(), "Response not eligible for rewriting");
            return (response, Outcome::Ineligible);
        }

        let Ok(permit) = self.workers.clone().try_acquire_owned() else {
            tracing::warn!(config_key = %key, "Transform capacity exhausted, serving origin content");
            return (response, Outcome::Busy);
        };

        tracing::debug!(
            config_key = %key,
            content_rules = rules.content_rules().len(),
            schema_rules = rules.schema_rules().len(),
            "Rewriting response"
        );

        let (mut parts, body) = response.into_parts();
        prepare_rewritten_headers(&mut parts.headers);
        let body = transform_body(body, TransformContext::new(key, rules), self.limits, permit);
        (Response::from_parts(parts, body), Outcome::Transformed)
    }
}

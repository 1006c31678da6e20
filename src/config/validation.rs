//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and URLs
//! - Validate value ranges (timeouts > 0, limits > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AugmentConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::uri::Authority;
use thiserror::Error;
use url::Url;

use crate::config::schema::AugmentConfig;

/// Each active transform occupies a blocking-pool thread; tokio's pool
/// defaults to this many.
pub const MAX_CONCURRENT_TRANSFORMS: usize = 512;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("rules.tenant_id must be set")]
    MissingTenant,

    #[error("rules.base_url '{0}' is not an http(s) URL")]
    InvalidRulesUrl(String),

    #[error("origin.address '{0}' is not a host:port pair")]
    InvalidOrigin(String),

    #[error("listener.bind_address '{0}' is not a socket address")]
    InvalidBindAddress(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("transform.content_types must not be empty")]
    NoContentTypes,

    #[error("transform.max_concurrent {0} exceeds the blocking thread pool (512)")]
    TooManyTransforms(usize),
}

/// Check the configuration, collecting every violation.
pub fn validate_config(config: &AugmentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.rules.tenant_id.trim().is_empty() {
        errors.push(ValidationError::MissingTenant);
    }

    match Url::parse(&config.rules.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError::InvalidRulesUrl(config.rules.base_url.clone())),
    }

    if !is_host_port(&config.origin.address) {
        errors.push(ValidationError::InvalidOrigin(config.origin.address.clone()));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(config.listener.bind_address.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let ranges = [
        ("rules.timeout_ms", config.rules.timeout_ms as usize),
        ("origin.connect_timeout_ms", config.origin.connect_timeout_ms as usize),
        ("timeouts.request_secs", config.timeouts.request_secs as usize),
        ("transform.max_concurrent", config.transform.max_concurrent),
        ("transform.max_text_node_bytes", config.transform.max_text_node_bytes),
        ("transform.max_memory_bytes", config.transform.max_memory_bytes),
    ];
    for (name, value) in ranges {
        if value == 0 {
            errors.push(ValidationError::Zero(name));
        }
    }

    if config.transform.max_concurrent > MAX_CONCURRENT_TRANSFORMS {
        errors.push(ValidationError::TooManyTransforms(config.transform.max_concurrent));
    }

    if config.transform.content_types.iter().all(|t| t.trim().is_empty()) {
        errors.push(ValidationError::NoContentTypes);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_host_port(address: &str) -> bool {
    address
        .parse::<Authority>()
        .map(|a| !a.host().is_empty() && a.port_u16().is_some() && !address.contains('@'))
        .unwrap_or(false)
}

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::rules::KeySource;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AugmentConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Origin server the traffic is forwarded to.
    pub origin: OriginConfig,

    /// Configuration service holding the per-page rules.
    pub rules: RulesConfig,

    /// HTML transformation limits.
    pub transform: TransformConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Origin server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Origin address (e.g., "127.0.0.1:3000").
    pub address: String,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
            connect_timeout_ms: 5_000,
        }
    }
}

/// Configuration service settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Base URL; documents live at `<base_url>/<tenant_id>/<key>.json`.
    pub base_url: String,

    /// Tenant identifier. Required.
    pub tenant_id: String,

    /// Deadline for the whole rules exchange in milliseconds.
    pub timeout_ms: u64,

    /// Which part of the request URL the page key is derived from.
    pub key_source: KeySource,

    /// Scheme used when rebuilding the public URL for `full_url` keys.
    pub public_scheme: String,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://jscloud.net/x".to_string(),
            tenant_id: String::new(),
            timeout_ms: 1_500,
            key_source: KeySource::Path,
            public_scheme: "https".to_string(),
        }
    }
}

/// HTML transformation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Master switch; when off the service is a plain pass-through proxy.
    pub enabled: bool,

    /// Maximum responses being rewritten at once. Excess responses pass through.
    pub max_concurrent: usize,

    /// Largest text node held back for rule matching, in bytes.
    pub max_text_node_bytes: usize,

    /// Memory cap for the HTML parser's internal buffers, in bytes.
    pub max_memory_bytes: usize,

    /// Media types eligible for rewriting.
    pub content_types: Vec<String>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_concurrent: 256,
            max_text_node_bytes: 64 * 1024,
            max_memory_bytes: 8 * 1024 * 1024,
            content_types: vec!["text/html".to_string()],
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Time allowed until response headers are ready, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Pretty for development, JSON for log shippers.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

//! Page key derivation.
//!
//! A page's rules live under a key made by deleting `/ . - : = ?` from its
//! URL. The scheme is lossy (`/a-b` and `/ab` collide) and that is accepted.

use std::fmt;

use axum::http::{header, Request};
use serde::{Deserialize, Serialize};

/// Characters removed from a URL to form its key.
const STRIPPED: &[char] = &['/', '.', '-', ':', '=', '?'];

/// Which part of the request the key is derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    /// Path and query only: `/blog/post-1` → `blogpost1`.
    #[default]
    Path,
    /// `<scheme>://<host><path?query>`, matching keys registered by full URL.
    FullUrl,
}

/// Normalized page identifier used to look up rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigKey(String);

impl ConfigKey {
    /// Normalize an arbitrary URL string.
    pub fn derive(url: &str) -> Self {
        Self(url.chars().filter(|c| !STRIPPED.contains(c)).collect())
    }

    /// Derive the key for an incoming request.
    ///
    /// `public_scheme` is only used by [`KeySource::FullUrl`]; the proxy sees
    /// plain HTTP even when clients reached the edge over TLS.
    pub fn for_request<B>(request: &Request<B>, source: KeySource, public_scheme: &str) -> Self {
        let target = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        match source {
            KeySource::Path => Self::derive(target),
            KeySource::FullUrl => {
                let host = request
                    .headers()
                    .get(header::HOST)
                    .and_then(|h| h.to_str().ok())
                    .or_else(|| request.uri().authority().map(|a| a.as_str()))
                    .unwrap_or_default();
                Self::derive(&format!("{}://{}{}", public_scheme, host, target))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//! Forwarding to the origin server.
//!
//! Requests keep their method, path, query, headers and body; only the
//! target authority changes. Responses come back untouched with their body
//! still streaming.

use std::str::FromStr;
use std::time::Duration;

use axum::body::Body;
use axum::http::uri::{Authority, InvalidUri, InvalidUriParts, PathAndQuery, Scheme};
use axum::http::{Request, Response, Uri, Version};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::config::OriginConfig;

/// Origin forwarding error type.
#[derive(Debug, Error)]
pub enum OriginError {
    #[error("Invalid origin address: {0}")]
    InvalidAddress(#[from] InvalidUri),

    #[error("Invalid forwarded URI: {0}")]
    InvalidUri(#[from] InvalidUriParts),

    #[error("Origin request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),
}

/// HTTP client bound to a single origin.
#[derive(Clone)]
pub struct OriginClient {
    client: Client<HttpConnector, Body>,
    authority: Authority,
}

impl OriginClient {
    pub fn new(config: &OriginConfig) -> Result<Self, OriginError> {
        let authority = Authority::from_str(&config.address)?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_millis(config.connect_timeout_ms)));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self { client, authority })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Send `request` to the origin and return its response as-is.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, OriginError> {
        let (mut parts, body) = request.into_parts();

        let mut uri_parts = parts.uri.clone().into_parts();
        uri_parts.scheme = Some(Scheme::HTTP);
        uri_parts.authority = Some(self.authority.clone());
        if uri_parts.path_and_query.is_none() {
            uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        parts.uri = Uri::from_parts(uri_parts)?;
        // Clients may reach us over HTTP/2; the origin hop is always HTTP/1.1
        parts.version = Version::HTTP_11;

        let response: Response<Incoming> =
            self.client.request(Request::from_parts(parts, body)).await?;
        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

//! Response handling and transformation.
//!
//! # Responsibilities
//! - Decide whether an origin response can be rewritten
//! - Fix up headers that stop being true once the body changes
//!
//! # Design Decisions
//! - Only identity-encoded UTF-8 HTML is rewritten; anything else streams through untouched
//! - Status and the remaining headers are always the origin's

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};

/// Why a response is passed through without rewriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligible {
    /// HEAD request or a status that carries no body.
    NoBody,
    /// A byte range of a document cannot be rewritten on its own.
    Partial,
    /// Media type not configured for rewriting.
    ContentType,
    /// Compressed or otherwise encoded body.
    Encoded,
    /// Declared charset other than UTF-8.
    Charset,
}

impl Ineligible {
    pub fn label(&self) -> &'static str {
        match self {
            Ineligible::NoBody => "no_body",
            Ineligible::Partial => "partial",
            Ineligible::ContentType => "content_type",
            Ineligible::Encoded => "encoded",
            Ineligible::Charset => "charset",
        }
    }
}

/// Check whether a response to `method` with `status`/`headers` may be rewritten.
pub fn check_eligible(
    method: &Method,
    status: StatusCode,
    headers: &HeaderMap,
    content_types: &[String],
) -> Result<(), Ineligible> {
    if method == Method::HEAD
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
    {
        return Err(Ineligible::NoBody);
    }
    if status == StatusCode::PARTIAL_CONTENT {
        return Err(Ineligible::Partial);
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or(Ineligible::ContentType)?;
    let (media_type, charset) = parse_content_type(content_type);
    if !content_types.iter().any(|t| t.trim().eq_ignore_ascii_case(&media_type)) {
        return Err(Ineligible::ContentType);
    }
    if let Some(charset) = charset {
        if !charset.eq_ignore_ascii_case("utf-8") && !charset.eq_ignore_ascii_case("utf8") {
            return Err(Ineligible::Charset);
        }
    }

    for value in headers.get_all(header::CONTENT_ENCODING) {
        let encoded = value
            .to_str()
            .map(|v| v.split(',').any(|c| !c.trim().eq_ignore_ascii_case("identity")))
            .unwrap_or(true);
        if encoded {
            return Err(Ineligible::Encoded);
        }
    }

    Ok(())
}

/// Split `text/html; charset="UTF-8"` into `("text/html", Some("UTF-8"))`.
fn parse_content_type(value: &str) -> (String, Option<String>) {
    let mut parts = value.split(';');
    let media_type = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
    let charset = parts.find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
    });
    (media_type, charset)
}

/// Adjust origin headers for a rewritten body.
///
/// The length is no longer known and a strong validator no longer
/// identifies these exact bytes, so it is downgraded to a weak one.
pub fn prepare_rewritten_headers(headers: &mut HeaderMap) {
    headers.remove(header::CONTENT_LENGTH);

    let weakened = headers
        .get(header::ETAG)
        .and_then(|v| v.to_str().ok())
        .filter(|etag| etag.starts_with('"'))
        .and_then(|etag| HeaderValue::from_str(&format!("W/{}", etag)).ok());
    if let Some(etag) = weakened {
        headers.insert(header::ETAG, etag);
    }
}

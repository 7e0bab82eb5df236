//! Request-shape helpers over `http::Request<Vec<u8>>`.

use erc8128_canonical::digest::verify_content_digest as digest_matches;
use erc8128_canonical::ContentDigest;
use http::header::{HeaderName, HeaderValue, HOST};
use http::uri::Authority;
use http::Request;
use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;

/// Requests handled by the pipelines: a fully buffered body.
pub type SignableRequest = Request<Vec<u8>>;

/// `Content-Digest` header name.
pub const CONTENT_DIGEST_HEADER: &str = "content-digest";
/// `Signature-Input` header name.
pub const SIGNATURE_INPUT_HEADER: &str = "signature-input";
/// `Signature` header name.
pub const SIGNATURE_HEADER: &str = "signature";
/// `Accept-Signature` header name.
pub const ACCEPT_SIGNATURE_HEADER: &str = "accept-signature";

/// How the signer obtains the `Content-Digest` header when it is covered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DigestMode {
    /// Compute from the body unless the header is already present.
    #[default]
    Auto,
    /// Always compute from the body, overwriting any existing header.
    Recompute,
    /// Use the existing header; fail if absent.
    Require,
    /// Never touch the header; covering `content-digest` is then an error.
    Off,
}

/// True when the request URI has a non-empty query string.
pub fn has_query(request: &SignableRequest) -> bool {
    request.uri().query().is_some_and(|q| !q.is_empty())
}

/// True when the request carries a non-empty body.
pub fn has_body(request: &SignableRequest) -> bool {
    !request.body().is_empty()
}

/// Request scheme, lowercased; origin-form requests are assumed to be `https`.
pub fn scheme(request: &SignableRequest) -> String {
    request
        .uri()
        .scheme_str()
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "https".to_string())
}

/// Authority from the absolute URI, falling back to the `Host` header.
pub fn authority(request: &SignableRequest) -> Result<Authority, ProtocolError> {
    if let Some(authority) = request.uri().authority() {
        return Ok(authority.clone());
    }
    let host = request
        .headers()
        .get(HOST)
        .ok_or_else(|| {
            ProtocolError::UnsupportedRequest(
                "request has neither an absolute URI nor a Host header".to_string(),
            )
        })?
        .to_str()
        .map_err(|_| ProtocolError::BadHeaderValue("host is not visible ASCII".to_string()))?;
    host.parse::<Authority>()
        .map_err(|e| ProtocolError::BadHeaderValue(format!("invalid host '{}': {}", host, e)))
}

/// All values of a header joined with `", "`, or `None` when absent.
pub fn combined_header(
    request: &SignableRequest,
    name: &str,
) -> Result<Option<String>, ProtocolError> {
    let mut values = request.headers().get_all(name).iter().peekable();
    if values.peek().is_none() {
        return Ok(None);
    }
    let parts = values
        .map(|v| {
            v.to_str()
                .map(str::to_string)
                .map_err(|_| ProtocolError::BadHeaderValue(format!("{} is not visible ASCII", name)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(parts.join(", ")))
}

/// Copies method, URI, version, headers and body into a new request.
pub fn clone_request(request: &SignableRequest) -> SignableRequest {
    let mut out = Request::new(request.body().clone());
    *out.method_mut() = request.method().clone();
    *out.uri_mut() = request.uri().clone();
    *out.version_mut() = request.version();
    *out.headers_mut() = request.headers().clone();
    out
}

/// Ensures the `Content-Digest` header is set according to `mode`.
///
/// The body is hashed from a borrowed view; the request keeps owning it.
pub fn set_content_digest_header(
    request: &mut SignableRequest,
    mode: DigestMode,
) -> Result<(), ProtocolError> {
    let present = request.headers().contains_key(CONTENT_DIGEST_HEADER);
    match mode {
        DigestMode::Off => {
            return Err(ProtocolError::DigestRequired(
                "content-digest is covered but digest mode is off".to_string(),
            ))
        }
        DigestMode::Require if !present => {
            return Err(ProtocolError::DigestRequired(
                "content-digest header is absent".to_string(),
            ))
        }
        DigestMode::Require => return Ok(()),
        DigestMode::Auto if present => return Ok(()),
        DigestMode::Auto | DigestMode::Recompute => {}
    }

    let value = ContentDigest::compute(request.body()).header_value();
    let value = HeaderValue::from_str(&value)
        .map_err(|e| ProtocolError::BadHeaderValue(format!("content-digest: {}", e)))?;
    request
        .headers_mut()
        .insert(HeaderName::from_static(CONTENT_DIGEST_HEADER), value);
    Ok(())
}

/// Checks the request's `Content-Digest` header against its body.
///
/// Absent, unparsable or non-`sha-256` headers yield `false`.
pub fn verify_content_digest(request: &SignableRequest) -> bool {
    match combined_header(request, CONTENT_DIGEST_HEADER) {
        Ok(Some(header)) => digest_matches(&header, request.body()),
        _ => false,
    }
}

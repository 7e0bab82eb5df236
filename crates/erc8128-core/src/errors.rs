use erc8128_canonical::{SfError, ValidationError};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Stable codes for hard (caller-side) errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Options are inconsistent or out of range.
    InvalidOptions,
    /// The request cannot be signed or verified in its current shape.
    UnsupportedRequest,
    /// The request body could not be read.
    BodyReadFailed,
    /// A covered `content-digest` could not be produced.
    DigestRequired,
    /// A derived component value is missing or not representable.
    BadDerivedValue,
    /// A header value is missing or not representable.
    BadHeaderValue,
    /// A structured field could not be parsed or serialized.
    ParseError,
    /// The signer failed or produced no signature.
    CryptoUnavailable,
}

impl ErrorCode {
    /// Code as it appears in logs and API responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidOptions => "INVALID_OPTIONS",
            ErrorCode::UnsupportedRequest => "UNSUPPORTED_REQUEST",
            ErrorCode::BodyReadFailed => "BODY_READ_FAILED",
            ErrorCode::DigestRequired => "DIGEST_REQUIRED",
            ErrorCode::BadDerivedValue => "BAD_DERIVED_VALUE",
            ErrorCode::BadHeaderValue => "BAD_HEADER_VALUE",
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::CryptoUnavailable => "CRYPTO_UNAVAILABLE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hard errors raised while signing or building signature bases.
///
/// These describe caller mistakes or environment limits. Adversarial input
/// during verification never produces one of these; see
/// [`VerifyFailure`](crate::VerifyFailure).
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Options are inconsistent or out of range.
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    /// A component list or policy failed validation.
    #[error("invalid options: {0}")]
    Validation(#[from] ValidationError),
    /// The request cannot be signed or verified in its current shape.
    #[error("unsupported request: {0}")]
    UnsupportedRequest(String),
    /// A covered `content-digest` header is absent and may not be computed.
    #[error("content-digest required: {0}")]
    DigestRequired(String),
    /// A derived component is unknown or its value is not representable.
    #[error("bad derived component value: {0}")]
    BadDerivedValue(String),
    /// A covered header is missing or its value is not representable.
    #[error("bad header value: {0}")]
    BadHeaderValue(String),
    /// A structured field could not be parsed or serialized.
    #[error("structured field error: {0}")]
    Parse(#[from] SfError),
    /// The signer failed or returned an empty signature.
    #[error("signer unavailable: {0}")]
    CryptoUnavailable(String),
}

impl ProtocolError {
    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ProtocolError::InvalidOptions(_) | ProtocolError::Validation(_) => {
                ErrorCode::InvalidOptions
            }
            ProtocolError::UnsupportedRequest(_) => ErrorCode::UnsupportedRequest,
            ProtocolError::DigestRequired(_) => ErrorCode::DigestRequired,
            ProtocolError::BadDerivedValue(_) => ErrorCode::BadDerivedValue,
            ProtocolError::BadHeaderValue(_) => ErrorCode::BadHeaderValue,
            ProtocolError::Parse(_) => ErrorCode::ParseError,
            ProtocolError::CryptoUnavailable(_) => ErrorCode::CryptoUnavailable,
        }
    }
}

//! Verification outcomes.

use erc8128_canonical::{Address, Binding, SignatureParams};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a request failed verification.
///
/// The snake_case names are stable; HTTP layers switch on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// `Signature-Input` or `Signature` is absent.
    MissingHeaders,
    /// A signature header is malformed, or a covered component cannot be
    /// reproduced from the request.
    BadSignatureInput,
    /// The strictly required label has no signature.
    LabelNotFound,
    /// No candidate carries a well-formed key identifier.
    BadKeyid,
    /// No candidate covers the request's mandatory components.
    NotRequestBound,
    /// A class-bound candidate matched no configured policy.
    ClassBoundNotAllowed,
    /// `expires` is not after `created`.
    BadTime,
    /// `created` is in the future.
    NotYetValid,
    /// `expires` is in the past.
    Expired,
    /// The validity window exceeds the policy maximum.
    ValidityTooLong,
    /// The signature carries no nonce and the policy requires one.
    ReplayableNotAllowed,
    /// The signature carries a nonce but no nonce store is configured.
    NonceRequired,
    /// The validity window exceeds the policy maximum for nonce signatures.
    NonceWindowTooLong,
    /// `content-digest` is covered but the header is absent.
    DigestRequired,
    /// `Content-Digest` does not match the body.
    DigestMismatch,
    /// The signature bytes are not valid base64 or are empty.
    BadSignatureBytes,
    /// The message verifier failed to complete the check.
    BadSignatureCheck,
    /// The message verifier rejected the signature.
    BadSignature,
    /// The nonce was already consumed.
    Replay,
    /// The nonce store could not complete the reservation.
    NonceStoreUnavailable,
}

impl FailureReason {
    /// Stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::MissingHeaders => "missing_headers",
            FailureReason::BadSignatureInput => "bad_signature_input",
            FailureReason::LabelNotFound => "label_not_found",
            FailureReason::BadKeyid => "bad_keyid",
            FailureReason::NotRequestBound => "not_request_bound",
            FailureReason::ClassBoundNotAllowed => "class_bound_not_allowed",
            FailureReason::BadTime => "bad_time",
            FailureReason::NotYetValid => "not_yet_valid",
            FailureReason::Expired => "expired",
            FailureReason::ValidityTooLong => "validity_too_long",
            FailureReason::ReplayableNotAllowed => "replayable_not_allowed",
            FailureReason::NonceRequired => "nonce_required",
            FailureReason::NonceWindowTooLong => "nonce_window_too_long",
            FailureReason::DigestRequired => "digest_required",
            FailureReason::DigestMismatch => "digest_mismatch",
            FailureReason::BadSignatureBytes => "bad_signature_bytes",
            FailureReason::BadSignatureCheck => "bad_signature_check",
            FailureReason::BadSignature => "bad_signature",
            FailureReason::Replay => "replay",
            FailureReason::NonceStoreUnavailable => "nonce_store_unavailable",
        }
    }

    /// HTTP status an enforcement layer should answer with: 400 for
    /// malformed requests, 503 when replay state is unreachable, 401 for
    /// authentication failures.
    pub fn http_status(self) -> u16 {
        match self {
            FailureReason::MissingHeaders
            | FailureReason::BadSignatureInput
            | FailureReason::BadKeyid => 400,
            FailureReason::NonceStoreUnavailable => 503,
            _ => 401,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{reason}{}", .detail.as_deref().map(|d| format!(": {}", d)).unwrap_or_default())]
pub struct VerifyFailure {
    /// Machine-readable reason.
    pub reason: FailureReason,
    /// Human-readable context, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl VerifyFailure {
    /// Failure without detail.
    pub fn new(reason: FailureReason) -> Self {
        Self {
            reason,
            detail: None,
        }
    }

    /// Failure with detail.
    pub fn with_detail(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: Some(detail.into()),
        }
    }
}

impl From<FailureReason> for VerifyFailure {
    fn from(reason: FailureReason) -> Self {
        Self::new(reason)
    }
}

/// A successfully verified request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedRequest {
    /// Signing account.
    pub address: Address,
    /// Chain of the signing account.
    pub chain_id: u64,
    /// Label of the winning signature.
    pub label: String,
    /// Components the winning signature covers, in declared order.
    pub components: Vec<String>,
    /// Parameters of the winning signature.
    pub params: SignatureParams,
    /// True when the winning signature carries no nonce.
    pub replayable: bool,
    /// How the winning signature is bound to the request.
    pub binding: Binding,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_serialize_as_snake_case() {
        let json = serde_json::to_string(&FailureReason::ClassBoundNotAllowed).unwrap();
        assert_eq!(json, "\"class_bound_not_allowed\"");
        assert_eq!(FailureReason::BadKeyid.as_str(), "bad_keyid");
    }

    #[test]
    fn http_status_splits_malformed_from_unauthenticated() {
        assert_eq!(FailureReason::MissingHeaders.http_status(), 400);
        assert_eq!(FailureReason::BadSignatureInput.http_status(), 400);
        assert_eq!(FailureReason::BadKeyid.http_status(), 400);
        assert_eq!(FailureReason::Replay.http_status(), 401);
        assert_eq!(FailureReason::NonceStoreUnavailable.http_status(), 503);
        assert_eq!(FailureReason::Expired.http_status(), 401);
    }

    #[test]
    fn failure_display_includes_detail() {
        assert_eq!(VerifyFailure::new(FailureReason::Expired).to_string(), "expired");
        assert_eq!(
            VerifyFailure::with_detail(FailureReason::BadSignatureInput, "missing '='").to_string(),
            "bad_signature_input: missing '='"
        );
    }
}

//! Signing and verification pipelines for ERC-8128 HTTP message signatures.
//!
//! This crate provides:
//! - Signature base construction over `http::Request<Vec<u8>>`
//! - Request signing through an injected [`Signer`]
//! - Request verification through [`RequestVerifier`], an injected
//!   [`MessageVerifier`] and an optional [`NonceStore`]
//! - `Accept-Signature` advertisement for rejected clients
//!
//! Core invariants:
//! - Signer and verifier derive byte-identical signature bases
//! - Verification never panics on adversarial input; it returns a [`VerifyFailure`]
//! - A nonce is consumed only after the signature itself checks out
//!
#![deny(missing_docs)]

/// `Accept-Signature` header generation.
pub mod advertise;
/// Signature base construction.
pub mod base;
/// Traits for the signer, message verifier and nonce store.
pub mod collaborators;
/// Hard error types and codes.
pub mod errors;
/// Nonce sources and the in-memory nonce store.
pub mod nonce;
/// Verification outcomes.
pub mod outcome;
/// Signer options and verifier policy.
pub mod policy;
/// Request-shape and header helpers.
pub mod request;
/// Request signing.
pub mod signing;
/// Request verification.
pub mod verification;

pub use advertise::accept_signature_header;
pub use base::{build_signature_base, signature_base_string};
pub use collaborators::{BoxError, MessageVerifier, NonceStore, Signer, VerifyMessageRequest};
pub use errors::{ErrorCode, ProtocolError};
pub use nonce::{default_nonce_key, MemoryNonceStore, NonceKeyFn, NonceSource};
pub use outcome::{FailureReason, VerifiedRequest, VerifyFailure};
pub use policy::{HeaderMode, Replay, SignOptions, VerifyPolicy};
pub use request::{DigestMode, SignableRequest};
pub use signing::{sign_request, sign_request_at};
pub use verification::RequestVerifier;

pub use erc8128_canonical::{Address, Binding, KeyId, SignatureParams};

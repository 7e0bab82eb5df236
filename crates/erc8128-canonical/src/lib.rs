//! Wire-level primitives for ERC-8128 HTTP message signatures.
//!
//! This crate holds everything that participates byte-for-byte in what gets
//! signed: the structured-field subset used by `Signature-Input` and
//! `Signature`, the `erc8128:<chainId>:<address>` key identifier, the
//! `Content-Digest` codec, and the covered-component rules shared by signers
//! and verifiers. Nothing here performs I/O or cryptographic signing.
//!
#![deny(missing_docs)]

/// Covered-component identifiers, resolution and policy normalization.
pub mod components;
/// `Content-Digest` computation and validation.
pub mod digest;
/// Key identifier and address codecs.
pub mod keyid;
/// Structured-field codec for signature headers.
pub mod sfv;
/// Validation errors shared by the primitives.
pub mod validation;

pub use components::{
    default_components, includes_all_components, normalize_class_bound_policies,
    normalize_components, required_request_bound_components, resolve_components, Binding,
};
pub use digest::{ContentDigest, DigestAlg};
pub use keyid::{format_key_id, parse_key_id, Address, KeyId, KEYID_SCHEME};
pub use self::sfv::{
    parse_signature_dictionary, parse_signature_input_dictionary, serialize_signature_member,
    serialize_signature_params, BareItem, SfError, SignatureInputMember, SignatureParams,
};
pub use validation::ValidationError;

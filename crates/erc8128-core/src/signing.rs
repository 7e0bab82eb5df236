//! Request signing.
//!
//! Signing never mutates its input: the request is copied, the digest and
//! signature headers are written onto the copy, and the copy is returned.

use chrono::Utc;
use erc8128_canonical::components::CONTENT_DIGEST;
use erc8128_canonical::sfv::{dictionary_labels, is_valid_label, serialize_dictionary_member};
use erc8128_canonical::{
    format_key_id, resolve_components, serialize_signature_member, serialize_signature_params,
    SignatureParams,
};
use http::header::{HeaderName, HeaderValue};
use tracing::debug;

use crate::base::build_signature_base;
use crate::collaborators::Signer;
use crate::errors::ProtocolError;
use crate::policy::{HeaderMode, Replay, SignOptions};
use crate::request::{self, SignableRequest, SIGNATURE_HEADER, SIGNATURE_INPUT_HEADER};

/// Signs `request` as of the current time.
pub async fn sign_request(
    request: &SignableRequest,
    signer: &dyn Signer,
    options: &SignOptions,
) -> Result<SignableRequest, ProtocolError> {
    sign_request_at(request, signer, options, Utc::now().timestamp()).await
}

/// Signs `request` with `now` as the default creation time.
pub async fn sign_request_at(
    request: &SignableRequest,
    signer: &dyn Signer,
    options: &SignOptions,
    now: i64,
) -> Result<SignableRequest, ProtocolError> {
    if !is_valid_label(&options.label) {
        return Err(ProtocolError::InvalidOptions(format!(
            "invalid label '{}'",
            options.label
        )));
    }
    let params = resolve_params(signer, options, now)?;
    let components = resolve_components(
        options.binding,
        request::has_query(request),
        request::has_body(request),
        options.components.as_deref(),
    )?;

    let mut signed = request::clone_request(request);
    if components.iter().any(|c| c == CONTENT_DIGEST) {
        request::set_content_digest_header(&mut signed, options.content_digest)?;
    }

    let signature_params_value = serialize_signature_params(&components, &params)?;
    let base = build_signature_base(&signed, &components, &signature_params_value)?;
    debug!(
        "Signing {} request with label '{}' over {} bytes of signature base",
        options.binding.as_str(),
        options.label,
        base.len()
    );

    let signature = signer
        .sign_message(&base)
        .await
        .map_err(|e| ProtocolError::CryptoUnavailable(e.to_string()))?;
    if signature.is_empty() {
        return Err(ProtocolError::CryptoUnavailable(
            "signer returned an empty signature".to_string(),
        ));
    }

    let input_member = serialize_dictionary_member(&options.label, &signature_params_value)?;
    let signature_member = serialize_signature_member(&options.label, &signature)?;
    write_signature_headers(&mut signed, options, &input_member, &signature_member)?;
    Ok(signed)
}

fn resolve_params(
    signer: &dyn Signer,
    options: &SignOptions,
    now: i64,
) -> Result<SignatureParams, ProtocolError> {
    let created = options.created.unwrap_or(now);
    let expires = match options.expires {
        Some(expires) => expires,
        None => {
            if options.ttl_seconds <= 0 {
                return Err(ProtocolError::InvalidOptions(
                    "ttl_seconds must be positive".to_string(),
                ));
            }
            created.saturating_add(options.ttl_seconds)
        }
    };
    if expires <= created {
        return Err(ProtocolError::InvalidOptions(format!(
            "expires ({}) must be after created ({})",
            expires, created
        )));
    }
    let nonce = match options.replay {
        Replay::NonReplayable => Some(options.nonce.resolve()?),
        Replay::Replayable => None,
    };
    Ok(SignatureParams {
        created,
        expires,
        keyid: format_key_id(signer.chain_id(), &signer.address()),
        nonce,
        tag: options.tag.clone(),
    })
}

fn write_signature_headers(
    request: &mut SignableRequest,
    options: &SignOptions,
    input_member: &str,
    signature_member: &str,
) -> Result<(), ProtocolError> {
    let (input_value, signature_value) = match options.header_mode {
        HeaderMode::Replace => (input_member.to_string(), signature_member.to_string()),
        HeaderMode::Append => {
            let existing_input = request::combined_header(request, SIGNATURE_INPUT_HEADER)?;
            let existing_signature = request::combined_header(request, SIGNATURE_HEADER)?;
            for existing in [&existing_input, &existing_signature].into_iter().flatten() {
                if dictionary_labels(existing)?.contains(&options.label) {
                    return Err(ProtocolError::InvalidOptions(format!(
                        "label '{}' is already present on the request",
                        options.label
                    )));
                }
            }
            (
                append_member(existing_input, input_member),
                append_member(existing_signature, signature_member),
            )
        }
    };
    insert_header(request, SIGNATURE_INPUT_HEADER, &input_value)?;
    insert_header(request, SIGNATURE_HEADER, &signature_value)
}

fn append_member(existing: Option<String>, member: &str) -> String {
    match existing {
        Some(existing) if !existing.trim().is_empty() => format!("{}, {}", existing, member),
        _ => member.to_string(),
    }
}

fn insert_header(
    request: &mut SignableRequest,
    name: &'static str,
    value: &str,
) -> Result<(), ProtocolError> {
    let value = HeaderValue::from_str(value)
        .map_err(|e| ProtocolError::BadHeaderValue(format!("{}: {}", name, e)))?;
    request
        .headers_mut()
        .insert(HeaderName::from_static(name), value);
    Ok(())
}

//! Signature base construction.
//!
//! Signer and verifier must derive byte-identical bases, so the verifier
//! passes the raw `Signature-Input` member value as `signature_params_value`
//! and the component list in the signer's declared order.

use erc8128_canonical::components::{
    AUTHORITY, METHOD, PATH, QUERY, REQUEST_TARGET, SCHEME, SIGNATURE_PARAMS, TARGET_URI,
};
use erc8128_canonical::sfv::serialize_string;

use crate::errors::ProtocolError;
use crate::request::{self, SignableRequest};

/// Builds the signature base as UTF-8 bytes.
pub fn build_signature_base(
    request: &SignableRequest,
    components: &[String],
    signature_params_value: &str,
) -> Result<Vec<u8>, ProtocolError> {
    signature_base_string(request, components, signature_params_value).map(String::into_bytes)
}

/// Builds the signature base text: one `"<name>": <value>` line per
/// component, then the `"@signature-params"` line, joined by `\n`.
pub fn signature_base_string(
    request: &SignableRequest,
    components: &[String],
    signature_params_value: &str,
) -> Result<String, ProtocolError> {
    let mut lines = Vec::with_capacity(components.len() + 1);
    for (idx, component) in components.iter().enumerate() {
        if components[..idx].contains(component) {
            return Err(ProtocolError::InvalidOptions(format!(
                "component '{}' is listed twice",
                component
            )));
        }
        let value = component_value(request, component)?;
        lines.push(format!("{}: {}", serialize_string(component)?, value));
    }
    ensure_visible(SIGNATURE_PARAMS, signature_params_value)
        .map_err(ProtocolError::BadDerivedValue)?;
    lines.push(format!(
        "{}: {}",
        serialize_string(SIGNATURE_PARAMS)?,
        signature_params_value
    ));
    Ok(lines.join("\n"))
}

/// Canonical value of a single covered component.
pub fn component_value(
    request: &SignableRequest,
    component: &str,
) -> Result<String, ProtocolError> {
    if component.starts_with('@') {
        let value = derived_value(request, component)?;
        ensure_visible(component, &value).map_err(ProtocolError::BadDerivedValue)?;
        Ok(value)
    } else {
        let value = header_field_value(request, component)?;
        ensure_visible(component, &value).map_err(ProtocolError::BadHeaderValue)?;
        Ok(value)
    }
}

fn derived_value(request: &SignableRequest, component: &str) -> Result<String, ProtocolError> {
    match component {
        METHOD => Ok(request.method().as_str().to_ascii_uppercase()),
        AUTHORITY => derived_authority(request),
        PATH => Ok(derived_path(request)),
        QUERY => Ok(derived_query(request)),
        SCHEME => Ok(request::scheme(request)),
        REQUEST_TARGET => Ok(format!(
            "{}{}",
            derived_path(request),
            derived_query(request)
        )),
        TARGET_URI => Ok(format!(
            "{}://{}{}{}",
            request::scheme(request),
            derived_authority(request)?,
            derived_path(request),
            derived_query(request)
        )),
        other => Err(ProtocolError::BadDerivedValue(format!(
            "unsupported derived component '{}'",
            other
        ))),
    }
}

/// Lowercased host, plus the port when it is not the scheme's default.
fn derived_authority(request: &SignableRequest) -> Result<String, ProtocolError> {
    let authority = request::authority(request)?;
    let host = authority.host().to_ascii_lowercase();
    let default_port = match request::scheme(request).as_str() {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    };
    match authority.port_u16() {
        Some(port) if Some(port) != default_port => Ok(format!("{}:{}", host, port)),
        _ => Ok(host),
    }
}

fn derived_path(request: &SignableRequest) -> String {
    match request.uri().path() {
        "" => "/".to_string(),
        path => path.to_string(),
    }
}

fn derived_query(request: &SignableRequest) -> String {
    match request.uri().query() {
        Some(query) if !query.is_empty() => format!("?{}", query),
        _ => String::new(),
    }
}

/// Header values, each trimmed with internal whitespace runs collapsed,
/// joined with `", "` when the field repeats.
fn header_field_value(request: &SignableRequest, name: &str) -> Result<String, ProtocolError> {
    let values = request.headers().get_all(name);
    let mut out = Vec::new();
    for value in values.iter() {
        let text = value
            .to_str()
            .map_err(|_| ProtocolError::BadHeaderValue(format!("{} is not visible ASCII", name)))?;
        out.push(collapse_whitespace(text));
    }
    if out.is_empty() {
        return Err(ProtocolError::BadHeaderValue(format!(
            "covered header '{}' is missing",
            name
        )));
    }
    Ok(out.join(", "))
}

fn collapse_whitespace(value: &str) -> String {
    value
        .split(|c| c == ' ' || c == '\t')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Values must be visible ASCII or space; CR and LF are never allowed.
fn ensure_visible(component: &str, value: &str) -> Result<(), String> {
    match value.bytes().find(|b| !(0x20..=0x7e).contains(b)) {
        None => Ok(()),
        Some(b) => Err(format!(
            "value of '{}' contains forbidden byte 0x{:02x}",
            component, b
        )),
    }
}

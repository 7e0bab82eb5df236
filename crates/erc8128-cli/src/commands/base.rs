//! Base command implementation.

use erc8128_canonical::parse_signature_input_dictionary;
use erc8128_core::{signature_base_string, SignableRequest};
use http::header::{HeaderName, HeaderValue};
use http::Request;
use thiserror::Error;
use tracing::debug;

/// Problems with the request described on the command line.
#[derive(Debug, Error)]
pub enum RequestArgError {
    /// A `--header` argument without a `:` separator.
    #[error("header '{0}' must look like 'name: value'")]
    MissingColon(String),
    /// A header name or value that HTTP does not allow.
    #[error("invalid header '{0}'")]
    InvalidHeader(String),
    /// The method or URL could not be assembled into a request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub fn run(
    method: String,
    url: String,
    headers: Vec<String>,
    body_file: Option<String>,
    signature_input: String,
    label: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let body = match body_file {
        Some(path) => {
            std::fs::read(&path).map_err(|e| format!("Failed to read file {}: {}", path, e))?
        }
        None => Vec::new(),
    };
    let request = build_request(&method, &url, &headers, body)?;

    let members = parse_signature_input_dictionary(&signature_input)
        .map_err(|e| format!("Invalid Signature-Input: {}", e))?;
    let member = match &label {
        Some(label) => members
            .iter()
            .find(|m| &m.label == label)
            .ok_or_else(|| format!("No Signature-Input member labelled '{}'", label))?,
        None => members
            .first()
            .ok_or("Signature-Input has no members")?,
    };
    debug!("Building signature base for member '{}'", member.label);

    let base = signature_base_string(&request, &member.components, &member.signature_params_value)?;
    println!("{}", base);
    Ok(())
}

fn build_request(
    method: &str,
    url: &str,
    headers: &[String],
    body: Vec<u8>,
) -> Result<SignableRequest, RequestArgError> {
    let mut request = Request::builder()
        .method(method)
        .uri(url)
        .body(body)
        .map_err(|e| RequestArgError::InvalidRequest(e.to_string()))?;

    for raw in headers {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| RequestArgError::MissingColon(raw.clone()))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|_| RequestArgError::InvalidHeader(raw.clone()))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|_| RequestArgError::InvalidHeader(raw.clone()))?;
        request.headers_mut().append(name, value);
    }
    Ok(request)
}

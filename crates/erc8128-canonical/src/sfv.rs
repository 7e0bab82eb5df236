//! Structured-field codec for the signature headers.
//!
//! RFC 8941 grammar (bare items, strings, parameters, inner lists) is handled
//! by the `sfv` crate. This module adds what the signature headers need on
//! top of it: stricter labels, raw member values for the `@signature-params`
//! line, non-empty component lists and a fixed parameter order when
//! serializing. Parsing never panics; malformed input surfaces as [`SfError`].

use ::sfv::{KeyRef, ListEntry, Parser, SerializeValue, StringRef};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub use ::sfv::BareItem;

static LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_.-]*$").expect("invalid regex"));

/// Errors raised while parsing or serializing structured fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SfError {
    /// A dictionary member had no `=` separating label and value.
    #[error("dictionary member '{0}' is missing '='")]
    MissingEquals(String),
    /// A dictionary label does not match `^[a-z][a-z0-9_.-]*$`.
    #[error("invalid label '{0}'")]
    InvalidLabel(String),
    /// A member value is not valid structured-field syntax.
    #[error("member '{label}' is malformed: {message}")]
    Syntax {
        /// Label of the offending member.
        label: String,
        /// Parser message.
        message: String,
    },
    /// A `Signature-Input` member value is not an inner list.
    #[error("member '{0}' does not start with an inner list")]
    MissingInnerList(String),
    /// A `Signature-Input` member covers no components.
    #[error("member '{0}' has an empty inner list")]
    EmptyInnerList(String),
    /// A covered component is not a plain string.
    #[error("member '{0}' lists a component that is not a plain string")]
    InvalidComponent(String),
    /// A string contains a control character or a non-ASCII character.
    #[error("invalid string: {0}")]
    InvalidString(String),
    /// A string was opened but never closed.
    #[error("unterminated string")]
    Unterminated,
    /// A parameter key or value is malformed.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// A required signature parameter is missing or has the wrong type.
    #[error("member '{label}' has a missing or invalid '{param}' parameter")]
    BadSignatureParam {
        /// Label of the offending member.
        label: String,
        /// Name of the parameter.
        param: &'static str,
    },
    /// A `Signature` member value is not a byte sequence.
    #[error("member '{0}' is not a valid byte sequence")]
    InvalidByteSequence(String),
    /// An empty dictionary member.
    #[error("unexpected input at offset {offset} in '{input}'")]
    Unexpected {
        /// The text being parsed.
        input: String,
        /// Byte offset of the empty member.
        offset: usize,
    },
}

/// Ordered parameter list used when serializing; keys are unique.
pub type Parameters = Vec<(String, BareItem)>;

/// Parameters carried by one signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureParams {
    /// Creation time, unix seconds.
    pub created: i64,
    /// Expiry time, unix seconds.
    pub expires: i64,
    /// Key identifier (`erc8128:<chainId>:<address>`).
    pub keyid: String,
    /// Single-use nonce; absent for replayable signatures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Application-specific tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl SignatureParams {
    /// Length of the validity window in seconds.
    pub fn validity_seconds(&self) -> i64 {
        self.expires.saturating_sub(self.created)
    }

    fn from_parameters(label: &str, params: &::sfv::Parameters) -> Result<Self, SfError> {
        let bad = |param: &'static str| SfError::BadSignatureParam {
            label: label.to_string(),
            param,
        };
        let integer = |param: &'static str| {
            params
                .get(param)
                .and_then(|value| value.as_integer())
                .map(i64::from)
                .ok_or_else(|| bad(param))
        };
        let optional_string = |param: &'static str| match params.get(param) {
            None => Ok(None),
            Some(value) => value
                .as_string()
                .map(|s| Some(s.as_str().to_string()))
                .ok_or_else(|| bad(param)),
        };

        let keyid = optional_string("keyid")?
            .filter(|keyid| !keyid.is_empty())
            .ok_or_else(|| bad("keyid"))?;
        Ok(Self {
            created: integer("created")?,
            expires: integer("expires")?,
            keyid,
            nonce: optional_string("nonce")?,
            tag: optional_string("tag")?,
        })
    }
}

/// One parsed member of a `Signature-Input` dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInputMember {
    /// Dictionary label (e.g. `eth`).
    pub label: String,
    /// Covered components in the signer's declared order.
    pub components: Vec<String>,
    /// Parsed signature parameters.
    pub params: SignatureParams,
    /// The member value exactly as it appeared on the wire, used verbatim in
    /// the `@signature-params` line of the signature base.
    pub signature_params_value: String,
}

/// Returns true when `label` is a valid dictionary label.
pub fn is_valid_label(label: &str) -> bool {
    LABEL_RE.is_match(label)
}

/// Parses a `Signature-Input` header into its members, preserving header order.
///
/// A label that appears twice keeps its first position and its last value.
pub fn parse_signature_input_dictionary(
    header: &str,
) -> Result<Vec<SignatureInputMember>, SfError> {
    let mut members: Vec<SignatureInputMember> = Vec::new();
    for raw in split_members(header)? {
        let (label, value) = split_member(raw)?;
        let inner = match parse_member(raw, label)? {
            ListEntry::InnerList(inner) => inner,
            ListEntry::Item(_) => return Err(SfError::MissingInnerList(label.to_string())),
        };
        if inner.items.is_empty() {
            return Err(SfError::EmptyInnerList(label.to_string()));
        }
        let components = inner
            .items
            .iter()
            .map(|item| match item.bare_item.as_string() {
                Some(component) if item.params.is_empty() => Ok(component.as_str().to_string()),
                _ => Err(SfError::InvalidComponent(label.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let member = SignatureInputMember {
            label: label.to_string(),
            components,
            params: SignatureParams::from_parameters(label, &inner.params)?,
            signature_params_value: value.to_string(),
        };
        match members.iter_mut().find(|m| m.label == member.label) {
            Some(existing) => *existing = member,
            None => members.push(member),
        }
    }
    Ok(members)
}

/// Parses a `Signature` header into `label -> base64` pairs.
///
/// The base64 text is returned as it appeared on the wire; decoding it is
/// left to the caller so that a bad signature is reported per candidate.
pub fn parse_signature_dictionary(header: &str) -> Result<BTreeMap<String, String>, SfError> {
    let mut out = BTreeMap::new();
    for raw in split_members(header)? {
        let (label, value) = split_member(raw)?;
        let is_byte_sequence = matches!(
            parse_member(raw, label)?,
            ListEntry::Item(item) if matches!(item.bare_item, BareItem::ByteSequence(_))
        );
        let b64 = value
            .strip_prefix(':')
            .and_then(|rest| rest.split(':').next())
            .filter(|_| is_byte_sequence)
            .ok_or_else(|| SfError::InvalidByteSequence(label.to_string()))?;
        out.insert(label.to_string(), b64.to_string());
    }
    Ok(out)
}

/// Returns the labels of a dictionary header without interpreting member values.
pub fn dictionary_labels(header: &str) -> Result<Vec<String>, SfError> {
    split_members(header)?
        .into_iter()
        .map(|raw| split_member(raw).map(|(label, _)| label.to_string()))
        .collect()
}

/// Serializes an `sf-string`, escaping `\` and `"`.
///
/// Control and non-ASCII characters are a caller defect and fail hard.
pub fn serialize_string(value: &str) -> Result<String, SfError> {
    let string = StringRef::from_str(value).map_err(|e| SfError::InvalidString(e.to_string()))?;
    serialize_bare_item(string)
}

/// Serializes an inner list of strings: `("a" "b")`.
pub fn serialize_inner_list(items: &[String]) -> Result<String, SfError> {
    let quoted = items
        .iter()
        .map(|item| serialize_string(item))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("({})", quoted.join(" ")))
}

/// Serializes parameters; boolean `true` values render as a bare key.
pub fn serialize_parameters(params: &[(String, BareItem)]) -> Result<String, SfError> {
    let mut out = String::new();
    for (key, value) in params {
        if KeyRef::from_str(key).is_err() {
            return Err(SfError::InvalidParameter(key.clone()));
        }
        out.push(';');
        out.push_str(key);
        if !matches!(value, BareItem::Boolean(true)) {
            out.push('=');
            out.push_str(&serialize_bare_item(value.clone())?);
        }
    }
    Ok(out)
}

/// Serializes the signature-params inner list.
///
/// Parameter order is fixed (`created`, `expires`, `nonce`, `tag`, `keyid`)
/// because the resulting text is itself covered by the signature.
pub fn serialize_signature_params(
    components: &[String],
    params: &SignatureParams,
) -> Result<String, SfError> {
    let mut ordered: Parameters = vec![
        ("created".to_string(), integer_item("created", params.created)?),
        ("expires".to_string(), integer_item("expires", params.expires)?),
    ];
    if let Some(nonce) = &params.nonce {
        ordered.push(("nonce".to_string(), string_item(nonce)?));
    }
    if let Some(tag) = &params.tag {
        ordered.push(("tag".to_string(), string_item(tag)?));
    }
    ordered.push(("keyid".to_string(), string_item(&params.keyid)?));

    Ok(format!(
        "{}{}",
        serialize_inner_list(components)?,
        serialize_parameters(&ordered)?
    ))
}

/// Serializes `label=<value>` after checking the label.
pub fn serialize_dictionary_member(label: &str, value: &str) -> Result<String, SfError> {
    if !is_valid_label(label) {
        return Err(SfError::InvalidLabel(label.to_string()));
    }
    Ok(format!("{}={}", label, value))
}

/// Serializes a `Signature` member: `label=:<base64>:`.
pub fn serialize_signature_member(label: &str, signature: &[u8]) -> Result<String, SfError> {
    let value = serialize_bare_item(BareItem::ByteSequence(signature.to_vec()))?;
    serialize_dictionary_member(label, &value)
}

fn serialize_bare_item(item: impl Into<BareItem>) -> Result<String, SfError> {
    let serialized: Option<String> = ::sfv::Item::new(item).serialize_value().into();
    serialized.ok_or_else(|| SfError::InvalidParameter("unserializable item".to_string()))
}

fn integer_item(param: &'static str, value: i64) -> Result<BareItem, SfError> {
    ::sfv::Integer::try_from(value)
        .map(BareItem::Integer)
        .map_err(|_| SfError::InvalidParameter(format!("{}={}", param, value)))
}

fn string_item(value: &str) -> Result<BareItem, SfError> {
    StringRef::from_str(value)
        .map(BareItem::from)
        .map_err(|e| SfError::InvalidString(e.to_string()))
}

/// Parses one raw `label=value` member and returns its value.
fn parse_member(raw: &str, label: &str) -> Result<ListEntry, SfError> {
    let syntax = |message: String| SfError::Syntax {
        label: label.to_string(),
        message,
    };
    Parser::new(raw)
        .parse_dictionary()
        .map_err(|e| syntax(e.to_string()))?
        .into_iter()
        .next()
        .map(|(_, entry)| entry)
        .ok_or_else(|| syntax("empty member".to_string()))
}

fn trim_ows(s: &str) -> &str {
    s.trim_matches(|c| c == ' ' || c == '\t')
}

/// Splits a dictionary on top-level commas, ignoring commas inside strings.
///
/// Member text is kept raw: the `Signature-Input` value is signed as sent.
fn split_members(header: &str) -> Result<Vec<&str>, SfError> {
    let mut members = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, b) in header.bytes().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b',' => {
                members.push((start, idx));
                start = idx + 1;
            }
            _ => {}
        }
    }
    if in_string {
        return Err(SfError::Unterminated);
    }
    members.push((start, header.len()));

    members
        .into_iter()
        .map(|(from, to)| {
            let member = trim_ows(&header[from..to]);
            if member.is_empty() {
                Err(SfError::Unexpected {
                    input: header.to_string(),
                    offset: from,
                })
            } else {
                Ok(member)
            }
        })
        .collect()
}

fn split_member(member: &str) -> Result<(&str, &str), SfError> {
    let eq = member
        .find('=')
        .ok_or_else(|| SfError::MissingEquals(member.to_string()))?;
    let label = &member[..eq];
    if !is_valid_label(label) {
        return Err(SfError::InvalidLabel(label.to_string()));
    }
    Ok((label, &member[eq + 1..]))
}

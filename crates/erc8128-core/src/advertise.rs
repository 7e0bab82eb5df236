//! `Accept-Signature` advertisement.
//!
//! Lets a verifier tell a client which component sets it accepts, so a
//! rejected client can re-sign correctly.

use erc8128_canonical::sfv::{serialize_dictionary_member, serialize_inner_list, serialize_parameters};
use erc8128_canonical::{BareItem, SfError};
use std::collections::BTreeSet;

/// Builds an `Accept-Signature` value with one `sigN` member per acceptable
/// component set: the request-bound set first, then each class-bound policy.
///
/// Sets with identical membership are advertised once. Every member asks for
/// `keyid`, `created` and `expires`; `nonce` is added when replayable
/// signatures are not accepted.
pub fn accept_signature_header(
    request_bound: &[String],
    class_bound_policies: &[Vec<String>],
    replayable: bool,
) -> Result<String, SfError> {
    let mut wanted: Vec<(String, BareItem)> = ["keyid", "created", "expires"]
        .iter()
        .map(|key| (key.to_string(), BareItem::Boolean(true)))
        .collect();
    if !replayable {
        wanted.push(("nonce".to_string(), BareItem::Boolean(true)));
    }
    let params = serialize_parameters(&wanted)?;

    let mut seen: Vec<BTreeSet<&str>> = Vec::new();
    let mut members = Vec::new();
    for set in std::iter::once(request_bound).chain(class_bound_policies.iter().map(Vec::as_slice)) {
        let identity: BTreeSet<&str> = set.iter().map(String::as_str).collect();
        if seen.contains(&identity) {
            continue;
        }
        seen.push(identity);
        let label = format!("sig{}", members.len() + 1);
        let value = format!("{}{}", serialize_inner_list(set)?, params);
        members.push(serialize_dictionary_member(&label, &value)?);
    }
    Ok(members.join(", "))
}

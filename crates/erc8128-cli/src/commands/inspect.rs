//! Inspect command implementation.

use crate::output;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use erc8128_canonical::{parse_key_id, parse_signature_dictionary, parse_signature_input_dictionary};
use serde_json::{json, Value};
use tracing::debug;

pub fn run(
    signature_input: String,
    signature: String,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let members = parse_signature_input_dictionary(&signature_input)
        .map_err(|e| format!("Invalid Signature-Input: {}", e))?;
    let signatures = parse_signature_dictionary(&signature)
        .map_err(|e| format!("Invalid Signature: {}", e))?;
    debug!(
        "Parsed {} Signature-Input members and {} signatures",
        members.len(),
        signatures.len()
    );

    let candidates: Vec<Value> = members
        .iter()
        .map(|member| {
            let keyid = parse_key_id(&member.params.keyid);
            let signature_len = signatures
                .get(&member.label)
                .and_then(|b64| BASE64.decode(b64).ok())
                .map(|bytes| bytes.len());
            json!({
                "label": member.label,
                "components": member.components,
                "created": member.params.created,
                "expires": member.params.expires,
                "nonce": member.params.nonce,
                "tag": member.params.tag,
                "keyid": member.params.keyid,
                "keyid_valid": keyid.is_some(),
                "chain_id": keyid.map(|k| k.chain_id),
                "address": keyid.map(|k| k.address.to_string()),
                "has_signature": signatures.contains_key(&member.label),
                "signature_bytes": signature_len,
            })
        })
        .collect();

    if json {
        println!("{}", output::format_json(&Value::Array(candidates)));
    } else {
        output::print_table_header();
        for candidate in &candidates {
            println!("{}", output::format_table_row(candidate));
        }
    }

    Ok(())
}

//! Keyid command implementation.

use crate::output;
use erc8128_canonical::{format_key_id, parse_key_id, Address};
use serde_json::json;

pub fn format(chain_id: u64, address: String) -> Result<(), Box<dyn std::error::Error>> {
    let address =
        Address::parse(&address).map_err(|e| format!("Invalid address {}: {}", address, e))?;
    println!("{}", format_key_id(chain_id, &address));
    Ok(())
}

pub fn parse(value: String, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let keyid = parse_key_id(&value).ok_or_else(|| format!("Invalid key identifier: {}", value))?;

    if json {
        let out = json!({
            "chain_id": keyid.chain_id,
            "address": keyid.address.to_string(),
        });
        println!("{}", output::format_json(&out));
    } else {
        println!("chain_id: {}", keyid.chain_id);
        println!("address:  {}", keyid.address);
    }
    Ok(())
}

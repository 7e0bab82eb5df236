//! Digest command implementation.

use erc8128_canonical::ContentDigest;
use std::io::{self, Read};

pub fn run(input: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let body = match input {
        Some(path) => {
            std::fs::read(&path).map_err(|e| format!("Failed to read file {}: {}", path, e))?
        }
        None => {
            let mut buffer = Vec::new();
            io::stdin().read_to_end(&mut buffer)?;
            buffer
        }
    };

    println!("{}", ContentDigest::compute(&body).header_value());
    Ok(())
}

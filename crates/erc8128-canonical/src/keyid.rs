use crate::validation::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scheme tag prefixed to every key identifier.
pub const KEYID_SCHEME: &str = "erc8128";

static KEYID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^{}:(\d+):(0x[0-9a-fA-F]{{40}})$", KEYID_SCHEME)).expect("invalid regex")
});
static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("invalid regex"));

/// A 20-byte account address, displayed as lowercase `0x`-prefixed hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    /// Wraps raw address bytes.
    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Parses `0x` + 40 hex digits, in any case.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        if !ADDRESS_RE.is_match(value) {
            return Err(ValidationError::PatternMismatch {
                field: "address",
                value: value.to_string(),
            });
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(&value[2..], &mut bytes).map_err(|_| {
            ValidationError::PatternMismatch {
                field: "address",
                value: value.to_string(),
            }
        })?;
        Ok(Self(bytes))
    }

    /// Raw address bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

/// Parsed key identifier: which account on which chain produced a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyId {
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Signing account.
    pub address: Address,
}

impl KeyId {
    /// Creates a key identifier.
    pub fn new(chain_id: u64, address: Address) -> Self {
        Self { chain_id, address }
    }

    /// Parses `erc8128:<chainId>:<address>`; `None` on any mismatch.
    pub fn parse(value: &str) -> Option<Self> {
        parse_key_id(value)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", KEYID_SCHEME, self.chain_id, self.address)
    }
}

/// Formats a key identifier with the address lowercased.
pub fn format_key_id(chain_id: u64, address: &Address) -> String {
    KeyId::new(chain_id, *address).to_string()
}

/// Parses a key identifier.
///
/// Never fails loudly: malformed input, including a chain id that overflows
/// `u64`, yields `None`.
pub fn parse_key_id(value: &str) -> Option<KeyId> {
    let caps = KEYID_RE.captures(value)?;
    let chain_id = caps.get(1)?.as_str().parse::<u64>().ok()?;
    let address = Address::parse(caps.get(2)?.as_str()).ok()?;
    Some(KeyId { chain_id, address })
}

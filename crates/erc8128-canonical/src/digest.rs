use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest as Sha2Digest, Sha256};

use crate::validation::ValidationError;

/// Supported `Content-Digest` algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlg {
    /// SHA-256, the only algorithm signers emit and verifiers accept.
    #[serde(rename = "sha-256")]
    Sha256,
}

impl DigestAlg {
    /// Dictionary key used in the header.
    pub fn as_str(self) -> &'static str {
        match self {
            DigestAlg::Sha256 => "sha-256",
        }
    }
}

/// A `Content-Digest` value: algorithm plus raw digest bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDigest {
    /// Digest algorithm.
    pub alg: DigestAlg,
    /// Raw digest bytes.
    pub bytes: Vec<u8>,
}

impl ContentDigest {
    /// Computes the SHA-256 digest of `body`.
    pub fn compute(body: &[u8]) -> Self {
        Self {
            alg: DigestAlg::Sha256,
            bytes: Sha256::digest(body).to_vec(),
        }
    }

    /// Parses `<alg>=:<base64>:`.
    ///
    /// The algorithm name is matched case-insensitively. When the header lists
    /// several algorithms, the `sha-256` member is used.
    pub fn parse(header: &str) -> Result<Self, ValidationError> {
        let malformed = || ValidationError::PatternMismatch {
            field: "content-digest",
            value: header.to_string(),
        };

        let mut first_alg = None;
        for member in header.split(',') {
            let member = member.trim_matches(|c| c == ' ' || c == '\t');
            let Some((alg, value)) = member.split_once('=') else {
                // a bare key names an algorithm without a value
                if member.eq_ignore_ascii_case(DigestAlg::Sha256.as_str()) {
                    return Err(malformed());
                }
                first_alg.get_or_insert_with(|| member.to_string());
                continue;
            };
            if !alg.eq_ignore_ascii_case(DigestAlg::Sha256.as_str()) {
                first_alg.get_or_insert_with(|| alg.to_string());
                continue;
            }
            let b64 = value
                .strip_prefix(':')
                .and_then(|v| v.strip_suffix(':'))
                .ok_or_else(malformed)?;
            let bytes = BASE64.decode(b64).map_err(|_| malformed())?;
            if bytes.len() != 32 {
                return Err(malformed());
            }
            return Ok(Self {
                alg: DigestAlg::Sha256,
                bytes,
            });
        }
        Err(ValidationError::UnsupportedAlgorithm(
            first_alg.unwrap_or_default(),
        ))
    }

    /// Header value: `sha-256=:<base64>:`.
    pub fn header_value(&self) -> String {
        format!("{}=:{}:", self.alg.as_str(), BASE64.encode(&self.bytes))
    }

    /// Returns true when this digest matches `body`.
    pub fn matches(&self, body: &[u8]) -> bool {
        match self.alg {
            DigestAlg::Sha256 => Sha256::digest(body).as_slice() == self.bytes.as_slice(),
        }
    }
}

/// Checks a `Content-Digest` header value against `body`.
///
/// Parse failures and unsupported algorithms yield `false`.
pub fn verify_content_digest(header: &str, body: &[u8]) -> bool {
    ContentDigest::parse(header)
        .map(|digest| digest.matches(body))
        .unwrap_or(false)
}

//! Interfaces to the external collaborators the pipelines depend on.
//!
//! Key management, ECDSA/ERC-1271 checks and shared nonce storage live outside
//! this crate; they are reached only through these traits.

use async_trait::async_trait;
use erc8128_canonical::Address;

/// Boxed error returned by collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Produces signatures over signature bases.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Account the signatures belong to.
    fn address(&self) -> Address;

    /// Chain the account lives on.
    fn chain_id(&self) -> u64;

    /// Signs the exact signature-base bytes.
    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, BoxError>;
}

/// Input to [`MessageVerifier::verify_message`].
#[derive(Debug, Clone, Copy)]
pub struct VerifyMessageRequest<'a> {
    /// Claimed signing account.
    pub address: Address,
    /// Chain the account is claimed on.
    pub chain_id: u64,
    /// Signature-base bytes.
    pub message: &'a [u8],
    /// Decoded signature bytes.
    pub signature: &'a [u8],
}

impl VerifyMessageRequest<'_> {
    /// Message as `0x`-prefixed hex.
    pub fn message_hex(&self) -> String {
        format!("0x{}", hex::encode(self.message))
    }

    /// Signature as `0x`-prefixed hex.
    pub fn signature_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signature))
    }
}

/// Checks a signature against an account (EOA recovery, ERC-1271, ...).
///
/// `Ok(false)` means the signature is definitely not valid; `Err` means the
/// check itself could not be completed.
#[async_trait]
pub trait MessageVerifier: Send + Sync {
    /// Returns whether `request.signature` is valid for `request.message`.
    async fn verify_message(&self, request: VerifyMessageRequest<'_>) -> Result<bool, BoxError>;
}

/// Single-use reservation of nonce keys.
///
/// `consume` must be an atomic check-and-set: among concurrent callers using
/// the same key, exactly one observes `Ok(true)` while the reservation lives.
/// `Err` means the store could not answer; the request is rejected and no
/// reservation may be assumed.
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Reserves `key` for `ttl_seconds`; `Ok(false)` if it is already reserved.
    async fn consume(&self, key: &str, ttl_seconds: u64) -> Result<bool, BoxError>;
}

//! Signer options and verifier policy.
//!
//! [`VerifyPolicy`] is plain configuration and deserializes from JSON or TOML
//! with every field optional. [`SignOptions`] may carry a nonce generator and
//! is therefore built in code.

use erc8128_canonical::Binding;
use serde::{Deserialize, Serialize};

use crate::nonce::NonceSource;
use crate::request::DigestMode;

/// Default `Signature-Input`/`Signature` label.
pub const DEFAULT_LABEL: &str = "eth";
/// Default signature lifetime for signers.
pub const DEFAULT_TTL_SECONDS: i64 = 60;
/// Default longest validity window a verifier accepts.
pub const DEFAULT_MAX_VALIDITY_SECONDS: i64 = 300;
/// Default cap on signature candidates checked per request.
pub const DEFAULT_MAX_SIGNATURE_VERIFICATIONS: usize = 3;

/// Whether a signature may be presented more than once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Replay {
    /// Carries a nonce and is accepted once.
    #[default]
    NonReplayable,
    /// Carries no nonce; reusable until it expires.
    Replayable,
}

/// How signing writes headers onto a request that may already carry some.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeaderMode {
    /// Replace any existing `Signature-Input`/`Signature` headers.
    #[default]
    Replace,
    /// Add a new dictionary member next to existing signatures.
    Append,
}

/// Options for [`sign_request`](crate::sign_request).
#[derive(Debug, Clone)]
pub struct SignOptions {
    /// Dictionary label for the new signature.
    pub label: String,
    /// Binding mode.
    pub binding: Binding,
    /// Replay mode.
    pub replay: Replay,
    /// Creation time; defaults to now.
    pub created: Option<i64>,
    /// Expiry time; defaults to `created + ttl_seconds`.
    pub expires: Option<i64>,
    /// Lifetime used when `expires` is not set.
    pub ttl_seconds: i64,
    /// Nonce source for non-replayable signatures.
    pub nonce: NonceSource,
    /// Optional `tag` parameter.
    pub tag: Option<String>,
    /// Extra (request-bound) or mandatory (class-bound) components.
    pub components: Option<Vec<String>>,
    /// How `Content-Digest` is produced when covered.
    pub content_digest: DigestMode,
    /// Replace or append signature headers.
    pub header_mode: HeaderMode,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            binding: Binding::RequestBound,
            replay: Replay::NonReplayable,
            created: None,
            expires: None,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            nonce: NonceSource::Random,
            tag: None,
            components: None,
            content_digest: DigestMode::Auto,
            header_mode: HeaderMode::Replace,
        }
    }
}

impl SignOptions {
    /// Sets the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the binding mode.
    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.binding = binding;
        self
    }

    /// Sets the replay mode.
    pub fn with_replay(mut self, replay: Replay) -> Self {
        self.replay = replay;
        self
    }

    /// Pins `created` and `expires`.
    pub fn with_validity(mut self, created: i64, expires: i64) -> Self {
        self.created = Some(created);
        self.expires = Some(expires);
        self
    }

    /// Sets the nonce source.
    pub fn with_nonce(mut self, nonce: NonceSource) -> Self {
        self.nonce = nonce;
        self
    }

    /// Sets the covered components.
    pub fn with_components<I, S>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.components = Some(components.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the header mode.
    pub fn with_header_mode(mut self, header_mode: HeaderMode) -> Self {
        self.header_mode = header_mode;
        self
    }
}

/// Verifier policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyPolicy {
    /// Preferred label.
    pub label: Option<String>,
    /// Only consider the preferred label.
    pub strict_label: bool,
    /// Components every request-bound signature must cover on top of the
    /// request-shape defaults.
    pub additional_request_bound_components: Vec<String>,
    /// Accepted class-bound component sets; `@authority` is implied.
    pub class_bound_policies: Vec<Vec<String>>,
    /// Accept signatures without a nonce.
    pub replayable: bool,
    /// Longest accepted `expires - created`.
    pub max_validity_sec: i64,
    /// Tolerated clock skew in seconds.
    pub clock_skew_sec: i64,
    /// Longest accepted `expires - created` for nonce-carrying signatures.
    pub max_nonce_window_sec: Option<i64>,
    /// Cap on signature candidates checked per request.
    pub max_signature_verifications: usize,
}

impl Default for VerifyPolicy {
    fn default() -> Self {
        Self {
            label: None,
            strict_label: false,
            additional_request_bound_components: Vec::new(),
            class_bound_policies: Vec::new(),
            replayable: false,
            max_validity_sec: DEFAULT_MAX_VALIDITY_SECONDS,
            clock_skew_sec: 0,
            max_nonce_window_sec: None,
            max_signature_verifications: DEFAULT_MAX_SIGNATURE_VERIFICATIONS,
        }
    }
}

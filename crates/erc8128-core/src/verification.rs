//! Request verification.
//!
//! [`RequestVerifier::verify`] walks a fixed sequence of stages: header
//! presence, parsing and candidate selection, key identifier checks, binding
//! classification, attempt ordering, then per-attempt time, nonce, digest and
//! signature checks. Nothing in that walk panics or returns a hard error;
//! every rejection is a [`VerifyFailure`].

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use erc8128_canonical::components::{AUTHORITY, CONTENT_DIGEST};
use erc8128_canonical::digest::verify_content_digest as digest_matches;
use erc8128_canonical::sfv::is_valid_label;
use erc8128_canonical::{
    includes_all_components, normalize_class_bound_policies, normalize_components,
    parse_key_id, parse_signature_dictionary, parse_signature_input_dictionary,
    required_request_bound_components, Binding, KeyId, SignatureInputMember,
};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::advertise::accept_signature_header;
use crate::base::build_signature_base;
use crate::collaborators::{MessageVerifier, NonceStore, VerifyMessageRequest};
use crate::errors::ProtocolError;
use crate::nonce::{default_nonce_key, NonceKeyFn};
use crate::outcome::{FailureReason, VerifiedRequest, VerifyFailure};
use crate::policy::VerifyPolicy;
use crate::request::{
    self, SignableRequest, CONTENT_DIGEST_HEADER, SIGNATURE_HEADER, SIGNATURE_INPUT_HEADER,
};

/// A `Signature-Input` member paired with its `Signature` entry.
struct Candidate {
    member: SignatureInputMember,
    signature_b64: String,
}

/// A candidate that passed classification, ready to be checked.
struct Attempt<'a> {
    candidate: &'a Candidate,
    keyid: KeyId,
    binding: Binding,
    policy_len: usize,
    position: usize,
}

/// Deferred nonce consumption, run only after the signature checks out.
struct ReplayPlan<'a> {
    store: &'a dyn NonceStore,
    key: String,
    ttl_seconds: u64,
}

/// Verifies signed requests against a fixed policy.
///
/// Construct once and share; verification itself takes `&self`.
pub struct RequestVerifier {
    verifier: Arc<dyn MessageVerifier>,
    nonce_store: Option<Arc<dyn NonceStore>>,
    nonce_key: NonceKeyFn,
    policy: VerifyPolicy,
    extra_components: Vec<String>,
    class_policies: Vec<Vec<String>>,
}

impl fmt::Debug for RequestVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestVerifier")
            .field("policy", &self.policy)
            .field("has_nonce_store", &self.nonce_store.is_some())
            .finish()
    }
}

impl RequestVerifier {
    /// Creates a verifier after validating and normalizing `policy`.
    pub fn new(
        verifier: Arc<dyn MessageVerifier>,
        policy: VerifyPolicy,
    ) -> Result<Self, ProtocolError> {
        if policy.max_signature_verifications == 0 {
            return Err(ProtocolError::InvalidOptions(
                "max_signature_verifications must be at least 1".to_string(),
            ));
        }
        if policy.max_validity_sec <= 0 {
            return Err(ProtocolError::InvalidOptions(
                "max_validity_sec must be positive".to_string(),
            ));
        }
        if policy.clock_skew_sec < 0 {
            return Err(ProtocolError::InvalidOptions(
                "clock_skew_sec must not be negative".to_string(),
            ));
        }
        if matches!(policy.max_nonce_window_sec, Some(window) if window < 0) {
            return Err(ProtocolError::InvalidOptions(
                "max_nonce_window_sec must not be negative".to_string(),
            ));
        }
        if let Some(label) = &policy.label {
            if !is_valid_label(label) {
                return Err(ProtocolError::InvalidOptions(format!(
                    "invalid label '{}'",
                    label
                )));
            }
        }
        let extra_components = normalize_components(&policy.additional_request_bound_components)?;
        let class_policies = normalize_class_bound_policies(&policy.class_bound_policies)?;
        Ok(Self {
            verifier,
            nonce_store: None,
            nonce_key: Arc::new(default_nonce_key),
            policy,
            extra_components,
            class_policies,
        })
    }

    /// Attaches the store used to consume nonces.
    pub fn with_nonce_store(mut self, store: Arc<dyn NonceStore>) -> Self {
        self.nonce_store = Some(store);
        self
    }

    /// Replaces the `(keyid, nonce) -> key` derivation.
    pub fn with_nonce_key(mut self, nonce_key: NonceKeyFn) -> Self {
        self.nonce_key = nonce_key;
        self
    }

    /// The policy this verifier enforces.
    pub fn policy(&self) -> &VerifyPolicy {
        &self.policy
    }

    /// Verifies `request` as of the current time.
    pub async fn verify(&self, request: &SignableRequest) -> Result<VerifiedRequest, VerifyFailure> {
        self.verify_at(request, Utc::now().timestamp()).await
    }

    /// Verifies `request` as of `now` (unix seconds).
    pub async fn verify_at(
        &self,
        request: &SignableRequest,
        now: i64,
    ) -> Result<VerifiedRequest, VerifyFailure> {
        let candidates = self.select_candidates(request)?;
        let attempts = self.build_attempts(request, &candidates)?;
        debug!(
            "Checking up to {} of {} signature attempts",
            self.policy.max_signature_verifications,
            attempts.len()
        );

        let mut last_failure = VerifyFailure::new(FailureReason::NotRequestBound);
        for attempt in attempts.iter().take(self.policy.max_signature_verifications) {
            match self.check_attempt(request, attempt, now).await {
                Ok(verified) => {
                    debug!(
                        "Verified '{}' signature from {} on chain {}",
                        verified.label, verified.address, verified.chain_id
                    );
                    return Ok(verified);
                }
                Err(failure) => {
                    debug!(
                        "Signature '{}' rejected: {}",
                        attempt.candidate.member.label, failure
                    );
                    last_failure = failure;
                }
            }
        }
        Err(last_failure)
    }

    /// `Accept-Signature` value describing what this verifier accepts for
    /// a request shaped like `request`.
    pub fn accept_signature(&self, request: &SignableRequest) -> Result<String, ProtocolError> {
        let request_bound = required_request_bound_components(
            request::has_query(request),
            request::has_body(request),
            &self.extra_components,
        );
        Ok(accept_signature_header(
            &request_bound,
            &self.class_policies,
            self.policy.replayable,
        )?)
    }

    fn select_candidates(&self, request: &SignableRequest) -> Result<Vec<Candidate>, VerifyFailure> {
        let input_header = header_text(request, SIGNATURE_INPUT_HEADER)?;
        let signature_header = header_text(request, SIGNATURE_HEADER)?;
        let (input_header, signature_header) = match (input_header, signature_header) {
            (Some(input), Some(signature)) => (input, signature),
            _ => return Err(VerifyFailure::new(FailureReason::MissingHeaders)),
        };

        let members = parse_signature_input_dictionary(&input_header).map_err(|e| {
            VerifyFailure::with_detail(FailureReason::BadSignatureInput, e.to_string())
        })?;
        let mut signatures: BTreeMap<String, String> = parse_signature_dictionary(&signature_header)
            .map_err(|e| {
                VerifyFailure::with_detail(FailureReason::BadSignatureInput, e.to_string())
            })?;

        let mut candidates: Vec<Candidate> = members
            .into_iter()
            .filter_map(|member| {
                signatures.remove(&member.label).map(|signature_b64| Candidate {
                    member,
                    signature_b64,
                })
            })
            .collect();

        if let Some(label) = &self.policy.label {
            if self.policy.strict_label {
                candidates.retain(|c| &c.member.label == label);
            } else {
                // stable: preferred label first, header order otherwise
                candidates.sort_by_key(|c| &c.member.label != label);
            }
        }
        if candidates.is_empty() {
            return Err(VerifyFailure::with_detail(
                FailureReason::LabelNotFound,
                "no signature matches a Signature-Input label",
            ));
        }
        debug!("Found {} signature candidates", candidates.len());
        Ok(candidates)
    }

    fn build_attempts<'a>(
        &self,
        request: &SignableRequest,
        candidates: &'a [Candidate],
    ) -> Result<Vec<Attempt<'a>>, VerifyFailure> {
        let keyed: Vec<(usize, &Candidate, KeyId)> = candidates
            .iter()
            .enumerate()
            .filter_map(|(position, candidate)| {
                parse_key_id(&candidate.member.params.keyid).map(|keyid| (position, candidate, keyid))
            })
            .collect();
        if keyed.is_empty() {
            return Err(VerifyFailure::new(FailureReason::BadKeyid));
        }

        let required = required_request_bound_components(
            request::has_query(request),
            request::has_body(request),
            &self.extra_components,
        );
        let mut saw_class_shape = false;
        let mut attempts = Vec::with_capacity(keyed.len());
        for (position, candidate, keyid) in keyed {
            let covered = &candidate.member.components;
            if includes_all_components(&required, covered) {
                attempts.push(Attempt {
                    candidate,
                    keyid,
                    binding: Binding::RequestBound,
                    policy_len: 0,
                    position,
                });
                continue;
            }
            let shortest = self
                .class_policies
                .iter()
                .filter(|policy| includes_all_components(policy, covered))
                .map(Vec::len)
                .min();
            match shortest {
                Some(policy_len) => attempts.push(Attempt {
                    candidate,
                    keyid,
                    binding: Binding::ClassBound,
                    policy_len,
                    position,
                }),
                None => {
                    if covered.iter().any(|c| c == AUTHORITY) {
                        saw_class_shape = true;
                    }
                }
            }
        }

        if attempts.is_empty() {
            if saw_class_shape && !self.class_policies.is_empty() {
                return Err(VerifyFailure::new(FailureReason::ClassBoundNotAllowed));
            }
            return Err(VerifyFailure::with_detail(
                FailureReason::NotRequestBound,
                format!("signatures must cover {}", required.join(" ")),
            ));
        }

        attempts.sort_by_key(|a| (a.binding != Binding::RequestBound, a.policy_len, a.position));
        Ok(attempts)
    }

    async fn check_attempt(
        &self,
        request: &SignableRequest,
        attempt: &Attempt<'_>,
        now: i64,
    ) -> Result<VerifiedRequest, VerifyFailure> {
        let member = &attempt.candidate.member;
        let params = &member.params;

        self.check_time(params.created, params.expires, now)?;
        let replay_plan = self.plan_replay(attempt, now)?;

        if member.components.iter().any(|c| c == CONTENT_DIGEST) {
            match request::combined_header(request, CONTENT_DIGEST_HEADER) {
                Ok(None) => return Err(VerifyFailure::new(FailureReason::DigestRequired)),
                Ok(Some(header)) if digest_matches(&header, request.body()) => {}
                _ => return Err(VerifyFailure::new(FailureReason::DigestMismatch)),
            }
        }

        let base =
            build_signature_base(request, &member.components, &member.signature_params_value)
                .map_err(|e| {
                    VerifyFailure::with_detail(FailureReason::BadSignatureInput, e.to_string())
                })?;
        let signature = BASE64
            .decode(&attempt.candidate.signature_b64)
            .map_err(|e| {
                VerifyFailure::with_detail(FailureReason::BadSignatureBytes, e.to_string())
            })?;
        if signature.is_empty() {
            return Err(VerifyFailure::with_detail(
                FailureReason::BadSignatureBytes,
                "empty signature",
            ));
        }

        let outcome = self
            .verifier
            .verify_message(VerifyMessageRequest {
                address: attempt.keyid.address,
                chain_id: attempt.keyid.chain_id,
                message: &base,
                signature: &signature,
            })
            .await;
        match outcome {
            Ok(true) => {}
            Ok(false) => return Err(VerifyFailure::new(FailureReason::BadSignature)),
            Err(e) => {
                warn!("Message verifier failed for {}: {}", attempt.keyid, e);
                return Err(VerifyFailure::with_detail(
                    FailureReason::BadSignatureCheck,
                    e.to_string(),
                ));
            }
        }

        if let Some(plan) = replay_plan {
            match plan.store.consume(&plan.key, plan.ttl_seconds).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!("Replayed nonce for {}", attempt.keyid);
                    return Err(VerifyFailure::new(FailureReason::Replay));
                }
                Err(e) => {
                    warn!("Nonce store failed for {}: {}", attempt.keyid, e);
                    return Err(VerifyFailure::with_detail(
                        FailureReason::NonceStoreUnavailable,
                        e.to_string(),
                    ));
                }
            }
        }

        Ok(VerifiedRequest {
            address: attempt.keyid.address,
            chain_id: attempt.keyid.chain_id,
            label: member.label.clone(),
            components: member.components.clone(),
            params: params.clone(),
            replayable: params.nonce.is_none(),
            binding: attempt.binding,
        })
    }

    fn check_time(&self, created: i64, expires: i64, now: i64) -> Result<(), VerifyFailure> {
        let skew = self.policy.clock_skew_sec;
        if expires <= created {
            return Err(VerifyFailure::new(FailureReason::BadTime));
        }
        if now.saturating_add(skew) < created {
            return Err(VerifyFailure::new(FailureReason::NotYetValid));
        }
        if now.saturating_sub(skew) > expires {
            return Err(VerifyFailure::new(FailureReason::Expired));
        }
        if expires.saturating_sub(created) > self.policy.max_validity_sec {
            return Err(VerifyFailure::new(FailureReason::ValidityTooLong));
        }
        Ok(())
    }

    fn plan_replay<'s>(
        &'s self,
        attempt: &Attempt<'_>,
        now: i64,
    ) -> Result<Option<ReplayPlan<'s>>, VerifyFailure> {
        let params = &attempt.candidate.member.params;
        let nonce = match &params.nonce {
            None if self.policy.replayable => return Ok(None),
            None => return Err(VerifyFailure::new(FailureReason::ReplayableNotAllowed)),
            Some(nonce) => nonce,
        };
        let store = self
            .nonce_store
            .as_deref()
            .ok_or_else(|| VerifyFailure::new(FailureReason::NonceRequired))?;
        if let Some(window) = self.policy.max_nonce_window_sec {
            if params.validity_seconds() > window {
                return Err(VerifyFailure::new(FailureReason::NonceWindowTooLong));
            }
        }
        let ttl_seconds = u64::try_from(params.expires.saturating_sub(now)).unwrap_or(0);
        Ok(Some(ReplayPlan {
            store,
            key: (self.nonce_key)(params.keyid.as_str(), nonce.as_str()),
            ttl_seconds,
        }))
    }
}

/// Combined header text; undecodable values count as malformed input.
fn header_text(request: &SignableRequest, name: &str) -> Result<Option<String>, VerifyFailure> {
    request::combined_header(request, name)
        .map_err(|e| VerifyFailure::with_detail(FailureReason::BadSignatureInput, e.to_string()))
}

//! Verification pipeline tests against keyed-hash stand-in collaborators.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use erc8128_canonical::ContentDigest;
use erc8128_core::{
    sign_request_at, Address, Binding, BoxError, ErrorCode, FailureReason, MemoryNonceStore,
    MessageVerifier, NonceKeyFn, NonceSource, NonceStore, Replay, RequestVerifier, SignOptions,
    SignableRequest, Signer, VerifyMessageRequest, VerifyPolicy,
};
use http::header::HeaderValue;
use http::Request;
use sha2::{Digest, Sha256};
use std::sync::Arc;

const CREATED: i64 = 1_700_000_000;
const EXPIRES: i64 = 1_700_000_060;
const ALICE: &str = "0x1111111111111111111111111111111111111111";
const BOB: &str = "0x2222222222222222222222222222222222222222";

fn keyed_hash(address: &Address, message: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(address.as_bytes());
    hasher.update(message);
    hasher.finalize().to_vec()
}

struct HashSigner {
    address: Address,
    forge: bool,
}

#[async_trait]
impl Signer for HashSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn chain_id(&self) -> u64 {
        1
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, BoxError> {
        let mut signature = keyed_hash(&self.address, message);
        if self.forge {
            signature[0] ^= 0xff;
        }
        Ok(signature)
    }
}

struct HashVerifier;

#[async_trait]
impl MessageVerifier for HashVerifier {
    async fn verify_message(&self, request: VerifyMessageRequest<'_>) -> Result<bool, BoxError> {
        Ok(keyed_hash(&request.address, request.message) == request.signature)
    }
}

struct BrokenVerifier;

#[async_trait]
impl MessageVerifier for BrokenVerifier {
    async fn verify_message(&self, _request: VerifyMessageRequest<'_>) -> Result<bool, BoxError> {
        Err("rpc endpoint unavailable".into())
    }
}

struct UnreachableNonceStore;

#[async_trait]
impl NonceStore for UnreachableNonceStore {
    async fn consume(&self, _key: &str, _ttl_seconds: u64) -> Result<bool, BoxError> {
        Err("cache unreachable".into())
    }
}

fn make_signer(address: &str) -> HashSigner {
    HashSigner {
        address: Address::parse(address).unwrap(),
        forge: false,
    }
}

fn make_forger(address: &str) -> HashSigner {
    HashSigner {
        address: Address::parse(address).unwrap(),
        forge: true,
    }
}

fn make_order_request() -> SignableRequest {
    Request::builder()
        .method("POST")
        .uri("https://api.example.com/orders")
        .header("content-type", "application/json")
        .body(br#"{"amount":"100"}"#.to_vec())
        .unwrap()
}

fn make_get_request(uri: &str) -> SignableRequest {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-client", "cli")
        .body(Vec::new())
        .unwrap()
}

fn make_options() -> SignOptions {
    SignOptions::default().with_validity(CREATED, EXPIRES)
}

fn make_verifier(policy: VerifyPolicy) -> RequestVerifier {
    RequestVerifier::new(Arc::new(HashVerifier), policy)
        .unwrap()
        .with_nonce_store(Arc::new(MemoryNonceStore::new()))
}

fn set_header(request: &mut SignableRequest, name: &'static str, value: &str) {
    request
        .headers_mut()
        .insert(name, HeaderValue::from_str(value).unwrap());
}

async fn sign(request: &SignableRequest, options: &SignOptions) -> SignableRequest {
    sign_request_at(request, &make_signer(ALICE), options, CREATED)
        .await
        .unwrap()
}

fn reason<T: std::fmt::Debug>(result: Result<T, erc8128_core::VerifyFailure>) -> FailureReason {
    result.unwrap_err().reason
}

#[tokio::test]
async fn test_order_scenario_end_to_end() {
    let options = make_options().with_nonce(NonceSource::Explicit("n1".to_string()));
    let signed = sign(&make_order_request(), &options).await;

    assert_eq!(
        signed.headers()["signature-input"],
        r#"eth=("@authority" "@method" "@path" "content-digest");created=1700000000;expires=1700000060;nonce="n1";keyid="erc8128:1:0x1111111111111111111111111111111111111111""#
    );
    let expected_digest = ContentDigest::compute(br#"{"amount":"100"}"#).header_value();
    assert_eq!(signed.headers()["content-digest"], expected_digest.as_str());

    let verified = make_verifier(VerifyPolicy::default())
        .verify_at(&signed, CREATED)
        .await
        .unwrap();
    assert_eq!(verified.address, Address::parse(ALICE).unwrap());
    assert_eq!(verified.chain_id, 1);
    assert_eq!(verified.label, "eth");
    assert_eq!(verified.binding, Binding::RequestBound);
    assert!(!verified.replayable);
    assert_eq!(verified.params.nonce.as_deref(), Some("n1"));

    let json = serde_json::to_value(&verified).unwrap();
    assert_eq!(json["binding"], "request-bound");
    assert_eq!(json["chainId"], 1);
    assert_eq!(json["address"], ALICE);
}

#[tokio::test]
async fn test_second_presentation_is_replay() {
    let signed = sign(&make_order_request(), &make_options()).await;
    let verifier = make_verifier(VerifyPolicy::default());

    assert!(verifier.verify_at(&signed, CREATED).await.is_ok());
    assert_eq!(
        reason(verifier.verify_at(&signed, CREATED).await),
        FailureReason::Replay
    );
}

#[tokio::test]
async fn test_concurrent_presentations_have_one_winner() {
    let signed = sign(&make_order_request(), &make_options()).await;
    let verifier = make_verifier(VerifyPolicy::default());

    let (first, second) = tokio::join!(
        verifier.verify_at(&signed, CREATED),
        verifier.verify_at(&signed, CREATED)
    );
    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|o| matches!(o, Err(f) if f.reason == FailureReason::Replay)));
}

#[tokio::test]
async fn test_time_window_boundaries() {
    let signed = sign(&make_get_request("https://api.example.com/"), &make_options()).await;

    let verifier = make_verifier(VerifyPolicy::default());
    assert_eq!(
        reason(verifier.verify_at(&signed, CREATED - 1).await),
        FailureReason::NotYetValid
    );
    assert_eq!(
        reason(verifier.verify_at(&signed, EXPIRES + 1).await),
        FailureReason::Expired
    );

    for now in [CREATED, CREATED + 30, EXPIRES] {
        let verifier = make_verifier(VerifyPolicy::default());
        assert!(verifier.verify_at(&signed, now).await.is_ok(), "now = {}", now);
    }

    let skewed = make_verifier(VerifyPolicy {
        clock_skew_sec: 5,
        ..VerifyPolicy::default()
    });
    assert!(skewed.verify_at(&signed, CREATED - 5).await.is_ok());
}

#[tokio::test]
async fn test_validity_longer_than_policy_is_rejected() {
    let options = SignOptions::default().with_validity(CREATED, CREATED + 301);
    let signed = sign(&make_get_request("https://api.example.com/"), &options).await;

    let verifier = make_verifier(VerifyPolicy::default());
    assert_eq!(
        reason(verifier.verify_at(&signed, CREATED).await),
        FailureReason::ValidityTooLong
    );
}

#[tokio::test]
async fn test_expires_not_after_created_is_bad_time() {
    let mut request = make_get_request("https://api.example.com/");
    set_header(
        &mut request,
        "signature-input",
        r#"eth=("@authority" "@method" "@path");created=100;expires=100;nonce="x";keyid="erc8128:1:0x1111111111111111111111111111111111111111""#,
    );
    set_header(&mut request, "signature", "eth=:AAAA:");

    let verifier = make_verifier(VerifyPolicy::default());
    assert_eq!(
        reason(verifier.verify_at(&request, 100).await),
        FailureReason::BadTime
    );
}

#[tokio::test]
async fn test_replayable_signatures_need_policy_opt_in() {
    let options = make_options().with_replay(Replay::Replayable);
    let signed = sign(&make_get_request("https://api.example.com/"), &options).await;
    assert!(!signed.headers()["signature-input"]
        .to_str()
        .unwrap()
        .contains("nonce"));

    let strict = make_verifier(VerifyPolicy::default());
    assert_eq!(
        reason(strict.verify_at(&signed, CREATED).await),
        FailureReason::ReplayableNotAllowed
    );

    let lenient = make_verifier(VerifyPolicy {
        replayable: true,
        ..VerifyPolicy::default()
    });
    let verified = lenient.verify_at(&signed, CREATED).await.unwrap();
    assert!(verified.replayable);
    assert!(lenient.verify_at(&signed, CREATED + 1).await.is_ok());
}

#[tokio::test]
async fn test_nonce_requires_store_and_window() {
    let signed = sign(&make_get_request("https://api.example.com/"), &make_options()).await;

    let storeless = RequestVerifier::new(Arc::new(HashVerifier), VerifyPolicy::default()).unwrap();
    assert_eq!(
        reason(storeless.verify_at(&signed, CREATED).await),
        FailureReason::NonceRequired
    );

    let windowed = make_verifier(VerifyPolicy {
        max_nonce_window_sec: Some(30),
        ..VerifyPolicy::default()
    });
    assert_eq!(
        reason(windowed.verify_at(&signed, CREATED).await),
        FailureReason::NonceWindowTooLong
    );
}

#[tokio::test]
async fn test_query_must_be_covered_for_request_binding() {
    let request = make_get_request("https://api.example.com/search?q=rust");

    let without_query = make_options()
        .with_binding(Binding::ClassBound)
        .with_components(["@method", "@path"]);
    let signed = sign(&request, &without_query).await;
    let verifier = make_verifier(VerifyPolicy::default());
    assert_eq!(
        reason(verifier.verify_at(&signed, CREATED).await),
        FailureReason::NotRequestBound
    );

    let with_query = make_options()
        .with_binding(Binding::ClassBound)
        .with_components(["@method", "@path", "@query"]);
    let signed = sign(&request, &with_query).await;
    let verified = verifier.verify_at(&signed, CREATED).await.unwrap();
    assert_eq!(verified.binding, Binding::RequestBound);
}

#[tokio::test]
async fn test_body_tampering_is_detected() {
    let signed = sign(&make_order_request(), &make_options()).await;
    let verifier = make_verifier(VerifyPolicy::default());

    let mut tampered = erc8128_core::request::clone_request(&signed);
    *tampered.body_mut() = br#"{"amount":"900"}"#.to_vec();
    assert_eq!(
        reason(verifier.verify_at(&tampered, CREATED).await),
        FailureReason::DigestMismatch
    );

    let mut stripped = erc8128_core::request::clone_request(&signed);
    stripped.headers_mut().remove("content-digest");
    assert_eq!(
        reason(verifier.verify_at(&stripped, CREATED).await),
        FailureReason::DigestRequired
    );

    assert!(verifier.verify_at(&signed, CREATED).await.is_ok());
}

#[tokio::test]
async fn test_malformed_headers_are_reported_not_raised() {
    let verifier = make_verifier(VerifyPolicy::default());

    let mut request = make_get_request("https://api.example.com/");
    set_header(&mut request, "signature-input", "not-a-dictionary");
    set_header(&mut request, "signature", "eth=:AAAA:");
    let failure = verifier.verify_at(&request, CREATED).await.unwrap_err();
    assert_eq!(failure.reason, FailureReason::BadSignatureInput);
    assert!(failure.detail.is_some());
    assert_eq!(failure.reason.http_status(), 400);

    let mut request = make_get_request("https://api.example.com/");
    set_header(&mut request, "signature-input", r#"eth=("@path";created=1"#);
    set_header(&mut request, "signature", "eth=:!!:");
    assert_eq!(
        reason(verifier.verify_at(&request, CREATED).await),
        FailureReason::BadSignatureInput
    );

    let request = make_get_request("https://api.example.com/");
    assert_eq!(
        reason(verifier.verify_at(&request, CREATED).await),
        FailureReason::MissingHeaders
    );
}

#[tokio::test]
async fn test_unparsable_keyid_is_rejected() {
    let mut request = make_get_request("https://api.example.com/");
    set_header(
        &mut request,
        "signature-input",
        r#"eth=("@authority" "@method" "@path");created=1;expires=2;keyid="eip155:1:0x1111111111111111111111111111111111111111""#,
    );
    set_header(&mut request, "signature", "eth=:AAAA:");

    let verifier = make_verifier(VerifyPolicy::default());
    assert_eq!(
        reason(verifier.verify_at(&request, 1).await),
        FailureReason::BadKeyid
    );
}

#[tokio::test]
async fn test_signature_failures_are_distinguished() {
    let signed = sign(&make_get_request("https://api.example.com/"), &make_options()).await;
    let verifier = make_verifier(VerifyPolicy::default());

    let mut zeroed = erc8128_core::request::clone_request(&signed);
    let zeros = format!("eth=:{}:", BASE64.encode([0u8; 32]));
    set_header(&mut zeroed, "signature", &zeros);
    assert_eq!(
        reason(verifier.verify_at(&zeroed, CREATED).await),
        FailureReason::BadSignature
    );

    let mut undecodable = erc8128_core::request::clone_request(&signed);
    set_header(&mut undecodable, "signature", "eth=::");
    assert_eq!(
        reason(verifier.verify_at(&undecodable, CREATED).await),
        FailureReason::BadSignatureBytes
    );
}

#[tokio::test]
async fn test_verifier_error_does_not_burn_nonce() {
    let signed = sign(&make_get_request("https://api.example.com/"), &make_options()).await;
    let store = Arc::new(MemoryNonceStore::new());

    let broken = RequestVerifier::new(Arc::new(BrokenVerifier), VerifyPolicy::default())
        .unwrap()
        .with_nonce_store(store.clone());
    let failure = broken.verify_at(&signed, CREATED).await.unwrap_err();
    assert_eq!(failure.reason, FailureReason::BadSignatureCheck);
    assert_eq!(failure.detail.as_deref(), Some("rpc endpoint unavailable"));
    assert!(store.is_empty());

    let working = RequestVerifier::new(Arc::new(HashVerifier), VerifyPolicy::default())
        .unwrap()
        .with_nonce_store(store.clone());
    assert!(working.verify_at(&signed, CREATED).await.is_ok());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_nonce_store_outage_is_not_reported_as_replay() {
    let signed = sign(&make_get_request("https://api.example.com/"), &make_options()).await;
    let verifier = RequestVerifier::new(Arc::new(HashVerifier), VerifyPolicy::default())
        .unwrap()
        .with_nonce_store(Arc::new(UnreachableNonceStore));

    let failure = verifier.verify_at(&signed, CREATED).await.unwrap_err();
    assert_eq!(failure.reason, FailureReason::NonceStoreUnavailable);
    assert_eq!(failure.detail.as_deref(), Some("cache unreachable"));

    let forged = sign_request_at(
        &make_get_request("https://api.example.com/"),
        &make_forger(ALICE),
        &make_options(),
        CREATED,
    )
    .await
    .unwrap();
    assert_eq!(
        reason(verifier.verify_at(&forged, CREATED).await),
        FailureReason::BadSignature
    );
}

#[tokio::test]
async fn test_request_bound_signature_is_tried_before_class_bound() {
    let request = make_get_request("https://api.example.com/items");
    let class_bound = make_options()
        .with_label("cls")
        .with_binding(Binding::ClassBound)
        .with_components(["@path"]);
    let signed = sign(&request, &class_bound).await;
    let signed = sign(
        &signed,
        &make_options().with_header_mode(erc8128_core::HeaderMode::Append),
    )
    .await;

    let verifier = make_verifier(VerifyPolicy {
        class_bound_policies: vec![vec!["@path".to_string()]],
        ..VerifyPolicy::default()
    });
    let verified = verifier.verify_at(&signed, CREATED).await.unwrap();
    assert_eq!(verified.label, "eth");
    assert_eq!(verified.binding, Binding::RequestBound);
}

#[tokio::test]
async fn test_class_bound_policies() {
    let request = make_get_request("https://api.example.com/items?page=1");
    let options = make_options()
        .with_binding(Binding::ClassBound)
        .with_components(["@path"]);
    let signed = sign(&request, &options).await;

    let unconfigured = make_verifier(VerifyPolicy::default());
    assert_eq!(
        reason(unconfigured.verify_at(&signed, CREATED).await),
        FailureReason::NotRequestBound
    );

    let mismatched = make_verifier(VerifyPolicy {
        class_bound_policies: vec![vec!["@method".to_string(), "@path".to_string()]],
        ..VerifyPolicy::default()
    });
    assert_eq!(
        reason(mismatched.verify_at(&signed, CREATED).await),
        FailureReason::ClassBoundNotAllowed
    );

    let accepting = make_verifier(VerifyPolicy {
        class_bound_policies: vec![vec!["@path".to_string()]],
        ..VerifyPolicy::default()
    });
    let mut next_page = erc8128_core::request::clone_request(&signed);
    *next_page.uri_mut() = "https://api.example.com/items?page=2".parse().unwrap();
    let verified = accepting.verify_at(&next_page, CREATED).await.unwrap();
    assert_eq!(verified.binding, Binding::ClassBound);
    assert_eq!(verified.components, vec!["@authority", "@path"]);
}

#[tokio::test]
async fn test_shorter_class_policy_is_tried_first() {
    let request = make_get_request("https://api.example.com/items");
    let long = make_options()
        .with_label("long")
        .with_binding(Binding::ClassBound)
        .with_components(["@method", "x-client"]);
    let forged = sign_request_at(&request, &make_forger(ALICE), &long, CREATED)
        .await
        .unwrap();
    let short = make_options()
        .with_label("short")
        .with_binding(Binding::ClassBound)
        .with_components(["@path"])
        .with_header_mode(erc8128_core::HeaderMode::Append);
    let signed = sign(&forged, &short).await;

    let verifier = make_verifier(VerifyPolicy {
        class_bound_policies: vec![
            vec!["@method".to_string(), "x-client".to_string()],
            vec!["@path".to_string()],
        ],
        max_signature_verifications: 1,
        ..VerifyPolicy::default()
    });
    let verified = verifier.verify_at(&signed, CREATED).await.unwrap();
    assert_eq!(verified.label, "short");
    assert_eq!(verified.binding, Binding::ClassBound);
}

#[tokio::test]
async fn test_equal_class_policies_follow_header_order() {
    let request = make_get_request("https://api.example.com/items");
    let by_path = make_options()
        .with_label("path")
        .with_binding(Binding::ClassBound)
        .with_components(["@path"]);
    let by_client = make_options()
        .with_label("client")
        .with_binding(Binding::ClassBound)
        .with_components(["x-client"]);
    let policy = VerifyPolicy {
        class_bound_policies: vec![vec!["x-client".to_string()], vec!["@path".to_string()]],
        max_signature_verifications: 1,
        ..VerifyPolicy::default()
    };

    let path_first = sign(&request, &by_path).await;
    let path_first = sign(
        &path_first,
        &by_client
            .clone()
            .with_header_mode(erc8128_core::HeaderMode::Append),
    )
    .await;
    let verified = make_verifier(policy.clone())
        .verify_at(&path_first, CREATED)
        .await
        .unwrap();
    assert_eq!(verified.label, "path");

    let client_first = sign(&request, &by_client).await;
    let client_first = sign(
        &client_first,
        &by_path.with_header_mode(erc8128_core::HeaderMode::Append),
    )
    .await;
    let verified = make_verifier(policy)
        .verify_at(&client_first, CREATED)
        .await
        .unwrap();
    assert_eq!(verified.label, "client");
}

#[tokio::test]
async fn test_exhausted_attempts_report_the_last_failure() {
    let request = make_get_request("https://api.example.com/");
    let append = make_options().with_header_mode(erc8128_core::HeaderMode::Append);

    let forged_first = sign_request_at(
        &request,
        &make_forger(ALICE),
        &make_options().with_label("sig1"),
        CREATED,
    )
    .await
    .unwrap();
    let forged_first = sign(&forged_first, &append).await;
    let verifier = make_verifier(VerifyPolicy::default());
    assert_eq!(
        verifier.verify_at(&forged_first, CREATED).await.unwrap().label,
        "eth"
    );
    assert_eq!(
        reason(verifier.verify_at(&forged_first, CREATED).await),
        FailureReason::Replay
    );

    let valid_first = sign(&request, &make_options()).await;
    let valid_first = sign_request_at(
        &valid_first,
        &make_forger(ALICE),
        &append.clone().with_label("sig2"),
        CREATED,
    )
    .await
    .unwrap();
    let verifier = make_verifier(VerifyPolicy::default());
    assert_eq!(
        verifier.verify_at(&valid_first, CREATED).await.unwrap().label,
        "eth"
    );
    assert_eq!(
        reason(verifier.verify_at(&valid_first, CREATED).await),
        FailureReason::BadSignature
    );
}

#[tokio::test]
async fn test_attempts_are_capped() {
    let request = make_get_request("https://api.example.com/");
    let forged = sign_request_at(
        &request,
        &make_forger(ALICE),
        &make_options().with_label("sig1"),
        CREATED,
    )
    .await
    .unwrap();
    let signed = sign(
        &forged,
        &make_options().with_header_mode(erc8128_core::HeaderMode::Append),
    )
    .await;

    let capped = make_verifier(VerifyPolicy {
        max_signature_verifications: 1,
        ..VerifyPolicy::default()
    });
    assert_eq!(
        reason(capped.verify_at(&signed, CREATED).await),
        FailureReason::BadSignature
    );

    let preferring = make_verifier(VerifyPolicy {
        label: Some("eth".to_string()),
        max_signature_verifications: 1,
        ..VerifyPolicy::default()
    });
    assert_eq!(
        preferring.verify_at(&signed, CREATED).await.unwrap().label,
        "eth"
    );

    let uncapped = make_verifier(VerifyPolicy::default());
    assert_eq!(uncapped.verify_at(&signed, CREATED).await.unwrap().label, "eth");
}

#[tokio::test]
async fn test_strict_label_must_be_present() {
    let signed = sign(&make_get_request("https://api.example.com/"), &make_options()).await;
    let verifier = make_verifier(VerifyPolicy {
        label: Some("sig2".to_string()),
        strict_label: true,
        ..VerifyPolicy::default()
    });
    assert_eq!(
        reason(verifier.verify_at(&signed, CREATED).await),
        FailureReason::LabelNotFound
    );
}

#[tokio::test]
async fn test_additional_required_components() {
    let request = make_get_request("https://api.example.com/");
    let verifier = make_verifier(VerifyPolicy {
        additional_request_bound_components: vec!["X-Client".to_string()],
        ..VerifyPolicy::default()
    });

    let bare = sign(&request, &make_options()).await;
    assert_eq!(
        reason(verifier.verify_at(&bare, CREATED).await),
        FailureReason::NotRequestBound
    );

    let covered = sign(&request, &make_options().with_components(["x-client"])).await;
    assert!(verifier.verify_at(&covered, CREATED).await.is_ok());

    let mut stripped = erc8128_core::request::clone_request(&covered);
    stripped.headers_mut().remove("x-client");
    let lenient = make_verifier(VerifyPolicy::default());
    assert_eq!(
        reason(lenient.verify_at(&stripped, CREATED).await),
        FailureReason::BadSignatureInput
    );
}

#[tokio::test]
async fn test_host_header_supplies_authority() {
    let request = Request::builder()
        .method("GET")
        .uri("/orders")
        .header("host", "api.example.com")
        .body(Vec::new())
        .unwrap();
    let signed = sign(&request, &make_options()).await;

    let verifier = make_verifier(VerifyPolicy::default());
    assert!(verifier.verify_at(&signed, CREATED).await.is_ok());
}

#[tokio::test]
async fn test_custom_nonce_key_scopes_replay() {
    let request = make_get_request("https://api.example.com/");
    let options = make_options().with_nonce(NonceSource::Explicit("shared".to_string()));
    let from_alice = sign_request_at(&request, &make_signer(ALICE), &options, CREATED)
        .await
        .unwrap();
    let from_bob = sign_request_at(&request, &make_signer(BOB), &options, CREATED)
        .await
        .unwrap();

    let per_key = make_verifier(VerifyPolicy::default());
    assert!(per_key.verify_at(&from_alice, CREATED).await.is_ok());
    assert!(per_key.verify_at(&from_bob, CREATED).await.is_ok());

    let nonce_only: NonceKeyFn = Arc::new(|_keyid: &str, nonce: &str| nonce.to_string());
    let global = make_verifier(VerifyPolicy::default()).with_nonce_key(nonce_only);
    assert!(global.verify_at(&from_alice, CREATED).await.is_ok());
    assert_eq!(
        reason(global.verify_at(&from_bob, CREATED).await),
        FailureReason::Replay
    );
}

#[test]
fn test_accept_signature_lists_acceptable_sets() {
    let verifier = make_verifier(VerifyPolicy {
        class_bound_policies: vec![vec!["@path".to_string()]],
        ..VerifyPolicy::default()
    });
    assert_eq!(
        verifier.accept_signature(&make_order_request()).unwrap(),
        r#"sig1=("@authority" "@method" "@path" "content-digest");keyid;created;expires;nonce, sig2=("@authority" "@path");keyid;created;expires;nonce"#
    );
}

#[tokio::test]
async fn test_policy_loaded_from_toml() {
    let policy: VerifyPolicy = toml::from_str(
        r#"
        replayable = true
        max_validity_sec = 120
        "#,
    )
    .unwrap();
    let verifier = make_verifier(policy);
    assert_eq!(verifier.policy().max_signature_verifications, 3);

    let options = make_options().with_replay(Replay::Replayable);
    let signed = sign(&make_get_request("https://api.example.com/"), &options).await;
    assert!(verifier.verify_at(&signed, CREATED).await.is_ok());
}

#[test]
fn test_invalid_policies_are_rejected() {
    let zero_attempts = VerifyPolicy {
        max_signature_verifications: 0,
        ..VerifyPolicy::default()
    };
    let err = RequestVerifier::new(Arc::new(HashVerifier), zero_attempts).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidOptions);

    let negative_window = VerifyPolicy {
        max_nonce_window_sec: Some(-1),
        ..VerifyPolicy::default()
    };
    let err = RequestVerifier::new(Arc::new(HashVerifier), negative_window).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidOptions);

    let bad_policy = VerifyPolicy {
        class_bound_policies: vec![vec!["bad name".to_string()]],
        ..VerifyPolicy::default()
    };
    assert!(RequestVerifier::new(Arc::new(HashVerifier), bad_policy).is_err());
}

use erc8128_canonical::sfv::{serialize_dictionary_member, serialize_inner_list};
use erc8128_canonical::{
    format_key_id, parse_signature_dictionary, parse_signature_input_dictionary,
    resolve_components, serialize_signature_member, serialize_signature_params, Address, Binding,
    ContentDigest, SignatureParams,
};

fn make_address() -> Address {
    Address::parse("0x1111111111111111111111111111111111111111").unwrap()
}

fn make_params(nonce: Option<&str>) -> SignatureParams {
    SignatureParams {
        created: 1700000000,
        expires: 1700000060,
        keyid: format_key_id(1, &make_address()),
        nonce: nonce.map(str::to_string),
        tag: None,
    }
}

#[test]
fn post_with_body_serializes_to_golden_signature_input() {
    let components = resolve_components(Binding::RequestBound, false, true, None).unwrap();
    let value = serialize_signature_params(&components, &make_params(Some("n1"))).unwrap();
    let member = serialize_dictionary_member("eth", &value).unwrap();

    assert_eq!(
        member,
        r#"eth=("@authority" "@method" "@path" "content-digest");created=1700000000;expires=1700000060;nonce="n1";keyid="erc8128:1:0x1111111111111111111111111111111111111111""#
    );
}

#[test]
fn replayable_params_omit_nonce() {
    let value = serialize_signature_params(&["@authority".to_string()], &make_params(None)).unwrap();
    assert_eq!(
        value,
        r#"("@authority");created=1700000000;expires=1700000060;keyid="erc8128:1:0x1111111111111111111111111111111111111111""#
    );
}

#[test]
fn serialized_member_parses_back_with_raw_value_intact() {
    let components = vec!["@authority".to_string(), "@query".to_string()];
    let value = serialize_signature_params(&components, &make_params(Some("a\"b"))).unwrap();
    let header = format!(
        "{}, {}",
        serialize_dictionary_member("eth", &value).unwrap(),
        serialize_dictionary_member("sig2", &value).unwrap()
    );

    let members = parse_signature_input_dictionary(&header).unwrap();
    assert_eq!(members.len(), 2);
    for member in &members {
        assert_eq!(member.components, components);
        assert_eq!(member.signature_params_value, value);
        assert_eq!(member.params.nonce.as_deref(), Some("a\"b"));
    }
}

#[test]
fn signature_header_matches_input_labels() {
    let header = format!(
        "{}, {}",
        serialize_signature_member("eth", &[0xde, 0xad, 0xbe, 0xef]).unwrap(),
        serialize_signature_member("sig2", &[1; 65]).unwrap()
    );
    let parsed = parse_signature_dictionary(&header).unwrap();
    assert_eq!(parsed.get("eth").map(String::as_str), Some("3q2+7w=="));
    assert!(parsed.contains_key("sig2"));
}

#[test]
fn inner_list_quotes_each_component() {
    assert_eq!(
        serialize_inner_list(&["@method".to_string(), "x-custom".to_string()]).unwrap(),
        r#"("@method" "x-custom")"#
    );
}

#[test]
fn order_body_digest_is_thirty_two_bytes() {
    let digest = ContentDigest::compute(br#"{"amount":"100"}"#);
    assert_eq!(digest.bytes.len(), 32);
    let header = digest.header_value();
    assert!(header.starts_with("sha-256=:"));
    assert!(header.ends_with(':'));
    assert_eq!(ContentDigest::parse(&header).unwrap(), digest);
}

//! Covered components: identifiers, defaults per binding mode, and the
//! normalization applied to verifier policy lists.
//!
//! Membership tests are unordered set containment. The signer's declared
//! order is still what the signature base is rebuilt from.

use crate::validation::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// `@authority` derived component.
pub const AUTHORITY: &str = "@authority";
/// `@method` derived component.
pub const METHOD: &str = "@method";
/// `@path` derived component.
pub const PATH: &str = "@path";
/// `@query` derived component.
pub const QUERY: &str = "@query";
/// `@scheme` derived component.
pub const SCHEME: &str = "@scheme";
/// `@target-uri` derived component.
pub const TARGET_URI: &str = "@target-uri";
/// `@request-target` derived component.
pub const REQUEST_TARGET: &str = "@request-target";
/// Final line of every signature base.
pub const SIGNATURE_PARAMS: &str = "@signature-params";
/// `content-digest` header component.
pub const CONTENT_DIGEST: &str = "content-digest";

static COMPONENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@?[a-z0-9!#$%&'*+.^_`|~-]+$").expect("invalid regex")
});

/// How tightly a signature is tied to the request it travels on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Binding {
    /// Covers everything that identifies one concrete request.
    #[default]
    RequestBound,
    /// Covers a declared, reusable subset of components.
    ClassBound,
}

impl Binding {
    /// Stable string form (`request-bound` / `class-bound`).
    pub fn as_str(self) -> &'static str {
        match self {
            Binding::RequestBound => "request-bound",
            Binding::ClassBound => "class-bound",
        }
    }
}

/// Default covered components for a binding mode and request shape.
///
/// Request-bound: `@authority @method @path`, then `@query` when the request
/// has a query and `content-digest` when it has a body. Class-bound defaults
/// to `@authority` alone; callers are expected to supply the rest.
pub fn default_components(binding: Binding, has_query: bool, has_body: bool) -> Vec<String> {
    match binding {
        Binding::RequestBound => required_request_bound_components(has_query, has_body, &[]),
        Binding::ClassBound => vec![AUTHORITY.to_string()],
    }
}

/// Resolves the components a signer covers.
///
/// For request-bound signatures the defaults come first, followed by any
/// provided components not already present. For class-bound signatures the
/// provided list is mandatory and `@authority` is prepended when missing.
pub fn resolve_components(
    binding: Binding,
    has_query: bool,
    has_body: bool,
    provided: Option<&[String]>,
) -> Result<Vec<String>, ValidationError> {
    let provided = match provided {
        Some(list) => normalize_components(list)?,
        None => Vec::new(),
    };

    match binding {
        Binding::RequestBound => {
            let mut out = default_components(binding, has_query, has_body);
            append_missing(&mut out, &provided);
            Ok(out)
        }
        Binding::ClassBound => {
            if provided.is_empty() {
                return Err(ValidationError::Empty {
                    field: "class-bound components",
                });
            }
            Ok(with_authority_first(provided))
        }
    }
}

/// Minimal component set a request-bound signature must cover for a request
/// of this shape, plus policy-configured extras.
pub fn required_request_bound_components(
    has_query: bool,
    has_body: bool,
    extras: &[String],
) -> Vec<String> {
    let mut out = vec![AUTHORITY.to_string(), METHOD.to_string(), PATH.to_string()];
    if has_query {
        out.push(QUERY.to_string());
    }
    if has_body {
        out.push(CONTENT_DIGEST.to_string());
    }
    append_missing(&mut out, extras);
    out
}

/// Unordered containment: every entry of `required` appears in `have`.
pub fn includes_all_components(required: &[String], have: &[String]) -> bool {
    let have: BTreeSet<&str> = have.iter().map(String::as_str).collect();
    required.iter().all(|c| have.contains(c.as_str()))
}

/// Trims and lowercases component names, checks their syntax, and drops
/// duplicates while keeping first occurrences.
pub fn normalize_components(list: &[String]) -> Result<Vec<String>, ValidationError> {
    let mut out: Vec<String> = Vec::with_capacity(list.len());
    for raw in list {
        let name = raw.trim().to_ascii_lowercase();
        if name.is_empty() {
            return Err(ValidationError::Empty { field: "component" });
        }
        if !COMPONENT_RE.is_match(&name) || name == SIGNATURE_PARAMS {
            return Err(ValidationError::PatternMismatch {
                field: "component",
                value: raw.clone(),
            });
        }
        if !out.contains(&name) {
            out.push(name);
        }
    }
    Ok(out)
}

/// Normalizes class-bound policies.
///
/// Each policy is normalized, gets `@authority` first when it was missing,
/// and policies with the same component set as an earlier one are dropped.
pub fn normalize_class_bound_policies(
    policies: &[Vec<String>],
) -> Result<Vec<Vec<String>>, ValidationError> {
    let mut seen: Vec<BTreeSet<String>> = Vec::new();
    let mut out = Vec::with_capacity(policies.len());
    for policy in policies {
        let normalized = normalize_components(policy)?;
        if normalized.is_empty() {
            return Err(ValidationError::Empty {
                field: "class-bound policy",
            });
        }
        let normalized = with_authority_first(normalized);
        let identity: BTreeSet<String> = normalized.iter().cloned().collect();
        if seen.contains(&identity) {
            continue;
        }
        seen.push(identity);
        out.push(normalized);
    }
    Ok(out)
}

fn append_missing(out: &mut Vec<String>, extra: &[String]) {
    for component in extra {
        if !out.contains(component) {
            out.push(component.clone());
        }
    }
}

fn with_authority_first(mut list: Vec<String>) -> Vec<String> {
    if !list.iter().any(|c| c == AUTHORITY) {
        list.insert(0, AUTHORITY.to_string());
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn request_bound_defaults_follow_request_shape() {
        assert_eq!(
            default_components(Binding::RequestBound, false, false),
            strings(&["@authority", "@method", "@path"])
        );
        assert_eq!(
            default_components(Binding::RequestBound, true, true),
            strings(&["@authority", "@method", "@path", "@query", "content-digest"])
        );
        assert_eq!(
            default_components(Binding::ClassBound, true, true),
            strings(&["@authority"])
        );
    }

    #[test]
    fn request_bound_resolution_appends_extras() {
        let resolved = resolve_components(
            Binding::RequestBound,
            false,
            true,
            Some(&strings(&["X-Request-Id", "@method"])),
        )
        .unwrap();
        assert_eq!(
            resolved,
            strings(&["@authority", "@method", "@path", "content-digest", "x-request-id"])
        );
    }

    #[test]
    fn class_bound_requires_components_and_prepends_authority() {
        assert!(resolve_components(Binding::ClassBound, false, false, None).is_err());
        assert!(resolve_components(Binding::ClassBound, false, false, Some(&[])).is_err());
        assert_eq!(
            resolve_components(Binding::ClassBound, true, false, Some(&strings(&["@path"])))
                .unwrap(),
            strings(&["@authority", "@path"])
        );
        assert_eq!(
            resolve_components(
                Binding::ClassBound,
                false,
                false,
                Some(&strings(&["@path", "@authority"]))
            )
            .unwrap(),
            strings(&["@path", "@authority"])
        );
    }

    #[test]
    fn containment_ignores_order() {
        let have = strings(&["@path", "@method", "@authority"]);
        assert!(includes_all_components(
            &strings(&["@authority", "@method", "@path"]),
            &have
        ));
        assert!(!includes_all_components(
            &strings(&["@authority", "@query"]),
            &have
        ));
        assert!(includes_all_components(&[], &have));
    }

    #[test]
    fn normalization_rejects_bad_names() {
        assert!(normalize_components(&strings(&[" "])).is_err());
        assert!(normalize_components(&strings(&["bad header"])).is_err());
        assert!(normalize_components(&strings(&["@signature-params"])).is_err());
        assert_eq!(
            normalize_components(&strings(&[" Content-Digest ", "content-digest"])).unwrap(),
            strings(&["content-digest"])
        );
    }

    #[test]
    fn class_bound_policies_are_deduplicated_by_set() {
        let policies = vec![
            strings(&["@path"]),
            strings(&["@authority", "@path"]),
            strings(&["@method", "@path"]),
        ];
        let normalized = normalize_class_bound_policies(&policies).unwrap();
        assert_eq!(
            normalized,
            vec![
                strings(&["@authority", "@path"]),
                strings(&["@authority", "@method", "@path"]),
            ]
        );
        assert!(normalize_class_bound_policies(&[vec![]]).is_err());
    }

    #[test]
    fn binding_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&Binding::RequestBound).unwrap(),
            r#""request-bound""#
        );
        assert_eq!(Binding::ClassBound.as_str(), "class-bound");
    }
}

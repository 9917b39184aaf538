//! Proptest strategies for generating test inputs.
//!
//! All strategies are constructive: they build values of the intended shape
//! instead of filtering random strings.

use preflight_types::LEGACY_PROJECT_ID_PREFIX;
use proptest::prelude::*;

/// A project id token: alphanumeric, no hyphens.
pub fn arb_canonical_project_id() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-f0-9]{1,24}").expect("valid regex")
}

/// A legacy `ospid-<token>` project id.
pub fn arb_legacy_project_id() -> impl Strategy<Value = String> {
    arb_canonical_project_id().prop_map(|id| format!("{LEGACY_PROJECT_ID_PREFIX}-{id}"))
}

/// An id with three or more hyphen-separated parts (possibly empty parts).
pub fn arb_malformed_project_id() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::string::string_regex("[a-z0-9]{0,8}").expect("valid regex"), 3..6)
        .prop_map(|parts| parts.join("-"))
}

/// A non-empty API token that does not look like a flag.
pub fn arb_token() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9_]{1,40}").expect("valid regex")
}

/// A well-formed image reference with an explicit tag.
pub fn arb_image_reference() -> impl Strategy<Value = String> {
    let registry = prop_oneof![
        Just("quay.io".to_string()),
        Just("registry.example.com:5000".to_string()),
        Just("localhost".to_string()),
    ];
    let repo = prop::collection::vec(
        prop::string::string_regex("[a-z0-9]{1,10}").expect("valid regex"),
        1..3,
    )
    .prop_map(|parts| parts.join("/"));
    let tag = prop::string::string_regex("[A-Za-z0-9_][A-Za-z0-9_.-]{0,20}").expect("valid regex");

    (registry, repo, tag).prop_map(|(r, p, t)| format!("{r}/{p}:{t}"))
}

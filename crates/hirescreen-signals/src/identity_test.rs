use super::*;

fn with_url(url: &str) -> CandidateContent {
    CandidateContent {
        profile_url: Some(url.to_string()),
        ..CandidateContent::default()
    }
}

// -----------------------------------------------------------------------
// normalize_profile_url
// -----------------------------------------------------------------------

#[test]
fn drops_scheme_and_lowercases_host() {
    assert_eq!(
        normalize_profile_url("HTTPS://Jobs.Example.COM/r/42").as_deref(),
        Some("jobs.example.com/r/42")
    );
    assert_eq!(
        normalize_profile_url("http://jobs.example.com/r/42"),
        normalize_profile_url("https://jobs.example.com/r/42")
    );
}

#[test]
fn collapses_trailing_slash() {
    assert_eq!(
        normalize_profile_url("https://example.com/r/42/"),
        normalize_profile_url("https://example.com/r/42")
    );
    assert_eq!(
        normalize_profile_url("https://example.com/").as_deref(),
        Some("example.com")
    );
}

#[test]
fn strips_tracking_params_and_sorts_the_rest() {
    let a = normalize_profile_url("https://example.com/r?id=7&lang=zh&utm_source=x&spm=a.b");
    let b = normalize_profile_url("https://example.com/r?lang=zh&id=7");
    assert_eq!(a, b);
    assert_eq!(a.as_deref(), Some("example.com/r?id=7&lang=zh"));
}

#[test]
fn repeated_keys_sort_by_value() {
    assert_eq!(
        normalize_profile_url("https://example.com/r?tag=b&tag=a"),
        normalize_profile_url("https://example.com/r?tag=a&tag=b")
    );
}

#[test]
fn drops_fragment() {
    assert_eq!(
        normalize_profile_url("https://example.com/r/1#contact").as_deref(),
        Some("example.com/r/1")
    );
}

#[test]
fn accepts_scheme_less_links() {
    assert_eq!(
        normalize_profile_url("example.com/r/1?utm_medium=mail").as_deref(),
        Some("example.com/r/1")
    );
}

#[test]
fn keeps_explicit_port() {
    assert_eq!(
        normalize_profile_url("https://example.com:8443/r").as_deref(),
        Some("example.com:8443/r")
    );
}

#[test]
fn placeholders_are_rejected() {
    for link in [
        "",
        "  ",
        "#",
        "#top",
        "javascript:void(0)",
        "javascript:;",
        "about:blank",
        "null",
        "undefined",
        "-",
    ] {
        assert_eq!(normalize_profile_url(link), None, "link {link:?}");
    }
}

#[test]
fn malformed_urls_fall_back_to_stripping() {
    assert_eq!(
        normalize_profile_url("http://exa mple.com/r/1/?b=2&a=1&from=feed#x").as_deref(),
        Some("exa mple.com/r/1?a=1&b=2")
    );
}

// -----------------------------------------------------------------------
// derive_identity_key
// -----------------------------------------------------------------------

#[test]
fn url_has_highest_precedence() {
    let content = CandidateContent {
        profile_url: Some("https://example.com/r/1".into()),
        resume_id: Some("R-1".into()),
        platform_user_id: Some("U-1".into()),
        ..CandidateContent::default()
    };
    assert_eq!(derive_identity_key(&content, "ext-1").as_deref(), Some("url:example.com/r/1"));
}

#[test]
fn placeholder_url_falls_through_to_resume_id() {
    let content = CandidateContent {
        profile_url: Some("javascript:void(0)".into()),
        resume_id: Some("  R-1 ".into()),
        ..CandidateContent::default()
    };
    assert_eq!(derive_identity_key(&content, "ext-1").as_deref(), Some("resume:r-1"));
}

#[test]
fn user_id_before_external_id() {
    let content = CandidateContent {
        platform_user_id: Some("U-9".into()),
        ..CandidateContent::default()
    };
    assert_eq!(derive_identity_key(&content, "ext-1").as_deref(), Some("user:u-9"));
}

#[test]
fn external_id_is_last_resort() {
    assert_eq!(
        derive_identity_key(&CandidateContent::default(), " ext-1 ").as_deref(),
        Some("ext:ext-1")
    );
}

#[test]
fn blank_external_id_without_other_ids_has_no_key() {
    assert_eq!(derive_identity_key(&CandidateContent::default(), ""), None);
    assert_eq!(derive_identity_key(&CandidateContent::default(), "  "), None);
    assert_eq!(
        derive_identity_key(&with_url("javascript:void(0)"), " "),
        None
    );
    assert!(derive_identity_key(&with_url("https://example.com/r/2"), "").is_some());
}

#[test]
fn tracking_noise_yields_identical_keys() {
    let a = derive_identity_key(&with_url("https://example.com/r?id=1"), "a");
    let b = derive_identity_key(&with_url("https://example.com/r/?id=1&utm_source=x"), "b");
    assert_eq!(a, b);
}

#[test]
fn deterministic_for_identical_content() {
    let json_a = r#"{"externalId":"x","profileUrl":"https://e.com/p","name":"A"}"#;
    let json_b = r#"{"name":"A","profileUrl":"https://e.com/p","externalId":"x"}"#;
    let a: hirescreen_core::IncomingCandidate = serde_json::from_str(json_a).unwrap();
    let b: hirescreen_core::IncomingCandidate = serde_json::from_str(json_b).unwrap();
    assert_eq!(
        derive_identity_key(&a.content, &a.external_id),
        derive_identity_key(&b.content, &b.external_id)
    );
}

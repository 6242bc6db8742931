// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

use super::*;

const DOC: &str = "\
# Auth

Overview text.

## Login Flow

Login details here.

## Logout Flow

Logout details here.

# Billing

Billing text.
";

#[test]
fn extract_by_anchor_captures_through_next_same_or_higher_heading() {
    let text = extract_by_anchor(DOC, "#login-flow").unwrap();
    assert!(text.contains("Login details here."));
    assert!(!text.contains("Logout details here."));
}

#[test]
fn extract_by_anchor_top_level_heading_stops_before_sibling() {
    let text = extract_by_anchor(DOC, "#auth").unwrap();
    assert!(text.contains("Overview text."));
    assert!(text.contains("Login details here."));
    assert!(!text.contains("Billing text."));
}

#[test]
fn extract_by_anchor_returns_none_for_missing_heading() {
    assert!(extract_by_anchor(DOC, "#does-not-exist").is_none());
}

#[test]
fn extract_sections_produces_a_warning_for_a_missing_anchor() {
    let refs = vec![PrdRef { anchor: "#missing".into(), lines: None }];
    let sections = extract_sections(DOC, &refs);
    assert_eq!(sections.len(), 1);
    assert!(sections[0].warning.is_some());
    assert!(sections[0].text.is_empty());
}

#[test]
fn extract_sections_line_range_overrides_the_anchor() {
    let refs = vec![PrdRef { anchor: "#auth".into(), lines: Some((1, 1)) }];
    let sections = extract_sections(DOC, &refs);
    assert_eq!(sections[0].text, "# Auth");
    assert!(sections[0].warning.is_none());
}

#[test]
fn extract_sections_flags_line_ranges_past_eof() {
    let refs = vec![PrdRef { anchor: "#auth".into(), lines: Some((1, 10_000)) }];
    let sections = extract_sections(DOC, &refs);
    assert!(sections[0].warning.is_some());
}

#[test]
fn hash_is_deterministic_and_sensitive_to_content() {
    let h1 = hash(DOC.as_bytes());
    let h2 = hash(DOC.as_bytes());
    assert_eq!(h1, h2);
    let h3 = hash(b"different");
    assert_ne!(h1, h3);
}

#[test]
fn drift_false_when_hash_matches() {
    let binding = PrdBinding { source: "prd.md".into(), refs: vec![], excerpt: String::new(), hash: hash(DOC.as_bytes()) };
    let report = drift(DOC, &binding);
    assert!(!report.changed);
    assert!(report.affected_refs.is_empty());
}

#[test]
fn drift_true_and_names_affected_ref_when_anchor_disappears() {
    let binding = PrdBinding {
        source: "prd.md".into(),
        refs: vec![PrdRef { anchor: "#login-flow".into(), lines: None }],
        excerpt: String::new(),
        hash: "stale-hash".into(),
    };
    let report = drift(DOC, &binding);
    assert!(report.changed);
    assert!(report.affected_refs.is_empty(), "anchor still resolves, only the hash moved");

    let edited = DOC.replace("## Login Flow", "## Sign-in Flow");
    let report2 = drift(&edited, &binding);
    assert!(report2.changed);
    assert_eq!(report2.affected_refs, vec!["#login-flow".to_string()]);
}

#[test]
fn deliver_truncates_to_the_requested_budget() {
    let binding = PrdBinding {
        source: "prd.md".into(),
        refs: vec![PrdRef { anchor: "#auth".into(), lines: None }],
        excerpt: "frozen".into(),
        hash: hash(DOC.as_bytes()),
    };
    let delivered = deliver(DOC, &binding, 10);
    assert!(delivered.truncated);
    assert_eq!(delivered.body.chars().count(), 10);
    assert_eq!(delivered.excerpt, "frozen");
}

#[test]
fn deliver_not_truncated_when_body_fits_budget() {
    let binding = PrdBinding {
        source: "prd.md".into(),
        refs: vec![PrdRef { anchor: "#billing".into(), lines: None }],
        excerpt: String::new(),
        hash: hash(DOC.as_bytes()),
    };
    let delivered = deliver(DOC, &binding, 10_000);
    assert!(!delivered.truncated);
}

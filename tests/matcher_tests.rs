use form_filler::form::matcher::{
    DEFAULT_MATCH_THRESHOLD, best_match, best_match_scored, match_request, match_request_detailed, similarity,
};
use form_filler::form::model::{FieldKind, FieldValue, FillRequest, FormField};
use form_filler::form::normalize::{key_words, normalize_label};
use proptest::prelude::*;

fn schema() -> Vec<FormField> {
    vec![
        FormField::new("Email", FieldKind::Email).required(),
        FormField::new("Full Name", FieldKind::Text).required(),
        FormField::new("Phone Number", FieldKind::Tel),
    ]
}

// ============================================================================
// Normalization
// ============================================================================

#[test]
fn normalize_strips_punctuation_and_case() {
    assert_eq!(normalize_label("  E-Mail   Address: "), "email address");
    assert_eq!(normalize_label("First_Name"), "first_name");
    assert_eq!(normalize_label("Phone (mobile)*"), "phone mobile");
}

#[test]
fn normalize_empty_and_symbol_only() {
    assert_eq!(normalize_label(""), "");
    assert_eq!(normalize_label("*** ?!"), "");
}

#[test]
fn key_words_keeps_words_longer_than_three() {
    assert_eq!(key_words("Preferred Start Date of Job"), vec!["preferred", "start", "date"]);
    assert!(key_words("Zip").is_empty());
}

// ============================================================================
// Similarity and best match
// ============================================================================

#[test]
fn similarity_bounds() {
    assert_eq!(similarity("", ""), 1.0);
    assert_eq!(similarity("abc", ""), 0.0);
    assert_eq!(similarity("Email", "email"), 1.0);
    assert_eq!(similarity("abc", "xyz"), 0.0);
}

#[test]
fn similarity_matches_block_ratio() {
    // "name" is a 4-char block inside "full name": 2 * 4 / 13
    let score = similarity("name", "full name");
    assert!((score - 8.0 / 13.0).abs() < 1e-9);
}

#[test]
fn normalized_equal_label_scores_one() {
    let candidates = ["email address", "Phone"];
    let (label, score) = best_match_scored("E-Mail Address", &candidates, DEFAULT_MATCH_THRESHOLD).unwrap();
    assert_eq!(label, "email address");
    assert_eq!(score, 1.0);
}

#[test]
fn best_match_none_below_threshold() {
    let candidates = ["Country", "Zip Code"];
    assert_eq!(best_match("Favourite colour", &candidates, 0.6), None);
}

#[test]
fn best_match_accepts_exact_threshold() {
    let threshold = similarity("abcd", "abce");
    assert_eq!(best_match("abcd", &["abce"], threshold), Some("abce"));
}

#[test]
fn best_match_first_candidate_wins_ties() {
    let candidates = ["Name", "name"];
    assert_eq!(best_match("NAME", &candidates, 0.6), Some("Name"));
}

#[test]
fn best_match_empty_candidates() {
    let candidates: [&str; 0] = [];
    assert_eq!(best_match("Email", &candidates, 0.6), None);
}

// ============================================================================
// Request re-keying
// ============================================================================

#[test]
fn match_request_renames_to_form_labels() {
    let request = FillRequest::new().with("Email", "a@b.com").with("Name", "Jo Lee");
    let matched = match_request(&request, &schema(), 0.6);

    assert_eq!(matched.len(), 2);
    assert_eq!(matched.get("Email"), Some(&FieldValue::from("a@b.com")));
    assert_eq!(matched.get("Full Name"), Some(&FieldValue::from("Jo Lee")));
    assert!(!matched.contains_key("Name"));
}

#[test]
fn match_request_keeps_unmatched_keys() {
    let request = FillRequest::new().with("Shoe Size", "44").with("email", "a@b.com");
    let outcome = match_request_detailed(&request, &schema(), 0.6);

    assert_eq!(outcome.request.keys().collect::<Vec<_>>(), vec!["Shoe Size", "Email"]);
    assert_eq!(outcome.unmatched, vec!["Shoe Size".to_string()]);
    assert_eq!(outcome.renamed, vec![("email".to_string(), "Email".to_string())]);
    assert!(outcome.collisions.is_empty());
}

#[test]
fn match_request_collision_last_write_wins() {
    let request = FillRequest::new().with("E-mail", "first@b.com").with("email", "second@b.com");
    let outcome = match_request_detailed(&request, &schema(), 0.6);

    assert_eq!(outcome.request.len(), 1);
    assert_eq!(outcome.request.get("Email"), Some(&FieldValue::from("second@b.com")));
    assert_eq!(outcome.collisions.len(), 1);
    assert_eq!(outcome.collisions[0].overwritten_key, "E-mail");
    assert_eq!(outcome.collisions[0].winning_key, "email");
}

#[test]
fn match_request_empty_schema_is_identity() {
    let request = FillRequest::new().with("A", "1").with("B", true);
    assert_eq!(match_request(&request, &[], 0.6), request);
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn normalize_is_idempotent(s in "[ -~]{0,40}") {
        let once = normalize_label(&s);
        prop_assert_eq!(normalize_label(&once), once);
    }

    #[test]
    fn similarity_is_reflexive_and_bounded(a in "[a-zA-Z ]{0,20}", b in "[a-zA-Z ]{0,20}") {
        prop_assert_eq!(similarity(&a, &a), 1.0);
        let s = similarity(&a, &b);
        prop_assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn match_preserves_key_count_without_collisions(
        keys in proptest::collection::btree_set("[a-z]{3,8}", 1..6)
    ) {
        let fields: Vec<FormField> = keys.iter().map(|k| FormField::new(k.clone(), FieldKind::Text)).collect();
        let request: FillRequest = keys.iter().map(|k| (k.clone(), "v")).collect();
        let outcome = match_request_detailed(&request, &fields, 0.6);
        if outcome.collisions.is_empty() {
            prop_assert_eq!(outcome.request.len(), request.len());
        }
    }
}

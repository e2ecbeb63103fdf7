/// Canonical form of a field label used for comparisons.
///
/// Lower-cases, drops punctuation (anything that is not a letter, digit,
/// underscore or whitespace) and collapses whitespace runs into a single
/// space with no leading or trailing space. Idempotent.
pub fn normalize_label(raw: &str) -> String {
    let lowered = raw.to_lowercase();

    let kept: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Words of a label longer than three characters, lower-cased, in order.
/// Used by the partial-label locator fallback.
pub fn key_words(label: &str) -> Vec<String> {
    label
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .map(str::to_string)
        .collect()
}

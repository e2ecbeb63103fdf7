use tracing::debug;

use crate::form::model::{FillRequest, FormField};
use crate::form::normalize::normalize_label;

pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.6;

// ============================================================================
// Similarity ratio (Ratcliff/Obershelp matching blocks)
// ============================================================================

/// Longest common substring of `a[alo..ahi]` and `b[blo..bhi]`.
/// Returns `(i, j, size)`; ties resolve to the earliest `i`, then earliest `j`.
fn longest_match(a: &[char], b: &[char], alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // lengths[j + 1] = length of the common run ending at a[i], b[j]
    let mut prev = vec![0usize; bhi - blo + 1];

    for i in alo..ahi {
        let mut row = vec![0usize; bhi - blo + 1];
        for j in blo..bhi {
            if a[i] == b[j] {
                let k = prev[j - blo] + 1;
                row[j - blo + 1] = k;
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            }
        }
        prev = row;
    }

    (best_i, best_j, best_size)
}

/// Total size of all matching blocks found by recursively taking the longest
/// common substring and matching the pieces on either side.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        if alo >= ahi || blo >= bhi {
            continue;
        }
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        queue.push((alo, i, blo, j));
        queue.push((i + k, ahi, j + k, bhi));
    }

    total
}

/// Character-level similarity in `[0, 1]`: `2 * M / T` where `M` is the number
/// of matched characters and `T` the combined length. Two empty strings are
/// identical (1.0).
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

// ============================================================================
// Best match selection
// ============================================================================

/// Best scoring candidate for `target` at or above `threshold`, compared on
/// normalized labels. The first candidate wins exact ties.
pub fn best_match<'a, S: AsRef<str>>(target: &str, candidates: &'a [S], threshold: f64) -> Option<&'a str> {
    best_match_scored(target, candidates, threshold).map(|(c, _)| c)
}

/// Like [`best_match`], also returning the winning score.
pub fn best_match_scored<'a, S: AsRef<str>>(
    target: &str,
    candidates: &'a [S],
    threshold: f64,
) -> Option<(&'a str, f64)> {
    let target_norm = normalize_label(target);
    let mut best: Option<(&'a str, f64)> = None;

    for candidate in candidates {
        let candidate = candidate.as_ref();
        let score = similarity(&target_norm, &normalize_label(candidate));

        let beats_best = match best {
            Some((_, best_score)) => score > best_score,
            None => true,
        };
        if beats_best && score >= threshold {
            best = Some((candidate, score));
        }
    }

    best
}

// ============================================================================
// Request re-keying
// ============================================================================

/// Two caller keys that resolved to the same form label. The later key's
/// value is the one kept.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCollision {
    pub field_label: String,
    pub overwritten_key: String,
    pub winning_key: String,
}

/// Full outcome of re-keying a request against a form's fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchOutcome {
    pub request: FillRequest,
    /// (caller key, form label) for every key that was renamed.
    pub renamed: Vec<(String, String)>,
    /// Caller keys with no candidate above the threshold, kept as-is.
    pub unmatched: Vec<String>,
    pub collisions: Vec<MatchCollision>,
}

/// Re-key every entry of `request` under its best matching field label,
/// keeping unmatched keys unchanged.
pub fn match_request(request: &FillRequest, fields: &[FormField], threshold: f64) -> FillRequest {
    match_request_detailed(request, fields, threshold).request
}

/// [`match_request`] with the renames, misses and collisions it produced.
pub fn match_request_detailed(request: &FillRequest, fields: &[FormField], threshold: f64) -> MatchOutcome {
    let labels: Vec<&str> = fields.iter().map(|f| f.label.as_str()).collect();
    let mut outcome = MatchOutcome::default();
    // output key -> caller key that produced it
    let mut sources: Vec<(String, String)> = Vec::new();

    for (key, value) in request.iter() {
        let target = match best_match(key, &labels, threshold) {
            Some(label) => {
                if label != key {
                    debug!(key, label, "matched request key to form label");
                    outcome.renamed.push((key.to_string(), label.to_string()));
                }
                label.to_string()
            }
            None => {
                outcome.unmatched.push(key.to_string());
                key.to_string()
            }
        };

        if let Some((_, previous_key)) = sources.iter_mut().find(|(out, _)| *out == target) {
            outcome.collisions.push(MatchCollision {
                field_label: target.clone(),
                overwritten_key: previous_key.clone(),
                winning_key: key.to_string(),
            });
            *previous_key = key.to_string();
        } else {
            sources.push((target.clone(), key.to_string()));
        }

        outcome.request.insert(target, value.clone());
    }

    outcome
}

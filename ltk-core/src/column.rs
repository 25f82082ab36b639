//! Column name lookup with nearest-name suggestions for misspelled variables.

/// Minimum similarity for a column to be proposed as a suggestion.
pub const SUGGESTION_CUTOFF: f64 = 0.6;

/// Normalize a column header: trimmed and lower case.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Similarity in `[0, 1]`, 1 meaning identical (case-insensitive).
///
/// One minus the Levenshtein distance over the length of the longer name.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase())
}

/// The single closest candidate to `name`, if any is similar enough.
///
/// Ties keep the candidate listed first.
pub fn closest_match<'a, I>(name: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&str, f64)> = None;
    for candidate in candidates {
        let score = similarity(name, candidate);
        if score < SUGGESTION_CUTOFF {
            continue;
        }
        match best {
            Some((_, best_score)) if best_score >= score => {}
            _ => best = Some((candidate, score)),
        }
    }
    best.map(|(candidate, _)| candidate.to_string())
}

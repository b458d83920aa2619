//! Glob-style key matching.
//!
//! Two metacharacters are supported: `*` matches any run of characters
//! (including the empty run) and `?` matches exactly one character. There
//! are no character classes and no escaping; every other character matches
//! itself. An empty pattern matches only the empty key.

/// Returns `true` if `key` matches the glob `pattern`.
///
/// Runs in O(len(pattern) * len(key)) worst case using the two-pointer
/// greedy walk: on a mismatch after a `*`, the star re-absorbs one more
/// character of the key and matching resumes past the star. This keeps
/// patterns with many stars linear in practice instead of exponential.
pub fn match_pattern(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();

    let mut p = 0;
    let mut k = 0;
    // Position of the most recent `*` and the key index it has consumed up to.
    let mut star: Option<usize> = None;
    let mut absorbed = 0;

    while k < key.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == key[k]) {
            p += 1;
            k += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            absorbed = k;
            p += 1;
        } else if let Some(star_pos) = star {
            p = star_pos + 1;
            absorbed += 1;
            k = absorbed;
        } else {
            return false;
        }
    }

    // Only trailing stars may remain unconsumed.
    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}

//! Token count estimation
//!
//! A deliberately rough heuristic, not a tokenizer: the estimate is the
//! whitespace-separated word count plus a quarter of the character count
//! (floor division). It is stable and deterministic so records are
//! comparable across runs, but downstream consumers must not treat the
//! counts as exact.

/// Estimates the token count of `text`.
///
/// `words + chars / 4`, where `words` is the whitespace-split word count and
/// `chars` the Unicode scalar count. Empty text estimates to 0.
pub fn estimate(text: &str) -> usize {
    text.split_whitespace().count() + text.chars().count() / 4
}

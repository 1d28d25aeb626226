//! Cheap text similarity for near-duplicate report reasons.
//!
//! Bigram Jaccard: lowercase, keep alphanumeric characters only, build
//! the set of adjacent-character bigrams, and compare set overlap. Good
//! enough to catch "same complaint, different punctuation" without any
//! language awareness, and O(len) per string.

use std::collections::HashSet;

fn bigram_set(text: &str) -> HashSet<(char, char)> {
  let clean: Vec<char> = text
    .chars()
    .filter(|c| c.is_alphanumeric())
    .flat_map(char::to_lowercase)
    .collect();

  clean.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Jaccard index over adjacent-character bigrams, in `[0, 1]`.
///
/// Two strings with no bigrams at all (empty or single-character after
/// cleaning) are defined as identical.
pub fn similarity(a: &str, b: &str) -> f64 {
  let set_a = bigram_set(a);
  let set_b = bigram_set(b);

  if set_a.is_empty() && set_b.is_empty() {
    return 1.0;
  }

  let intersection = set_a.intersection(&set_b).count();
  let union = set_a.len() + set_b.len() - intersection;
  if union == 0 {
    1.0
  } else {
    intersection as f64 / union as f64
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identical_strings_score_one() {
    assert_eq!(similarity("spam content here", "spam content here"), 1.0);
  }

  #[test]
  fn whitespace_punctuation_and_case_are_ignored() {
    let a = "This annotation is spam.";
    let b = "this annotation IS   spam!!!";
    assert_eq!(similarity(a, b), 1.0);
  }

  #[test]
  fn disjoint_strings_score_zero() {
    assert_eq!(similarity("abcdef", "uvwxyz"), 0.0);
  }

  #[test]
  fn both_empty_count_as_identical() {
    assert_eq!(similarity("", ""), 1.0);
    assert_eq!(similarity("?!", ". . ."), 1.0);
  }

  #[test]
  fn distinct_reasons_fall_below_the_cutoff() {
    let a = "contains personal attacks against the author";
    let b = "links to an unrelated commercial website";
    assert!(similarity(a, b) < crate::policy::DUPLICATE_REASON_CUTOFF);
  }

  #[test]
  fn near_duplicates_clear_the_cutoff() {
    let a = "this note is harassment of another reader";
    let b = "this note is harassment of another reader!!";
    assert!(similarity(a, b) >= crate::policy::DUPLICATE_REASON_CUTOFF);
  }
}

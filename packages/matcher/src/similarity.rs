//! Name similarity metric.
//!
//! The pipeline uses one metric everywhere a fuzzy comparison happens
//! (geocoder confidence scoring, layer-2 dedup, location matching): the
//! longest-common-subsequence ratio `2 * lcs(a, b) / (len(a) + len(b))`,
//! computed over chars. 1.0 means identical, 0.0 means nothing shared.

/// LCS-based similarity ratio between two strings, in `0.0..=1.0`.
#[must_use]
pub fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    #[allow(clippy::cast_precision_loss)]
    {
        let lcs = lcs_length(&a_chars, &b_chars) as f64;
        2.0 * lcs / (a_chars.len() + b_chars.len()) as f64
    }
}

/// Length of the longest common subsequence, single-row DP.
fn lcs_length(a: &[char], b: &[char]) -> usize {
    let mut row = vec![0usize; b.len() + 1];

    for &ca in a {
        let mut prev_diag = 0;
        for (j, &cb) in b.iter().enumerate() {
            let current = row[j + 1];
            row[j + 1] = if ca == cb {
                prev_diag + 1
            } else {
                row[j + 1].max(row[j])
            };
            prev_diag = current;
        }
    }

    row[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        assert!((ratio("polar ice", "polar ice") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert!(ratio("abc", "xyz").abs() < f64::EPSILON);
    }

    #[test]
    fn empty_against_empty_is_one() {
        assert!((ratio("", "") - 1.0).abs() < f64::EPSILON);
        assert!(ratio("abc", "").abs() < f64::EPSILON);
    }

    #[test]
    fn symmetric() {
        let ab = ratio("polar ice raleigh", "polar iceplex");
        let ba = ratio("polar iceplex", "polar ice raleigh");
        assert!((ab - ba).abs() < f64::EPSILON);
    }

    #[test]
    fn near_identical_rink_names_clear_relaxed_threshold() {
        // The wiki-vs-wiki case the relaxed threshold exists for.
        let r = ratio("polar ice raleigh", "polar iceplex raleigh");
        assert!(r >= 0.6, "ratio was {r}");
    }

    #[test]
    fn prefix_overlap_scores_proportionally() {
        // lcs("abcd", "abxx") = 2 -> 2*2/8
        assert!((ratio("abcd", "abxx") - 0.5).abs() < f64::EPSILON);
    }
}

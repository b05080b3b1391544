//! Scalar similarity measures. Every function here returns a value in `[0, 1]`
//! where `1` means indistinguishable.

use crate::analysis::{cfg::EdgeStats, frequency::CallCounts};

/// Scores below this snap to 0, scores above `1 - COMPRESS_EPSILON` to 1.
pub const COMPRESS_EPSILON: f64 = 1e-4;

/// `|a - b| / max(a, b)`, or 0 when both are zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn relative_difference(a: usize, b: usize) -> f64 {
    let max = a.max(b);
    if max == 0 {
        0.0
    } else {
        a.abs_diff(b) as f64 / max as f64
    }
}

/// Back-edge agreement. Forward edges are reported by the CFG but do not
/// contribute.
#[must_use]
pub fn structural_similarity(a: &EdgeStats, b: &EdgeStats) -> f64 {
    let sim_back = 1.0 - relative_difference(a.back, b.back);
    (sim_back * sim_back).sqrt()
}

/// Geometric mean of the per-operation similarities.
#[must_use]
pub fn frequency_similarity(a: &CallCounts, b: &CallCounts) -> f64 {
    let product: f64 = a
        .as_array()
        .iter()
        .zip(b.as_array())
        .map(|(x, y)| 1.0 - relative_difference(*x, y))
        .product();
    product.powf(1.0 / 5.0)
}

/// Maps a distance onto `[0.5, 1]`: distances at or beyond `threshold` score
/// the floor of 0.5.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn thresholded_similarity(distance: usize, threshold: usize) -> f64 {
    if distance < threshold {
        0.5 + 0.5 * (1.0 - distance as f64 / threshold as f64)
    } else {
        0.5
    }
}

/// Levenshtein distance capped at `limit`. Only the diagonal band of width
/// `2 * limit + 1` is filled, so each row costs `O(limit)` and long sequences
/// with a small limit stay cheap.
#[must_use]
pub fn bounded_edit_distance<T: PartialEq>(a: &[T], b: &[T], limit: usize) -> usize {
    if a.len().abs_diff(b.len()) >= limit {
        return limit;
    }
    let (n, m) = (a.len(), b.len());
    let over = limit;
    let mut prev: Vec<usize> = (0..=m).map(|j| j.min(over)).collect();
    let mut curr = vec![over; m + 1];

    for i in 1..=n {
        let lo = i.saturating_sub(limit).max(1);
        let hi = (i + limit).min(m);
        // The next row reads this one on `lo - 1..=hi + 1`; cells there that
        // fall outside the band must hold `over`, not a value from two rows up.
        curr[lo - 1..=(hi + 1).min(m)].fill(over);
        curr[0] = i.min(over);
        for j in lo..=hi {
            let substitution = prev[j - 1] + usize::from(a[i - 1] != b[j - 1]);
            let deletion = prev[j] + 1;
            let insertion = curr[j - 1] + 1;
            curr[j] = substitution.min(deletion).min(insertion).min(over);
        }
        if curr[lo - 1..=hi].iter().all(|&cell| cell >= over) {
            return limit;
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[m].min(limit)
}

#[must_use]
pub fn compress(score: f64) -> f64 {
    if score < COMPRESS_EPSILON {
        0.0
    } else if score > 1.0 - COMPRESS_EPSILON {
        1.0
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_edit_distance(a: &[u8], b: &[u8]) -> usize {
        let mut prev: Vec<usize> = (0..=b.len()).collect();
        for i in 1..=a.len() {
            let mut curr = vec![i; b.len() + 1];
            for j in 1..=b.len() {
                curr[j] = (prev[j - 1] + usize::from(a[i - 1] != b[j - 1]))
                    .min(prev[j] + 1)
                    .min(curr[j - 1] + 1);
            }
            prev = curr;
        }
        prev[b.len()]
    }

    #[test]
    fn relative_difference_handles_zero() {
        assert_eq!(relative_difference(0, 0), 0.0);
        assert_eq!(relative_difference(0, 4), 1.0);
        assert_eq!(relative_difference(3, 4), 0.25);
    }

    #[test]
    fn identical_stats_score_one() {
        let stats = EdgeStats {
            tree: 5,
            back: 2,
            forward: 1,
        };
        assert_eq!(structural_similarity(&stats, &stats), 1.0);
        let other = EdgeStats { back: 4, ..stats };
        assert_eq!(structural_similarity(&stats, &other), 0.5);
    }

    #[test]
    fn thresholded_similarity_floor() {
        assert_eq!(thresholded_similarity(0, 20), 1.0);
        assert_eq!(thresholded_similarity(10, 20), 0.75);
        assert_eq!(thresholded_similarity(20, 20), 0.5);
        assert_eq!(thresholded_similarity(500, 20), 0.5);
    }

    #[test]
    fn bounded_distance_agrees_with_full_table_below_limit() {
        let cases: [(&[u8], &[u8]); 5] = [
            (b"kitten", b"sitting"),
            (b"", b"abc"),
            (b"flaw", b"lawn"),
            (b"1234512345", b"1234512345"),
            (b"abcdefgh", b"hgfedcba"),
        ];
        for (a, b) in cases {
            let full = plain_edit_distance(a, b);
            assert_eq!(bounded_edit_distance(a, b, 20), full, "{a:?} {b:?}");
            assert_eq!(bounded_edit_distance(a, b, 3), full.min(3), "{a:?} {b:?}");
        }
    }

    #[test]
    fn bounded_distance_agrees_on_long_sequences() {
        let a: Vec<u8> = (0..400).map(|i| (i * 7 % 5) as u8).collect();
        let mut b = a.clone();
        b[17] = 9;
        b.remove(200);
        b.insert(350, 4);
        let full = plain_edit_distance(&a, &b);
        assert_eq!(bounded_edit_distance(&a, &b, 20), full);
        assert_eq!(bounded_edit_distance(&a, &b, 2), full.min(2));
    }

    #[test]
    fn identical_long_traces_stay_linear() {
        let trace = vec![3u8; 1_000_000];
        let mut shifted = trace.clone();
        shifted[500_000] = 7;
        assert_eq!(bounded_edit_distance(&trace, &trace, 20), 0);
        assert_eq!(bounded_edit_distance(&trace, &shifted, 20), 1);
    }

    #[test]
    fn bounded_distance_short_circuits_on_length() {
        let long = vec![1u8; 1000];
        assert_eq!(bounded_edit_distance(&long, &[], 20), 20);
    }

    #[test]
    fn compress_snaps_extremes() {
        assert_eq!(compress(0.00005), 0.0);
        assert_eq!(compress(0.99995), 1.0);
        assert_eq!(compress(0.5), 0.5);
    }
}

//! Rank and order statistics shared by the node-degree engine.

use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Fisher's method for combining p-value-like observations.
///
/// The statistic is `-2 * sum(ln(p_i))`, compared against a chi-squared
/// distribution with `2 * n` degrees of freedom. The inputs are treated
/// as independent uniform-under-null observations, which for per-dataset
/// relative ranks is an approximation, not an exact test.
///
/// Empty input yields 1.0. Values are clamped away from zero before the
/// log so a single underflowed observation cannot produce `-inf`.
pub fn fisher_combine(pvalues: &[f64]) -> f64 {
    if pvalues.is_empty() {
        return 1.0;
    }

    let stat: f64 = -2.0
        * pvalues
            .iter()
            .map(|&p| p.clamp(f64::MIN_POSITIVE, 1.0).ln())
            .sum::<f64>();

    let dof = 2.0 * pvalues.len() as f64;
    let chi2 = ChiSquared::new(dof).expect("dof > 0 for non-empty input");
    chi2.sf(stat)
}

/// Median of the values. Returns NaN for empty input.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Median absolute deviation (unscaled).
pub fn mad(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let center = median(values);
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations)
}

/// Fractional rank transform: ranks in `[1..=n]`, ties receiving the
/// average rank of their group.
pub fn rank_transform(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        // tie group [i, j)
        let mut j = i + 1;
        while j < n && values[order[j]] == values[order[i]] {
            j += 1;
        }
        let avg = (i + 1..=j).sum::<usize>() as f64 / (j - i) as f64;
        for &idx in &order[i..j] {
            ranks[idx] = avg;
        }
        i = j;
    }
    ranks
}

/// Number of bins in the node-degree distribution string.
pub const NUM_DISTRIBUTION_BINS: usize = 10;

/// Histogram of values over `[0, 1]` rendered as one ASCII digit per bin.
///
/// Each bin height is normalized to the tallest bin and written as
/// `floor(9 * height / tallest)`, so the tallest bin always reads `9`.
/// Values at exactly 1.0 fall into the last bin.
pub fn distribution_string(values: &[f64]) -> String {
    let mut bins = [0usize; NUM_DISTRIBUTION_BINS];
    for &v in values {
        let b = ((v * NUM_DISTRIBUTION_BINS as f64) as usize).min(NUM_DISTRIBUTION_BINS - 1);
        bins[b] += 1;
    }

    let tallest = bins.iter().copied().max().unwrap_or(0);
    let mut out = String::with_capacity(NUM_DISTRIBUTION_BINS);
    for &count in &bins {
        let digit = if tallest == 0 {
            0
        } else {
            (9 * count) / tallest
        };
        debug_assert!(digit < 10);
        out.push(char::from_digit(digit as u32, 10).expect("single digit"));
    }
    out
}

/// Cumulative distribution as a direct running sum.
pub fn cumulative(dist: &[f64]) -> Vec<f64> {
    let mut cum = Vec::with_capacity(dist.len());
    let mut total = 0.0;
    for &d in dist {
        total += d;
        cum.push(total);
    }
    cum
}

use approx::assert_abs_diff_eq;
use coexp_util::stats;

#[test]
fn fisher_combine_extremes() {
    assert_abs_diff_eq!(stats::fisher_combine(&[]), 1.0);

    // uniform-looking observations should not be significant
    let p = stats::fisher_combine(&[0.5, 0.5, 0.5, 0.5]);
    assert!(p > 0.3, "got {}", p);

    // consistently tiny observations should be
    let p = stats::fisher_combine(&[1e-4, 1e-4, 1e-4]);
    assert!(p < 1e-6, "got {}", p);

    // a zero must not blow up the log
    let p = stats::fisher_combine(&[0.0, 0.5]);
    assert!(p.is_finite());
    assert!((0.0..=1.0).contains(&p));
}

#[test]
fn fisher_combine_single_value_is_near_identity() {
    // with dof = 2 the chi-squared tail of -2 ln p recovers p itself
    for p in [0.01, 0.25, 0.9] {
        assert_abs_diff_eq!(stats::fisher_combine(&[p]), p, epsilon = 1e-10);
    }
}

#[test]
fn median_and_mad() {
    assert_abs_diff_eq!(stats::median(&[3.0, 1.0, 2.0]), 2.0);
    assert_abs_diff_eq!(stats::median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
    assert!(stats::median(&[]).is_nan());

    // deviations from median 2.5: [1.5, 0.5, 0.5, 5.5] -> median 1.0
    assert_abs_diff_eq!(stats::mad(&[1.0, 2.0, 3.0, 8.0]), 1.0);
    assert_abs_diff_eq!(stats::mad(&[5.0, 5.0, 5.0]), 0.0);
}

#[test]
fn rank_transform_plain() {
    let ranks = stats::rank_transform(&[0.3, 0.1, 0.2]);
    assert_eq!(ranks, vec![3.0, 1.0, 2.0]);
}

#[test]
fn rank_transform_averages_ties() {
    // 0.1 -> rank 1; the two 0.5 share ranks 2 and 3 -> 2.5; 0.9 -> 4
    let ranks = stats::rank_transform(&[0.5, 0.1, 0.5, 0.9]);
    assert_eq!(ranks, vec![2.5, 1.0, 2.5, 4.0]);
}

#[test]
fn distribution_string_shape() {
    // everything in the first bin
    assert_eq!(stats::distribution_string(&[0.01, 0.02, 0.05]), "9000000000");

    // value at exactly 1.0 lands in the last bin
    assert_eq!(&stats::distribution_string(&[1.0])[9..], "9");

    // two equal bins both read 9, a half-full bin reads 4 (floor)
    let s = stats::distribution_string(&[0.05, 0.05, 0.15, 0.15, 0.25]);
    assert_eq!(&s[..3], "994");

    assert_eq!(stats::distribution_string(&[]), "0000000000");
}

#[test]
fn cumulative_is_a_running_sum() {
    let cum = stats::cumulative(&[0.1, 0.2, 0.3]);
    assert_eq!(cum.len(), 3);
    assert_abs_diff_eq!(cum[0], 0.1);
    assert_abs_diff_eq!(cum[1], 0.3);
    assert_abs_diff_eq!(cum[2], 0.6, epsilon = 1e-12);
    assert!(stats::cumulative(&[]).is_empty());
}

//! Gap sweep over a dataset clustered at 10-minute pauses.

use chrono::Duration;

use integration_tests::fixtures::{at, clustered_dataset, minute_gaps, BOUNCERS, BROWSERS, VISITS};
use session_core::threshold::optimal_gaps;
use session_core::{
    select_optimal_gaps, sweep, sweep_partitions, Error, NormalizationConfig, Partitions,
    ResourceNormalizer,
};

#[test]
fn test_single_minimum_at_ten_minutes() {
    let minima = select_optimal_gaps(clustered_dataset(), &minute_gaps(39)).unwrap();

    assert_eq!(minima.len(), 1);
    let best = &minima[0];
    assert_eq!(best.gap, Duration::minutes(10));
    assert!(best.is_local_minimum);
    assert_eq!(best.single_url_fraction, 0.5);
    assert_eq!(best.session_count, (BROWSERS * VISITS + BOUNCERS * VISITS) as u64);
}

#[test]
fn test_curve_shape() {
    let curve = sweep(clustered_dataset(), &minute_gaps(39)).unwrap();
    assert_eq!(curve.len(), 39);

    let fraction = |minutes: usize| curve.candidates[minutes - 1].single_url_fraction;
    assert_eq!(fraction(1), 1.0);
    assert_eq!(fraction(2), 0.75);
    assert_eq!(fraction(4), 0.75);
    assert!((fraction(5) - 2.0 / 3.0).abs() < 1e-12);
    assert_eq!(fraction(10), 0.5);
    assert_eq!(fraction(24), 0.5);
    assert_eq!(fraction(25), 0.75);
    assert_eq!(fraction(39), 0.75);

    // Browsers see all four pages in one visit from 10 minutes on
    assert_eq!(curve.candidates[9].unique_url_histogram, [30, 0, 0, 30, 0, 0]);
    assert_eq!(curve.local_minima().count(), 1);
}

#[test]
fn test_candidates_keep_order() {
    let gaps = minute_gaps(39);
    let curve = sweep(clustered_dataset(), &gaps).unwrap();
    let swept: Vec<_> = curve.candidates.iter().map(|c| c.gap).collect();
    assert_eq!(swept, gaps);
}

#[test]
fn test_sweep_range_without_dip_reports_no_minimum() {
    // 10..24 minutes is the flat bottom of the curve
    let gaps: Vec<_> = (10..=24).map(Duration::minutes).collect();
    let err = select_optimal_gaps(clustered_dataset(), &gaps).unwrap_err();
    assert!(matches!(err, Error::NoLocalMinimumFound { candidates: 15 }));
    assert!(!err.is_fatal());
}

#[test]
fn test_partitions_reused_with_normalization() {
    let events = vec![
        at("10.0.0.1", 0, "/a?ref=1"),
        at("10.0.0.1", 30, "/a?ref=2"),
        at("10.0.0.1", 5000, "/b"),
        at("10.0.0.1", 5030, "/c"),
        at("10.0.0.2", 0, "/a"),
    ];
    let partitions = Partitions::new(events);
    let gaps = [Duration::seconds(10), Duration::seconds(60), Duration::hours(2)];

    let exact = sweep_partitions(&partitions, &gaps, &ResourceNormalizer::exact()).unwrap();
    let stripped = sweep_partitions(
        &partitions,
        &gaps,
        &ResourceNormalizer::new(NormalizationConfig {
            strip_query: true,
            trim_trailing_slash: false,
        }),
    )
    .unwrap();

    // At 60s the first visit is {/a?ref=1, /a?ref=2}: two resources exactly,
    // one once the query is stripped
    assert_eq!(exact.candidates[1].single_url_sessions, 1);
    assert_eq!(stripped.candidates[1].single_url_sessions, 2);
    assert_eq!(optimal_gaps(&exact).unwrap()[0].gap, Duration::seconds(60));
    assert!(optimal_gaps(&stripped).is_err());
}

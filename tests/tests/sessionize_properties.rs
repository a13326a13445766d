//! Property tests for sessionization, metrics and aggregation.

use chrono::Duration;
use proptest::prelude::*;

use integration_tests::fixtures::at;
use session_core::engagement::EngagementTotals;
use session_core::{
    aggregate, metrics_for_all, sessionize, Event, ResourceNormalizer, Sessionization,
};

const KEYS: [&str; 4] = ["10.0.0.1", "10.0.0.2", "10.0.0.3", "2001:db8::1"];
const PAGES: [&str; 6] = ["/", "/a", "/b", "/c", "/a?x=1", "/d/"];

fn events_strategy() -> impl Strategy<Value = Vec<Event>> {
    prop::collection::vec((0..KEYS.len(), 0i64..50_000, 0..PAGES.len()), 0..120).prop_map(
        |raw| {
            raw.into_iter()
                .map(|(k, secs, p)| at(KEYS[k], secs, PAGES[p]))
                .collect()
        },
    )
}

fn all_metrics(s: &Sessionization) -> Vec<session_core::SessionMetrics> {
    metrics_for_all(s, &ResourceNormalizer::exact())
}

fn sorted_triples(events: impl IntoIterator<Item = Event>) -> Vec<(String, i64, String)> {
    let mut triples: Vec<_> = events
        .into_iter()
        .map(|e| (e.key, e.timestamp.timestamp(), e.resource))
        .collect();
    triples.sort();
    triples
}

proptest! {
    #[test]
    fn prop_gaps_respect_threshold(events in events_strategy(), gap_secs in 1i64..5_000) {
        let gap = Duration::seconds(gap_secs);
        let result = sessionize(events, gap).unwrap();

        for sessions in result.sessions.values() {
            for session in sessions {
                for pair in session.events.windows(2) {
                    prop_assert!(pair[0].timestamp <= pair[1].timestamp);
                    prop_assert!(pair[1].timestamp - pair[0].timestamp <= gap);
                }
            }
            for pair in sessions.windows(2) {
                prop_assert!(pair[1].start() - pair[0].end() > gap);
            }
        }
    }

    #[test]
    fn prop_every_event_lands_in_exactly_one_session(
        events in events_strategy(),
        gap_secs in 1i64..5_000,
    ) {
        let expected = sorted_triples(events.clone());
        let result = sessionize(events, Duration::seconds(gap_secs)).unwrap();

        prop_assert_eq!(result.dropped, 0);
        let actual = sorted_triples(result.iter().flat_map(|s| s.events.clone()));
        prop_assert_eq!(actual, expected);
        for (key, sessions) in &result.sessions {
            prop_assert!(!sessions.is_empty());
            prop_assert!(sessions.iter().all(|s| &s.key == key && !s.is_empty()));
        }
    }

    #[test]
    fn prop_huge_gap_gives_one_session_per_key(events in events_strategy()) {
        let keys: std::collections::BTreeSet<_> = events.iter().map(|e| e.key.clone()).collect();
        let result = sessionize(events, Duration::days(365)).unwrap();

        prop_assert_eq!(result.key_count(), keys.len());
        prop_assert_eq!(result.session_count(), keys.len());
    }

    #[test]
    fn prop_tiny_gap_gives_one_session_per_event(
        stamps in prop::collection::btree_set(0i64..10_000, 1..60),
    ) {
        // Timestamps are distinct multiples of 10s, so every gap is >= 10s
        let events: Vec<Event> = stamps.iter().map(|s| at("10.0.0.1", s * 10, "/a")).collect();
        let n = events.len();
        let result = sessionize(events, Duration::seconds(5)).unwrap();

        prop_assert_eq!(result.session_count(), n);
        prop_assert!(result.iter().all(|s| s.len() == 1));
    }

    #[test]
    fn prop_unique_resources_bounded_by_event_count(
        events in events_strategy(),
        gap_secs in 1i64..5_000,
    ) {
        let result = sessionize(events, Duration::seconds(gap_secs)).unwrap();
        let metrics = all_metrics(&result);

        prop_assert_eq!(metrics.len(), result.session_count());
        for (m, session) in metrics.iter().zip(result.iter()) {
            prop_assert!(m.unique_resources >= 1);
            prop_assert!(m.unique_resources <= m.event_count);

            let distinct: std::collections::HashSet<_> = session.resources().collect();
            prop_assert_eq!(m.unique_resources == m.event_count, distinct.len() == session.len());
            prop_assert_eq!(m.inter_event_durations.len(), m.event_count - 1);
            prop_assert_eq!(m.duration, m.end - m.start);
        }
    }

    #[test]
    fn prop_aggregation_ignores_input_order(
        events in events_strategy(),
        gap_secs in 1i64..5_000,
    ) {
        let gap = Duration::seconds(gap_secs);
        let mut reversed = events.clone();
        reversed.reverse();

        let forward = aggregate(&all_metrics(&sessionize(events, gap).unwrap()));
        let backward = aggregate(&all_metrics(&sessionize(reversed, gap).unwrap()));
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn prop_sub_batches_merge_to_whole(
        events in events_strategy(),
        gap_secs in 1i64..5_000,
        split in 0usize..200,
    ) {
        let metrics = all_metrics(&sessionize(events, Duration::seconds(gap_secs)).unwrap());
        let split = split.min(metrics.len());
        let (left, right) = metrics.split_at(split);

        let merged = EngagementTotals::from_metrics(right)
            .merge(EngagementTotals::from_metrics(left))
            .into_records();
        prop_assert_eq!(merged, aggregate(&metrics));
    }
}

#[test]
fn test_end_to_end_example() {
    let events = vec![at("A", 0, "/x"), at("A", 300, "/y"), at("A", 4000, "/x")];
    let result = sessionize(events, Duration::seconds(900)).unwrap();
    let metrics = all_metrics(&result);

    assert_eq!(metrics.len(), 2);
    assert_eq!(metrics[0].duration, Duration::seconds(300));
    assert_eq!(metrics[0].unique_resources, 2);
    assert_eq!(metrics[1].duration, Duration::zero());
    assert_eq!(metrics[1].unique_resources, 1);

    let records = aggregate(&metrics);
    let a = &records["A"];
    assert_eq!(a.total_duration, Duration::seconds(300));
    assert_eq!(a.total_page_views, 3);
    assert_eq!(a.session_count, 2);
    assert_eq!(a.avg_session_time, Duration::seconds(150));
}

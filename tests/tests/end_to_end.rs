//! Full runs: access-log text in, analytics report out.

use chrono::Duration;

use integration_tests::fixtures::{clustered_dataset, log_line, BOUNCERS, BROWSERS, VISITS};
use pipeline::{parse_lines, read_log_file, GapSource, PipelineRunner};
use session_core::{SessionConfig, SweepConfig};

fn clustered_log() -> String {
    let mut out = String::new();
    for (i, event) in clustered_dataset().iter().enumerate() {
        out.push_str(&log_line(event, 40_000 + (i % 1000) as u16));
        out.push('\n');
        if i % 50 == 0 {
            out.push_str("truncated line\n");
        }
    }
    out
}

#[tokio::test]
async fn test_log_file_with_swept_gap() {
    telemetry::init_tracing(telemetry::TracingConfig::new().with_filter("warn"));

    let path = std::env::temp_dir().join(format!("sessionizer-e2e-{}.log", std::process::id()));
    tokio::fs::write(&path, clustered_log()).await.unwrap();
    let ingest = read_log_file(&path).await.unwrap();
    tokio::fs::remove_file(&path).await.unwrap();

    let total_events = BROWSERS * VISITS * 4 + BOUNCERS * VISITS;
    assert_eq!(ingest.events.len(), total_events);
    assert_eq!(ingest.malformed, 3);

    let config = SessionConfig {
        auto_select_gap: true,
        ..Default::default()
    };
    let report = PipelineRunner::new(config)
        .unwrap()
        .run_ingest(ingest)
        .await
        .unwrap();

    assert_eq!(report.gap_source, GapSource::Sweep);
    assert_eq!(report.gap_threshold_secs, 600.0);
    assert_eq!(report.sweep.as_ref().unwrap().len(), 39);
    assert_eq!(report.summary.keys, BROWSERS + BOUNCERS);
    assert_eq!(report.summary.sessions, (BROWSERS + BOUNCERS) * VISITS);
    assert_eq!(report.summary.page_views, total_events);
    assert_eq!(report.summary.malformed_lines, 3);
    assert_eq!(report.summary.dropped_records, 3);

    // Every browser visit spans 17 minutes; ties rank by key
    let top = &report.engagement[0];
    assert_eq!(top.key, "10.0.0.1");
    assert_eq!(top.total_duration, Duration::minutes(51));
    assert_eq!(top.avg_session_time, Duration::minutes(17));
    assert_eq!(top.avg_unique_visits, 4.0);

    assert_eq!(report.unique_urls[0].unique_resources, 4);
    assert_eq!(report.unique_urls.last().unwrap().unique_resources, 1);
}

#[tokio::test]
async fn test_configured_gap_matches_swept_sessions() {
    let text = clustered_log();
    let ingest = parse_lines(text.lines());

    let report = PipelineRunner::new(SessionConfig::default())
        .unwrap()
        .run(ingest.events)
        .await
        .unwrap();

    assert_eq!(report.gap_source, GapSource::Configured);
    assert_eq!(report.gap_threshold_secs, 900.0);
    assert_eq!(report.summary.sessions, (BROWSERS + BOUNCERS) * VISITS);
    assert!(report.sweep.is_none());
}

#[tokio::test]
async fn test_sweep_over_flat_range_falls_back() {
    let ingest = parse_lines(clustered_log().lines());
    let config = SessionConfig {
        gap_threshold_secs: 1800,
        auto_select_gap: true,
        sweep: SweepConfig {
            start_secs: 600,
            end_secs: 1440,
            step_secs: 60,
        },
        ..Default::default()
    };

    let report = PipelineRunner::new(config)
        .unwrap()
        .run(ingest.events)
        .await
        .unwrap();

    assert_eq!(report.gap_source, GapSource::Fallback);
    assert_eq!(report.gap_threshold_secs, 1800.0);
    // 30 minutes merges each browser's visits into one session
    assert_eq!(report.summary.sessions, BROWSERS + BOUNCERS * VISITS);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["gap_source"], "fallback");
    assert_eq!(json["sweep"]["candidates"].as_array().unwrap().len(), 15);
}

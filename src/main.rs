//! Weblog Sessionizer
//!
//! Batch analytics over load-balancer access logs:
//! - Per-client sessionization by inactivity gap
//! - Session duration and unique-URL metrics
//! - Engagement ranking per client
//! - Optional data-driven selection of the inactivity gap

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use pipeline::{read_log_file, AnalyticsReport, PipelineRunner};
use session_core::{RankBy, SessionConfig};
use telemetry::{init_tracing_from_env, metrics};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct AppConfig {
    /// Access log to analyze; the first CLI argument overrides it
    #[serde(default = "default_input_path")]
    input_path: PathBuf,

    /// Include every session in the JSON report
    #[serde(default)]
    print_sessions: bool,

    /// How many engaged clients to log
    #[serde(default = "default_top_n")]
    top_n: usize,

    #[serde(default)]
    rank_by: RankBy,

    #[serde(default)]
    session: SessionConfig,
}

fn default_input_path() -> PathBuf {
    PathBuf::from("data/access.log")
}

fn default_top_n() -> usize {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            print_sessions: false,
            top_n: default_top_n(),
            rank_by: RankBy::default(),
            session: SessionConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Weblog Sessionizer v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config()?;
    if let Some(path) = std::env::args().nth(1) {
        config.input_path = PathBuf::from(path);
    }

    info!(
        input = %config.input_path.display(),
        gap_threshold_secs = config.session.gap_threshold_secs,
        auto_select_gap = config.session.auto_select_gap,
        rank_by = ?config.rank_by,
        "Loaded configuration"
    );

    let runner = PipelineRunner::new(config.session)
        .context("Invalid session configuration")?
        .with_rank_by(config.rank_by);

    let ingest = read_log_file(&config.input_path)
        .await
        .with_context(|| format!("Failed to read {}", config.input_path.display()))?;

    let mut report = runner
        .run_ingest(ingest)
        .await
        .context("Sessionization failed")?;

    log_top_engaged(&report, config.top_n);

    if !config.print_sessions {
        report.sessions.clear();
    }

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &report).context("Failed to write report")?;
    writeln!(stdout)?;

    let snapshot = metrics().snapshot();
    info!(
        lines_read = snapshot.lines_read,
        malformed_lines = snapshot.malformed_lines,
        events_rejected = snapshot.events_rejected,
        sessions_built = snapshot.sessions_built,
        sweep_candidates = snapshot.sweep_candidates_evaluated,
        sessionize_ms = snapshot.sessionize_latency_mean_ms,
        "Run complete"
    );

    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<AppConfig> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&AppConfig::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // SESSIONIZER_TOP_N, SESSIONIZER_SESSION__GAP_THRESHOLD_SECS, ...
        .add_source(
            config::Environment::with_prefix("SESSIONIZER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

fn log_top_engaged(report: &AnalyticsReport, n: usize) {
    info!(
        gap_secs = report.gap_threshold_secs,
        gap_source = ?report.gap_source,
        keys = report.summary.keys,
        sessions = report.summary.sessions,
        avg_session_secs = session_core::timing::duration_secs(report.summary.avg_session_time),
        dropped = report.summary.dropped_records,
        "Session summary"
    );

    for (rank, record) in report.engagement.iter().take(n).enumerate() {
        info!(
            rank = rank + 1,
            key = %record.key,
            total_secs = session_core::timing::duration_secs(record.total_duration),
            sessions = record.session_count,
            avg_session_secs = session_core::timing::duration_secs(record.avg_session_time),
            page_views = record.total_page_views,
            "Engaged client"
        );
    }
}

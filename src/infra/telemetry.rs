use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "feedline_decision_cache_hit_total",
            Unit::Count,
            "Total number of decision cache hits, labelled by cache."
        );
        describe_counter!(
            "feedline_decision_cache_miss_total",
            Unit::Count,
            "Total number of decision cache misses, labelled by cache."
        );
        describe_counter!(
            "feedline_timeline_ingest_total",
            Unit::Count,
            "Timeline ingest attempts, labelled by result (inserted|skipped)."
        );
        describe_counter!(
            "feedline_timeline_items_filtered_total",
            Unit::Count,
            "Candidates dropped while assembling a timeline page, labelled by reason."
        );
        describe_counter!(
            "feedline_timeline_pruned_total",
            Unit::Count,
            "Entries unprepared or removed by timeline pruning."
        );
        describe_gauge!(
            "feedline_timelines_active",
            Unit::Count,
            "Number of account timelines currently held in memory."
        );
        describe_histogram!(
            "feedline_timeline_get_ms",
            Unit::Milliseconds,
            "Timeline page assembly latency in milliseconds."
        );
        describe_histogram!(
            "feedline_timeline_sweep_ms",
            Unit::Milliseconds,
            "Sweep pass latency in milliseconds."
        );
    });
}

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
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
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
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
            "lectern_page_cache_requests_total",
            Unit::Count,
            "Page cache lookups, labelled by result (hit, stale, miss)."
        );
        describe_counter!(
            "lectern_page_cache_regenerations_total",
            Unit::Count,
            "Background page regenerations, labelled by outcome."
        );
        describe_counter!(
            "lectern_comments_created_total",
            Unit::Count,
            "Comment documents written to the content store."
        );
        describe_counter!(
            "lectern_comment_failures_total",
            Unit::Count,
            "Comment writes rejected by the content store."
        );
        describe_histogram!(
            "lectern_content_request_ms",
            Unit::Milliseconds,
            "Content store request latency in milliseconds."
        );
    });
}

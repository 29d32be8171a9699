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

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "fastly_purge_requests_total",
            Unit::Count,
            "Total number of purge requests sent to the CDN."
        );
        describe_counter!(
            "fastly_purge_failures_total",
            Unit::Count,
            "Total number of purge requests that failed or were rejected."
        );
        describe_histogram!(
            "fastly_purge_ms",
            Unit::Milliseconds,
            "Purge round-trip latency in milliseconds, excluding the pre-send delay."
        );
        describe_counter!(
            "fastly_cache_policy_total",
            Unit::Count,
            "Cache policy decisions by outcome (unchanged, uncacheable, edge)."
        );
    });
}

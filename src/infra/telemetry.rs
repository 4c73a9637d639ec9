use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge};
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
            "social_cache_hit_total",
            Unit::Count,
            "Entity reads served from the fast-path cache."
        );
        describe_counter!(
            "social_cache_miss_total",
            Unit::Count,
            "Entity reads that fell through to the authoritative store."
        );
        describe_counter!(
            "social_cache_error_total",
            Unit::Count,
            "Fast-path cache operations that failed or timed out."
        );
        describe_counter!(
            "social_cache_stale_total",
            Unit::Count,
            "Committed writes whose cached copy could be neither refreshed nor evicted."
        );
        describe_counter!(
            "social_version_conflict_total",
            Unit::Count,
            "Versioned updates that matched no row."
        );
        describe_counter!(
            "social_rate_limit_denied_total",
            Unit::Count,
            "Requests rejected by the per-client rate limiter."
        );
        describe_gauge!(
            "social_rate_limit_identities",
            Unit::Count,
            "Client identities currently tracked by the rate limiter."
        );
    });
}

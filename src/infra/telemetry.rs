use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::metric_names;
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Set up the process-wide subscriber. Events are written to stderr; stdout
/// carries rendered SVG.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("tracing subscriber already installed: {err}"))
        })
}

/// Register units and descriptions for every cache metric with the installed recorder.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            metric_names::MEMORY_HIT,
            Unit::Count,
            "Total number of diagrams served from the in-memory tier."
        );
        describe_counter!(
            metric_names::STORE_HIT,
            Unit::Count,
            "Total number of diagrams served from the persistent tier."
        );
        describe_counter!(
            metric_names::RENDER,
            Unit::Count,
            "Total number of diagram computations started after missing both tiers."
        );
        describe_counter!(
            metric_names::RENDER_ERROR,
            Unit::Count,
            "Total number of diagram computations that failed and were not cached."
        );
        describe_counter!(
            metric_names::MEMORY_EVICT,
            Unit::Count,
            "Total number of in-memory entries evicted to stay within the byte budget."
        );
        describe_counter!(
            metric_names::INFLIGHT_WAIT,
            Unit::Count,
            "Total number of callers that waited on another caller's computation."
        );
        describe_histogram!(
            metric_names::RENDER_MS,
            Unit::Milliseconds,
            "Diagram computation latency in milliseconds, failures included."
        );
    });
}

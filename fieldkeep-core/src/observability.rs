/*!
Logging setup and optional Prometheus metrics.

Metrics are compiled in with the `metrics` feature and live in a process-wide
registry; [`FieldkeepMetrics::global`] returns `None` if the registry could not
be built, in which case recording is skipped.
*/

#[cfg(feature = "metrics")]
use prometheus::{Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
#[cfg(feature = "metrics")]
use std::sync::OnceLock;
use tracing::subscriber::set_global_default;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry as TracingRegistry};

use crate::{FieldkeepError, Result};

#[cfg(feature = "metrics")]
static METRICS: OnceLock<Option<FieldkeepMetrics>> = OnceLock::new();

/// Counters and histograms for extraction and restoration
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct FieldkeepMetrics {
    pub extracted_fields_total: Counter,
    pub extraction_failures_total: CounterVec,
    pub restored_slots_total: Counter,
    pub unmatched_fields_total: Counter,
    pub restore_latency_seconds: Histogram,

    registry: Registry,
}

#[cfg(feature = "metrics")]
fn counter(registry: &Registry, name: &str, help: &str) -> Result<Counter> {
    let counter = Counter::new(name, help)
        .map_err(|e| FieldkeepError::validation(format!("Failed to create {name} metric: {e}")))?;
    registry
        .register(Box::new(counter.clone()))
        .map_err(|e| FieldkeepError::validation(format!("Failed to register {name}: {e}")))?;
    Ok(counter)
}

#[cfg(feature = "metrics")]
impl FieldkeepMetrics {
    fn new() -> Result<Self> {
        let registry = Registry::new();

        let extracted_fields_total = counter(
            &registry,
            "fieldkeep_extracted_fields_total",
            "Fields recorded in backup records",
        )?;
        let extraction_failures_total = CounterVec::new(
            Opts::new(
                "fieldkeep_extraction_failures_total",
                "Extraction strategies that failed and left their group empty",
            ),
            &["group"],
        )
        .map_err(|e| {
            FieldkeepError::validation(format!("Failed to create extraction_failures_total metric: {e}"))
        })?;
        registry
            .register(Box::new(extraction_failures_total.clone()))
            .map_err(|e| {
                FieldkeepError::validation(format!("Failed to register extraction_failures_total: {e}"))
            })?;
        let restored_slots_total = counter(
            &registry,
            "fieldkeep_restored_slots_total",
            "Slots filled inline during restoration",
        )?;
        let unmatched_fields_total = counter(
            &registry,
            "fieldkeep_unmatched_fields_total",
            "Candidate fields that found no slot",
        )?;

        let restore_latency_seconds = Histogram::with_opts(HistogramOpts::new(
            "fieldkeep_restore_latency_seconds",
            "Duration of document restorations in seconds",
        ))
        .map_err(|e| {
            FieldkeepError::validation(format!("Failed to create restore_latency_seconds metric: {e}"))
        })?;
        registry
            .register(Box::new(restore_latency_seconds.clone()))
            .map_err(|e| {
                FieldkeepError::validation(format!("Failed to register restore_latency_seconds: {e}"))
            })?;

        Ok(Self {
            extracted_fields_total,
            extraction_failures_total,
            restored_slots_total,
            unmatched_fields_total,
            restore_latency_seconds,
            registry,
        })
    }

    /// Process-wide metrics, built on first use
    pub fn global() -> Option<&'static FieldkeepMetrics> {
        METRICS
            .get_or_init(|| match Self::new() {
                Ok(metrics) => Some(metrics),
                Err(e) => {
                    tracing::warn!("Metrics disabled: {e}");
                    None
                }
            })
            .as_ref()
    }

    pub fn record_extracted_fields(&self, count: usize) {
        self.extracted_fields_total.inc_by(count as f64);
    }

    pub fn record_extraction_failure(&self, group: &str) {
        self.extraction_failures_total.with_label_values(&[group]).inc();
    }

    pub fn record_restored_slots(&self, count: usize) {
        self.restored_slots_total.inc_by(count as f64);
    }

    pub fn record_unmatched_fields(&self, count: usize) {
        self.unmatched_fields_total.inc_by(count as f64);
    }

    pub fn record_restore_latency(&self, duration: std::time::Duration) {
        self.restore_latency_seconds.observe(duration.as_secs_f64());
    }

    /// Gather metrics in Prometheus text format
    pub fn gather_metrics(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| FieldkeepError::validation(format!("Failed to encode metrics: {e}")))?;

        String::from_utf8(buffer)
            .map_err(|e| FieldkeepError::validation(format!("Failed to convert metrics to string: {e}")))
    }
}

/// Install the global tracing subscriber
///
/// The filter comes from `RUST_LOG` with `fieldkeep=info` added. With `json`
/// set, events are written as JSON lines; otherwise as plain text.
pub fn init_observability(json: bool) -> Result<()> {
    #[cfg(feature = "metrics")]
    FieldkeepMetrics::global();

    let directive: tracing_subscriber::filter::Directive = "fieldkeep=info"
        .parse()
        .map_err(|e| FieldkeepError::validation(format!("Invalid log directive: {e}")))?;
    let filter = EnvFilter::from_default_env().add_directive(directive);

    let result = if json {
        let subscriber = TracingRegistry::default().with(filter).with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(false)
                .with_current_span(false),
        );
        set_global_default(subscriber)
    } else {
        let subscriber = TracingRegistry::default()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false));
        set_global_default(subscriber)
    };
    result.map_err(|e| {
        FieldkeepError::validation(format!("Failed to set global tracing subscriber: {e}"))
    })?;

    tracing::debug!("fieldkeep observability initialized");
    Ok(())
}

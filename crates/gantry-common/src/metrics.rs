//! Metrics registry for Gantry observability
//!
//! OpenTelemetry instruments for:
//! - Reconciliation (duration, errors, object updates)
//! - Work queue depth
//! - DNS target derivation
//!
//! Instruments are no-ops until a meter provider is installed via
//! [`crate::telemetry::init_telemetry`], so recording from tests is safe.

use once_cell::sync::Lazy;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use opentelemetry::{global, KeyValue};

/// Global meter for Gantry metrics
static METER: Lazy<Meter> = Lazy::new(|| global::meter("gantry"));

/// Histogram of per-key reconciliation duration
///
/// Labels:
/// - `controller`: controller name
/// - `result`: success, error
pub static RECONCILE_DURATION: Lazy<Histogram<f64>> = Lazy::new(|| {
    METER
        .f64_histogram("gantry_reconcile_duration_seconds")
        .with_description("Duration of per-key reconciliation in seconds")
        .with_unit("s")
        .build()
});

/// Counter of reconciliation errors
///
/// Labels:
/// - `controller`: controller name
/// - `error_type`: transient, permanent
pub static RECONCILE_ERRORS: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("gantry_reconcile_errors_total")
        .with_description("Total number of reconciliation errors")
        .with_unit("{errors}")
        .build()
});

/// Counter of conditional updates issued to the backing store
///
/// Labels:
/// - `kind`: resource kind
pub static OBJECT_UPDATES: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("gantry_object_updates_total")
        .with_description("Total number of object updates issued")
        .with_unit("{updates}")
        .build()
});

/// Gauge of pending work queue items
///
/// Labels:
/// - `queue`: queue name
pub static QUEUE_DEPTH: Lazy<Gauge<i64>> = Lazy::new(|| {
    METER
        .i64_gauge("gantry_queue_depth")
        .with_description("Number of keys waiting in the work queue")
        .with_unit("{keys}")
        .build()
});

/// Counter of derived DNS targets
pub static DNS_TARGETS: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("gantry_dns_targets_total")
        .with_description("Total number of DNS targets derived from sync annotations")
        .with_unit("{targets}")
        .build()
});

/// Record one reconciliation pass
pub fn record_reconcile(controller: &str, result: &str, seconds: f64) {
    RECONCILE_DURATION.record(
        seconds,
        &[
            KeyValue::new("controller", controller.to_string()),
            KeyValue::new("result", result.to_string()),
        ],
    );
}

/// Record a reconciliation error of the given type (transient or permanent)
pub fn record_reconcile_error(controller: &str, error_type: &str) {
    RECONCILE_ERRORS.add(
        1,
        &[
            KeyValue::new("controller", controller.to_string()),
            KeyValue::new("error_type", error_type.to_string()),
        ],
    );
}

/// Record one conditional update issued for the given kind
pub fn record_object_update(kind: &str) {
    OBJECT_UPDATES.add(1, &[KeyValue::new("kind", kind.to_string())]);
}

/// Record the current depth of the named work queue
pub fn record_queue_depth(queue: &str, depth: i64) {
    QUEUE_DEPTH.record(depth, &[KeyValue::new("queue", queue.to_string())]);
}

/// Record DNS targets derived in one pass
pub fn record_dns_targets(count: u64) {
    if count > 0 {
        DNS_TARGETS.add(count, &[]);
    }
}

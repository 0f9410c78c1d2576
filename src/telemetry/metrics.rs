//! Metric instrument factories for refactor-relay.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"refactor-relay"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for refactor-relay instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("refactor-relay")
}

/// Counter: individual delivery attempts.
/// Labels: `target` ("primary" | "fallback"), `outcome`.
pub fn delivery_attempts() -> Counter<u64> {
    meter()
        .u64_counter("relay.delivery.attempts")
        .with_description("Number of delivery attempts per target")
        .build()
}

/// Counter: fire-and-forget sends that failed on every target.
/// Labels: `path`.
pub fn delivery_dropped() -> Counter<u64> {
    meter()
        .u64_counter("relay.delivery.dropped")
        .with_description("Background sends dropped after all targets failed")
        .build()
}

/// Histogram: whole-send duration in milliseconds, across all attempts.
/// Labels: `path`, `outcome`.
pub fn delivery_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("relay.delivery.duration_ms")
        .with_description("Send duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// Counter: event records produced by activity capture.
/// Labels: `type`.
pub fn capture_events() -> Counter<u64> {
    meter()
        .u64_counter("relay.capture.events")
        .with_description("Event records emitted by activity capture")
        .build()
}

/// Counter: timeline actions.
/// Labels: `action` ("flag" | "revert" | "refresh"), `result` ("ok" | "aborted" | "error").
pub fn timeline_actions() -> Counter<u64> {
    meter()
        .u64_counter("relay.timeline.actions")
        .with_description("Timeline actions issued from the view")
        .build()
}

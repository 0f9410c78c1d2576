//! Span helpers for backend sends.

use tracing::Span;

/// Start a span covering one send, across all of its attempts.
///
/// `relay.attempts` and `relay.outcome` are declared empty and filled by
/// [`record_send_outcome`].
pub fn start_send_span(path: &str, mode: &str) -> Span {
    tracing::info_span!(
        "relay.send",
        "relay.path" = path,
        "relay.mode" = mode,
        "relay.attempts" = tracing::field::Empty,
        "relay.outcome" = tracing::field::Empty,
    )
}

/// Record how a send ended on its span.
pub fn record_send_outcome(span: &Span, attempts: usize, outcome: &str) {
    span.record("relay.attempts", attempts as u64);
    span.record("relay.outcome", outcome);
}

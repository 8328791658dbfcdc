//! Time source.

/// Source of wall-clock epoch milliseconds.
///
/// Injected everywhere the tracker needs "now" so that tests can drive
/// time deterministically.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

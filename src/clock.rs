//! Page-clock timestamps.

use chrono::{SecondsFormat, Utc};

/// Current time as ISO-8601 with millisecond precision, matching
/// `Date.prototype.toISOString()` (e.g. `2025-03-01T12:00:00.000Z`).
///
/// On wasm32 `chrono` reads the page's `Date`, so timestamps follow the
/// instrumented context's clock.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

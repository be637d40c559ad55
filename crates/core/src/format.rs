//! Display formatting for session values.

use chrono::Duration;

/// Format an elapsed duration as `HH:MM`.
///
/// Hours are not capped at 24; negative durations render as `00:00`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_seconds = elapsed.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    format!("{hours:02}:{minutes:02}")
}

/// Format a monetary amount with two decimals, e.g. `$10.00`.
pub fn format_currency(amount: f64) -> String {
    format!("${amount:.2}")
}

/// Utility functions for timestamps and cycle timing
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[day].[month].[year] - [hour]:[minute]:[second]");
    dt.format(&format).unwrap_or_else(|_| dt.to_string())
}

/// ISO-8601 representation used for records
pub fn format_iso8601(dt: &OffsetDateTime) -> String {
    dt.format(&Rfc3339).unwrap_or_else(|_| dt.to_string())
}

/// Time left in the update interval after a cycle took `elapsed`
///
/// Zero when the cycle overran the interval.
pub fn next_sleep(update_interval: Duration, elapsed: Duration) -> Duration {
    update_interval.saturating_sub(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn sleep_is_remaining_interval() {
        assert_eq!(
            next_sleep(Duration::from_secs(300), Duration::from_secs(120)),
            Duration::from_secs(180)
        );
    }

    #[test]
    fn overrun_cycle_does_not_sleep() {
        assert_eq!(
            next_sleep(Duration::from_secs(300), Duration::from_secs(340)),
            Duration::ZERO
        );
        assert_eq!(
            next_sleep(Duration::from_secs(300), Duration::from_secs(300)),
            Duration::ZERO
        );
    }

    #[test]
    fn timestamps_are_formatted() {
        let dt = datetime!(2024-03-05 07:08:09 UTC);
        assert_eq!(format_datetime(&dt), "05.03.2024 - 07:08:09");
        assert_eq!(format_iso8601(&dt), "2024-03-05T07:08:09Z");
    }
}

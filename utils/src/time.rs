//! Time formatting helpers.

/// Format a duration in milliseconds to a short human-readable string,
/// rounding partial seconds up so a pending wait never reads as `0s`.
pub fn format_duration_ms(millis: u64) -> String {
    if millis < 1_000 {
        return format!("{}ms", millis);
    }
    let secs = millis.div_ceil(1_000);
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_common_waits() {
        assert_eq!(format_duration_ms(0), "0ms");
        assert_eq!(format_duration_ms(999), "999ms");
        assert_eq!(format_duration_ms(1_000), "1s");
        assert_eq!(format_duration_ms(29_001), "30s");
        assert_eq!(format_duration_ms(60_000), "1m 0s");
        assert_eq!(format_duration_ms(3_723_000), "1h 2m");
    }
}

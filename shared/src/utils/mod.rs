//! Utility functions and helpers

use anyhow::{Context, Result};
use std::time::Duration;

/// Parse a duration string (e.g., "250ms", "1s", "5m")
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    if let Some(num_str) = s.strip_suffix("ms") {
        let millis: u64 = num_str.trim().parse()?;
        Ok(Duration::from_millis(millis))
    } else if let Some(num_str) = s.strip_suffix('s') {
        let secs: f64 = num_str.trim().parse()?;
        Duration::try_from_secs_f64(secs).with_context(|| format!("Invalid duration: {}", s))
    } else if let Some(num_str) = s.strip_suffix('m') {
        let mins: u64 = num_str.trim().parse()?;
        let secs = mins
            .checked_mul(60)
            .with_context(|| format!("Duration too long: {}", s))?;
        Ok(Duration::from_secs(secs))
    } else {
        // Default to seconds if no suffix
        let secs: u64 = s.parse()?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("1s").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("5m").unwrap().as_secs(), 300);
        assert_eq!(parse_duration("2").unwrap().as_secs(), 2);
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("-1s").is_err());
        assert!(parse_duration("1h").is_err());
    }

    #[test]
    fn test_parse_duration_rejects_out_of_range() {
        assert!(parse_duration("1e30s").is_err());
        assert!(parse_duration("infs").is_err());
        assert!(parse_duration("NaNs").is_err());
        assert!(parse_duration("307445734561825861m").is_err());
    }
}

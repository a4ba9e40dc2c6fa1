/// Utility functions
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Extract number from JSON value, accepting numeric strings
pub fn num(v: &Value) -> Option<f64> {
    if let Some(x) = v.as_f64() {
        return Some(x);
    }
    if let Some(s) = v.as_str() {
        return s.trim().parse::<f64>().ok();
    }
    None
}

/// Parse an instant given as RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or unix seconds
pub fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = s.parse::<DateTime<Utc>>() {
        return Some(dt);
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&ndt));
    }
    if let Ok(n) = s.parse::<i64>() {
        return Utc.timestamp_opt(n, 0).single();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_from_float() {
        let json = serde_json::json!(42.5);
        assert_eq!(num(&json), Some(42.5));
    }

    #[test]
    fn test_num_from_string() {
        let json = serde_json::json!("37.5665");
        assert_eq!(num(&json), Some(37.5665));
    }

    #[test]
    fn test_num_from_invalid() {
        assert_eq!(num(&serde_json::json!("invalid")), None);
        assert_eq!(num(&serde_json::json!(null)), None);
    }

    #[test]
    fn test_parse_instant_iso_format() {
        let dt = parse_instant("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-15T10:30:00+00:00");
    }

    #[test]
    fn test_parse_instant_with_offset() {
        let dt = parse_instant("2024-01-15T19:30:00+09:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-15T10:30:00+00:00");
    }

    #[test]
    fn test_parse_instant_sql_format() {
        assert!(parse_instant("2024-01-15 10:30:00").is_some());
    }

    #[test]
    fn test_parse_instant_from_unix_timestamp() {
        let dt = parse_instant("1705315800").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-15T10:50:00+00:00");
    }

    #[test]
    fn test_parse_instant_invalid() {
        assert_eq!(parse_instant("yesterday"), None);
    }
}

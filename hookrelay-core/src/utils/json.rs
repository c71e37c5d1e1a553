//! Lookups into loosely shaped webhook payloads.

use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::{Rfc2822, Rfc3339};

/// Follow `path` through nested objects.
pub fn at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(key))
}

/// Non-empty string at `path`.
pub fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    at(value, path)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// First non-empty string among several paths.
pub fn first_str<'a>(value: &'a Value, paths: &[&[&str]]) -> Option<&'a str> {
    paths.iter().find_map(|path| str_at(value, path))
}

/// Integer at `path`.
pub fn int_at(value: &Value, path: &[&str]) -> Option<i64> {
    at(value, path).and_then(Value::as_i64)
}

/// Parse an RFC 3339 or RFC 2822 timestamp.
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    OffsetDateTime::parse(raw, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(raw, &Rfc2822))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_lookups() {
        let payload = json!({"repository": {"full_name": "acme/widgets", "name": ""}, "n": 7});
        assert_eq!(str_at(&payload, &["repository", "full_name"]), Some("acme/widgets"));
        assert_eq!(str_at(&payload, &["repository", "name"]), None);
        assert_eq!(
            first_str(&payload, &[&["repository", "name"], &["repository", "full_name"]]),
            Some("acme/widgets")
        );
        assert_eq!(int_at(&payload, &["n"]), Some(7));
        assert!(at(&payload, &["repository", "owner", "login"]).is_none());
    }

    #[test]
    fn test_parse_timestamp() {
        assert!(parse_timestamp("2024-05-01T12:30:00+02:00").is_some());
        assert!(parse_timestamp("Wed, 01 May 2024 10:30:00 +0000").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}

//! Generic webhooks: every top-level payload key becomes a field.

use super::registry::{ExtractInput, Extracted};
use crate::ingest::ParseError;
use crate::utils::json::{first_str, parse_timestamp};
use hookrelay_sdk::objects::FieldValue;

pub fn extract(input: &ExtractInput<'_>) -> Result<Extracted, ParseError> {
    let object = input.payload.as_object().ok_or(ParseError::NotAnObject)?;
    let fields = object
        .iter()
        .map(|(key, value)| (key.clone(), FieldValue::from_json(value)))
        .collect();
    let occurred_at = first_str(input.payload, &[&["timestamp"], &["time"]]).and_then(parse_timestamp);
    Ok(Extracted::event_at(fields, occurred_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookrelay_sdk::objects::SourcePlatform;
    use serde_json::json;

    #[test]
    fn test_all_keys_kept_in_order() {
        let payload = json!({
            "event": "build",
            "status": "failed",
            "details": {"stage": "test", "exit": 1},
            "tags": ["ci", "nightly"],
            "timestamp": "2024-05-01T08:00:00Z"
        });
        let Extracted::Event { fields, occurred_at } = extract(&ExtractInput {
            platform: &SourcePlatform::Generic,
            kind: "build",
            payload: &payload,
        })
        .unwrap() else {
            panic!("expected event");
        };
        assert_eq!(
            fields.names().collect::<Vec<_>>(),
            ["event", "status", "details", "tags", "timestamp"]
        );
        assert!(fields.get("details").and_then(FieldValue::as_map).is_some());
        assert!(occurred_at.is_some());
    }
}

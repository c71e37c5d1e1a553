//! Netlify deploy notifications.
//!
//! Only finished deploys are announced; building and enqueued states are
//! dropped without an event.

use super::registry::{ExtractInput, Extracted};
use crate::utils::json::{first_str, parse_timestamp, str_at};
use crate::ingest::ParseError;
use hookrelay_sdk::objects::{Fields, UNKNOWN_KIND};

pub const DEPLOY_KIND: &str = "deploy";

pub fn deploy(input: &ExtractInput<'_>) -> Result<Extracted, ParseError> {
    let payload = input.payload;
    let state = str_at(payload, &["state"]).unwrap_or(UNKNOWN_KIND);
    if !matches!(state, "ready" | "error") {
        return Ok(Extracted::no_event(format!("deploy state `{state}`")));
    }

    let mut fields = Fields::new();
    fields.insert_opt("site_name", first_str(payload, &[&["site_name"], &["name"]]));
    fields.insert_opt("site_id", str_at(payload, &["site_id"]));
    fields.insert("state", state);
    fields.insert_opt("deploy_id", first_str(payload, &[&["deploy_id"], &["id"]]));
    fields.insert_opt(
        "deploy_url",
        first_str(payload, &[&["deploy_ssl_url"], &["deploy_url"], &["ssl_url"], &["url"]]),
    );
    fields.insert_opt("build_id", str_at(payload, &["build_id"]));
    fields.insert_opt("branch", str_at(payload, &["branch"]));
    fields.insert_opt("error_message", str_at(payload, &["error_message"]));

    let occurred_at =
        first_str(payload, &[&["updated_at"], &["created_at"]]).and_then(parse_timestamp);
    Ok(Extracted::event_at(fields, occurred_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookrelay_sdk::objects::SourcePlatform;
    use serde_json::{Value, json};

    fn run(payload: &Value) -> Extracted {
        deploy(&ExtractInput {
            platform: &SourcePlatform::Netlify,
            kind: DEPLOY_KIND,
            payload,
        })
        .unwrap()
    }

    #[test]
    fn test_ready_and_error_produce_events() {
        for state in ["ready", "error"] {
            let payload = json!({"state": state, "name": "docs", "id": "d1", "site_id": "s1"});
            let Extracted::Event { fields, .. } = run(&payload) else {
                panic!("expected event for {state}");
            };
            assert_eq!(fields.text("state"), Some(state));
            assert_eq!(fields.text("site_name"), Some("docs"));
            assert_eq!(fields.text("deploy_id"), Some("d1"));
        }
    }

    #[test]
    fn test_other_states_are_skipped() {
        for payload in [json!({"state": "building"}), json!({})] {
            assert!(matches!(run(&payload), Extracted::NoEvent(_)));
        }
    }
}

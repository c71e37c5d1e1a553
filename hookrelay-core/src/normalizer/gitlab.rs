//! GitLab-specific extractors.
//!
//! GitLab nests the subject of most events under `object_attributes` and
//! names the acting user at the top level, so it cannot share the GitHub
//! shaped extractors beyond `push`.

use super::git::{assets, repository};
use super::registry::{ExtractInput, Extracted};
use crate::ingest::ParseError;
use crate::utils::json::{first_str, int_at, parse_timestamp, str_at};
use crate::utils::text::excerpt;
use hookrelay_sdk::objects::Fields;
use serde_json::Value;

fn attributes(payload: &Value) -> Result<&Value, ParseError> {
    payload
        .get("object_attributes")
        .filter(|a| a.is_object())
        .ok_or(ParseError::MissingField("object_attributes"))
}

fn actor(payload: &Value) -> Option<&str> {
    first_str(
        payload,
        &[&["user", "username"], &["user", "name"], &["user_username"], &["user_name"]],
    )
}

pub fn tag_push(input: &ExtractInput<'_>) -> Result<Extracted, ParseError> {
    let payload = input.payload;
    // A deleted tag has a null checkout sha.
    if str_at(payload, &["checkout_sha"]).is_none() {
        return Ok(Extracted::no_event("tag deleted"));
    }

    let mut fields = Fields::new();
    fields.insert_opt("repository", repository(payload));
    fields.insert_opt(
        "tag",
        str_at(payload, &["ref"]).map(|r| r.strip_prefix("refs/tags/").unwrap_or(r)),
    );
    fields.insert_opt("author", actor(payload));
    fields.insert_opt("message", str_at(payload, &["message"]).map(excerpt));
    fields.insert_opt("commit", str_at(payload, &["checkout_sha"]));
    Ok(Extracted::event(fields))
}

pub fn merge_request(input: &ExtractInput<'_>) -> Result<Extracted, ParseError> {
    let payload = input.payload;
    let attrs = attributes(payload)?;

    let mut fields = Fields::new();
    fields.insert_opt("repository", repository(payload));
    fields.insert_opt("number", int_at(attrs, &["iid"]));
    fields.insert_opt("title", str_at(attrs, &["title"]));
    fields.insert_opt("action", str_at(attrs, &["action"]));
    fields.insert_opt("state", str_at(attrs, &["state"]));
    fields.insert_opt("author", actor(payload));
    fields.insert_opt("url", str_at(attrs, &["url"]));
    fields.insert_opt("source_branch", str_at(attrs, &["source_branch"]));
    fields.insert_opt("target_branch", str_at(attrs, &["target_branch"]));
    fields.insert_opt("body", str_at(attrs, &["description"]).map(excerpt));

    let occurred_at = str_at(attrs, &["updated_at"]).and_then(parse_timestamp);
    Ok(Extracted::event_at(fields, occurred_at))
}

pub fn issues(input: &ExtractInput<'_>) -> Result<Extracted, ParseError> {
    let payload = input.payload;
    let attrs = attributes(payload)?;

    let mut fields = Fields::new();
    fields.insert_opt("repository", repository(payload));
    fields.insert_opt("number", int_at(attrs, &["iid"]));
    fields.insert_opt("title", str_at(attrs, &["title"]));
    fields.insert_opt("action", str_at(attrs, &["action"]));
    fields.insert_opt("state", str_at(attrs, &["state"]));
    fields.insert_opt("author", actor(payload));
    fields.insert_opt("url", str_at(attrs, &["url"]));
    fields.insert_opt("body", str_at(attrs, &["description"]).map(excerpt));

    let occurred_at = str_at(attrs, &["updated_at"]).and_then(parse_timestamp);
    Ok(Extracted::event_at(fields, occurred_at))
}

pub fn note(input: &ExtractInput<'_>) -> Result<Extracted, ParseError> {
    let payload = input.payload;
    let attrs = attributes(payload)?;
    let target = ["merge_request", "issue"]
        .iter()
        .find_map(|key| payload.get(*key).filter(|t| t.is_object()));

    let mut fields = Fields::new();
    fields.insert_opt("repository", repository(payload));
    fields.insert_opt("target", str_at(attrs, &["noteable_type"]));
    if let Some(target) = target {
        fields.insert_opt("number", int_at(target, &["iid"]));
        fields.insert_opt("title", str_at(target, &["title"]));
    }
    fields.insert_opt("author", actor(payload));
    fields.insert_opt("url", str_at(attrs, &["url"]));
    fields.insert_opt("body", str_at(attrs, &["note"]).map(excerpt));

    let occurred_at = str_at(attrs, &["created_at"]).and_then(parse_timestamp);
    Ok(Extracted::event_at(fields, occurred_at))
}

pub fn release(input: &ExtractInput<'_>) -> Result<Extracted, ParseError> {
    let payload = input.payload;
    if let Some(action) = str_at(payload, &["action"]) {
        if action != "create" {
            return Ok(Extracted::no_event(format!("release action `{action}`")));
        }
    }

    let mut fields = Fields::new();
    fields.insert_opt("repository", repository(payload));
    fields.insert_opt("tag", str_at(payload, &["tag"]));
    fields.insert_opt("name", str_at(payload, &["name"]));
    fields.insert_opt("url", str_at(payload, &["url"]));
    fields.insert_opt("author", actor(payload));
    fields.insert_opt("body", str_at(payload, &["description"]).map(excerpt));
    let links = payload
        .get("assets")
        .and_then(|a| a.get("links"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    fields.insert("assets", assets(links, "url"));

    let occurred_at =
        first_str(payload, &[&["released_at"], &["created_at"]]).and_then(parse_timestamp);
    Ok(Extracted::event_at(fields, occurred_at))
}

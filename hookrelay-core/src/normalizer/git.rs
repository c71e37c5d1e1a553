//! Extractors shared by GitHub, Gitea and Gogs, plus the push extractor
//! GitLab uses too.
//!
//! Field names are common to every Git host so the formatter can use one
//! template per kind.

use super::registry::{ExtractInput, Extracted};
use crate::ingest::ParseError;
use crate::utils::json::{first_str, int_at, parse_timestamp, str_at};
use crate::utils::text::{excerpt, first_line};
use hookrelay_sdk::objects::{FieldValue, Fields};
use serde_json::Value;

/// Objects summarized by [`fallback`] when present in the payload.
pub const WELL_KNOWN_OBJECTS: &[&str] = &[
    "pull_request",
    "issue",
    "comment",
    "release",
    "check_suite",
    "check_run",
    "deployment",
    "milestone",
    "label",
    "member",
    "forkee",
    "object_attributes",
];

/// Keys whose text is free-form and gets excerpted.
const FREE_TEXT_KEYS: &[&str] = &["body", "description", "message", "note"];

/// Repository display name across hosts.
pub(crate) fn repository(payload: &Value) -> Option<&str> {
    first_str(
        payload,
        &[
            &["repository", "full_name"],
            &["repository", "name"],
            &["project", "path_with_namespace"],
            &["project", "name"],
        ],
    )
}

/// Login of whoever triggered the event.
pub(crate) fn user_login(object: &Value) -> Option<&str> {
    first_str(
        object,
        &[
            &["user", "login"],
            &["user", "username"],
            &["user", "name"],
            &["sender", "login"],
            &["sender", "username"],
        ],
    )
}

fn branch_name(git_ref: &str) -> &str {
    git_ref.strip_prefix("refs/heads/").unwrap_or(git_ref)
}

pub fn push(input: &ExtractInput<'_>) -> Result<Extracted, ParseError> {
    let payload = input.payload;
    let commits = payload
        .get("commits")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if commits.is_empty() {
        return Ok(Extracted::no_event("push without commits"));
    }

    let head = payload
        .get("head_commit")
        .filter(|c| c.is_object())
        .or_else(|| commits.last());

    let mut fields = Fields::new();
    fields.insert_opt("repository", repository(payload));
    fields.insert_opt("branch", str_at(payload, &["ref"]).map(branch_name));
    if let Some(head) = head {
        fields.insert_opt("commit_message", str_at(head, &["message"]).map(first_line));
        fields.insert_opt(
            "author",
            first_str(head, &[&["author", "name"], &["author", "username"]]),
        );
        fields.insert_opt("commit_url", str_at(head, &["url"]));
    }
    let count = int_at(payload, &["total_commits_count"])
        .unwrap_or_else(|| i64::try_from(commits.len()).unwrap_or(i64::MAX));
    fields.insert("commit_count", count);
    fields.insert_opt(
        "compare_url",
        first_str(payload, &[&["compare_url"], &["compare"]]),
    );

    let occurred_at = head
        .and_then(|h| str_at(h, &["timestamp"]))
        .and_then(parse_timestamp);
    Ok(Extracted::event_at(fields, occurred_at))
}

/// Release asset list as `{name, download_url}` maps, in payload order.
pub(crate) fn assets(items: &[Value], url_key: &str) -> FieldValue {
    FieldValue::List(
        items
            .iter()
            .map(|asset| {
                let mut entry = Fields::new();
                entry.insert_opt("name", str_at(asset, &["name"]));
                entry.insert_opt("download_url", str_at(asset, &[url_key]));
                FieldValue::Map(entry)
            })
            .collect(),
    )
}

pub fn release(input: &ExtractInput<'_>) -> Result<Extracted, ParseError> {
    let payload = input.payload;
    if let Some(action) = str_at(payload, &["action"]) {
        if !matches!(action, "published" | "created") {
            return Ok(Extracted::no_event(format!("release action `{action}`")));
        }
    }
    let release = payload
        .get("release")
        .filter(|r| r.is_object())
        .ok_or(ParseError::MissingField("release"))?;

    let mut fields = Fields::new();
    fields.insert_opt("repository", repository(payload));
    fields.insert_opt("tag", str_at(release, &["tag_name"]));
    fields.insert_opt("name", str_at(release, &["name"]));
    fields.insert_opt("url", first_str(release, &[&["html_url"], &["url"]]));
    fields.insert_opt(
        "author",
        first_str(release, &[&["author", "login"], &["author", "username"]]),
    );
    if let Some(pre) = release.get("prerelease").and_then(Value::as_bool) {
        fields.insert("prerelease", pre.to_string());
    }
    fields.insert_opt("body", str_at(release, &["body"]).map(excerpt));
    let items = release
        .get("assets")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    fields.insert("assets", assets(items, "browser_download_url"));

    let occurred_at = first_str(release, &[&["published_at"], &["created_at"]])
        .and_then(parse_timestamp);
    Ok(Extracted::event_at(fields, occurred_at))
}

pub fn pull_request(input: &ExtractInput<'_>) -> Result<Extracted, ParseError> {
    let payload = input.payload;
    let pr = payload
        .get("pull_request")
        .filter(|p| p.is_object())
        .ok_or(ParseError::MissingField("pull_request"))?;

    let mut fields = Fields::new();
    fields.insert_opt("repository", repository(payload));
    fields.insert_opt(
        "number",
        int_at(pr, &["number"]).or_else(|| int_at(payload, &["number"])),
    );
    fields.insert_opt("title", str_at(pr, &["title"]));
    let merged = pr.get("merged").and_then(Value::as_bool).unwrap_or(false);
    let action = str_at(payload, &["action"]).map(|a| match a {
        "closed" if merged => "merged",
        other => other,
    });
    fields.insert_opt("action", action);
    fields.insert_opt("state", str_at(pr, &["state"]));
    fields.insert_opt("author", user_login(pr).or_else(|| user_login(payload)));
    fields.insert_opt("url", first_str(pr, &[&["html_url"], &["url"]]));
    fields.insert_opt("source_branch", str_at(pr, &["head", "ref"]));
    fields.insert_opt("target_branch", str_at(pr, &["base", "ref"]));
    fields.insert_opt("body", str_at(pr, &["body"]).map(excerpt));

    let occurred_at = first_str(pr, &[&["updated_at"], &["created_at"]]).and_then(parse_timestamp);
    Ok(Extracted::event_at(fields, occurred_at))
}

pub fn issues(input: &ExtractInput<'_>) -> Result<Extracted, ParseError> {
    let payload = input.payload;
    let issue = payload
        .get("issue")
        .filter(|i| i.is_object())
        .ok_or(ParseError::MissingField("issue"))?;

    let mut fields = Fields::new();
    fields.insert_opt("repository", repository(payload));
    fields.insert_opt("number", int_at(issue, &["number"]));
    fields.insert_opt("title", str_at(issue, &["title"]));
    fields.insert_opt("action", str_at(payload, &["action"]));
    fields.insert_opt("state", str_at(issue, &["state"]));
    fields.insert_opt("author", user_login(issue).or_else(|| user_login(payload)));
    fields.insert_opt("url", first_str(issue, &[&["html_url"], &["url"]]));
    fields.insert_opt("body", str_at(issue, &["body"]).map(excerpt));

    let occurred_at =
        first_str(issue, &[&["updated_at"], &["created_at"]]).and_then(parse_timestamp);
    Ok(Extracted::event_at(fields, occurred_at))
}

pub fn issue_comment(input: &ExtractInput<'_>) -> Result<Extracted, ParseError> {
    let payload = input.payload;
    let comment = payload
        .get("comment")
        .filter(|c| c.is_object())
        .ok_or(ParseError::MissingField("comment"))?;
    let issue = payload.get("issue");

    let mut fields = Fields::new();
    fields.insert_opt("repository", repository(payload));
    fields.insert_opt("number", issue.and_then(|i| int_at(i, &["number"])));
    fields.insert_opt("title", issue.and_then(|i| str_at(i, &["title"])));
    fields.insert_opt("action", str_at(payload, &["action"]));
    fields.insert_opt("author", user_login(comment).or_else(|| user_login(payload)));
    fields.insert_opt("url", first_str(comment, &[&["html_url"], &["url"]]));
    fields.insert_opt("body", str_at(comment, &["body"]).map(excerpt));

    let occurred_at =
        first_str(comment, &[&["updated_at"], &["created_at"]]).and_then(parse_timestamp);
    Ok(Extracted::event_at(fields, occurred_at))
}

pub fn ping(_: &ExtractInput<'_>) -> Result<Extracted, ParseError> {
    Ok(Extracted::no_event("ping"))
}

/// Scalar members of an object, plus the login or name of nested objects.
fn summarize(object: &serde_json::Map<String, Value>) -> Fields {
    let mut fields = Fields::new();
    for (key, value) in object {
        match value {
            Value::String(s) if s.is_empty() => {}
            Value::String(s) if FREE_TEXT_KEYS.contains(&key.as_str()) => {
                fields.insert(key.clone(), excerpt(s));
            }
            Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                fields.insert(key.clone(), FieldValue::from_json(value));
            }
            Value::Object(_) => {
                fields.insert_opt(
                    key.clone(),
                    first_str(value, &[&["login"], &["username"], &["name"]]),
                );
            }
            Value::Null | Value::Array(_) => {}
        }
    }
    fields
}

/// Kinds without a dedicated extractor.
///
/// The kind stays the literal discriminator; whichever well-known objects
/// the payload carries are summarized into the fields.
pub fn fallback(input: &ExtractInput<'_>) -> Result<Extracted, ParseError> {
    let payload = input.payload;
    let mut fields = Fields::new();
    fields.insert_opt("repository", repository(payload));
    fields.insert_opt("action", str_at(payload, &["action"]));
    for key in WELL_KNOWN_OBJECTS {
        if let Some(object) = payload.get(*key).and_then(Value::as_object) {
            fields.insert(*key, summarize(object));
        }
    }
    fields.insert_opt("sender", user_login(payload));
    Ok(Extracted::event(fields))
}

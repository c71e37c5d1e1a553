use super::{MISSING, field};
use hookrelay_sdk::objects::{FieldValue, NotificationEvent};
use std::fmt::Display;

fn header(event: &NotificationEvent, headline: &str) -> String {
    format!("[{}] {headline}\n", event.source_platform.display_name())
}

fn line(out: &mut String, label: &str, value: impl Display) {
    out.push_str(&format!("{label}: {value}\n"));
}

/// `label: value` line, skipped when the field is absent.
fn optional_line(out: &mut String, event: &NotificationEvent, label: &str, name: &str) {
    if let Some(value) = event.fields.get(name) {
        line(out, label, value);
    }
}

/// Free text as its own paragraph.
fn body(out: &mut String, event: &NotificationEvent, name: &str) {
    if let Some(text) = event.text(name).filter(|t| !t.trim().is_empty()) {
        out.push_str(&format!("\n{text}\n"));
    }
}

fn finish(out: String) -> String {
    out.trim_end().to_owned()
}

pub fn git_push(event: &NotificationEvent) -> String {
    let mut out = header(event, &format!("Push to {}", field(event, "repository")));
    line(&mut out, "Branch", field(event, "branch"));
    line(&mut out, "Author", field(event, "author"));
    line(&mut out, "Commits", field(event, "commit_count"));
    line(&mut out, "Message", field(event, "commit_message"));
    optional_line(&mut out, event, "Commit", "commit_url");
    optional_line(&mut out, event, "Compare", "compare_url");
    finish(out)
}

pub fn git_tag_push(event: &NotificationEvent) -> String {
    let mut out = header(
        event,
        &format!(
            "Tag {} pushed to {}",
            field(event, "tag"),
            field(event, "repository")
        ),
    );
    line(&mut out, "Author", field(event, "author"));
    optional_line(&mut out, event, "Commit", "commit");
    body(&mut out, event, "message");
    finish(out)
}

pub fn git_release(event: &NotificationEvent) -> String {
    let mut out = header(
        event,
        &format!("New release in {}", field(event, "repository")),
    );
    line(&mut out, "Tag", field(event, "tag"));
    optional_line(&mut out, event, "Name", "name");
    line(&mut out, "Author", field(event, "author"));
    if event.text("prerelease") == Some("true") {
        out.push_str("Pre-release: yes\n");
    }
    optional_line(&mut out, event, "URL", "url");

    let assets = event
        .fields
        .get("assets")
        .and_then(FieldValue::as_list)
        .unwrap_or_default();
    if !assets.is_empty() {
        out.push_str("Assets:\n");
        for asset in assets {
            let entry = asset.as_map();
            let name = entry.and_then(|m| m.text("name")).unwrap_or(MISSING);
            let link = entry.and_then(|m| m.text("download_url")).unwrap_or(MISSING);
            out.push_str(&format!("  - {name}: {link}\n"));
        }
    }
    body(&mut out, event, "body");
    finish(out)
}

pub fn git_pull_request(event: &NotificationEvent) -> String {
    let noun = if event.event_kind == "merge_request" {
        "Merge request"
    } else {
        "Pull request"
    };
    let mut out = header(
        event,
        &format!(
            "{noun} #{} {} in {}",
            field(event, "number"),
            field(event, "action"),
            field(event, "repository")
        ),
    );
    line(&mut out, "Title", field(event, "title"));
    line(&mut out, "Author", field(event, "author"));
    if event.fields.contains("source_branch") || event.fields.contains("target_branch") {
        let branches = format!(
            "{} -> {}",
            field(event, "source_branch"),
            field(event, "target_branch")
        );
        line(&mut out, "Branches", branches);
    }
    optional_line(&mut out, event, "URL", "url");
    body(&mut out, event, "body");
    finish(out)
}

pub fn git_issue(event: &NotificationEvent) -> String {
    let mut out = header(
        event,
        &format!(
            "Issue #{} {} in {}",
            field(event, "number"),
            field(event, "action"),
            field(event, "repository")
        ),
    );
    line(&mut out, "Title", field(event, "title"));
    line(&mut out, "Author", field(event, "author"));
    optional_line(&mut out, event, "URL", "url");
    body(&mut out, event, "body");
    finish(out)
}

pub fn git_comment(event: &NotificationEvent) -> String {
    let mut out = header(
        event,
        &format!(
            "New comment on #{} in {}",
            field(event, "number"),
            field(event, "repository")
        ),
    );
    optional_line(&mut out, event, "Title", "title");
    line(&mut out, "Author", field(event, "author"));
    optional_line(&mut out, event, "URL", "url");
    body(&mut out, event, "body");
    finish(out)
}

pub fn rss_article(event: &NotificationEvent) -> String {
    let mut out = format!("New article from {}\n", field(event, "feed_name"));
    line(&mut out, "Title", field(event, "title"));
    optional_line(&mut out, event, "Author", "author");
    optional_line(&mut out, event, "Published", "published");
    optional_line(&mut out, event, "Link", "url");
    body(&mut out, event, "description");
    finish(out)
}

pub fn rss_batch(event: &NotificationEvent) -> String {
    let mut out = format!(
        "{} new articles from {}\n",
        field(event, "total_articles"),
        field(event, "feed_name")
    );
    line(&mut out, "Latest", field(event, "title"));
    optional_line(&mut out, event, "Author", "author");
    optional_line(&mut out, event, "Link", "url");
    finish(out)
}

pub fn netlify_deploy(event: &NotificationEvent) -> String {
    let headline = match event.text("state") {
        Some("ready") => "Deploy succeeded",
        Some("error") => "Deploy failed",
        _ => "Deploy finished",
    };
    let mut out = header(event, &format!("{headline} for {}", field(event, "site_name")));
    line(&mut out, "State", field(event, "state"));
    optional_line(&mut out, event, "Branch", "branch");
    optional_line(&mut out, event, "Deploy URL", "deploy_url");
    optional_line(&mut out, event, "Deploy ID", "deploy_id");
    optional_line(&mut out, event, "Build ID", "build_id");
    optional_line(&mut out, event, "Error", "error_message");
    finish(out)
}

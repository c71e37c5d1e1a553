//! Message formatter.
//!
//! Renders a [`NotificationEvent`] into the text and subject every channel
//! sends. Templates are looked up by `(family, kind)`; Git hosts share one
//! family. Events without a template go through the generic rendering,
//! which lists every field. Formatting never fails: absent fields render as
//! `unknown`.

mod templates;

use hookrelay_sdk::objects::{FieldValue, NotificationEvent, SourcePlatform};

/// Placeholder for fields a template expects but the event lacks.
pub const MISSING: &str = "unknown";

/// What every channel receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub text: String,
    pub subject: String,
}

/// Template groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFamily {
    Git,
    Rss,
    Netlify,
    Generic,
}

impl TemplateFamily {
    pub fn of(platform: &SourcePlatform) -> Self {
        match platform {
            p if p.is_git_host() => TemplateFamily::Git,
            SourcePlatform::Rss => TemplateFamily::Rss,
            SourcePlatform::Netlify => TemplateFamily::Netlify,
            _ => TemplateFamily::Generic,
        }
    }
}

pub type Template = fn(&NotificationEvent) -> String;

pub struct MessageFormatter {
    templates: Vec<(TemplateFamily, &'static str, Template)>,
}

impl MessageFormatter {
    /// A formatter without templates; everything renders generically.
    pub fn empty() -> Self {
        Self {
            templates: Vec::new(),
        }
    }

    pub fn register(
        &mut self,
        family: TemplateFamily,
        kind: &'static str,
        template: Template,
    ) -> &mut Self {
        self.templates.push((family, kind, template));
        self
    }

    fn template(&self, family: TemplateFamily, kind: &str) -> Option<Template> {
        self.templates
            .iter()
            .find(|(f, k, _)| *f == family && *k == kind)
            .map(|(_, _, t)| *t)
    }

    pub fn format(&self, event: &NotificationEvent) -> RenderedMessage {
        let family = TemplateFamily::of(&event.source_platform);
        let text = match self.template(family, &event.event_kind) {
            Some(template) => template(event),
            None => render_generic(event),
        };
        RenderedMessage {
            text,
            subject: subject(family, event),
        }
    }
}

impl Default for MessageFormatter {
    fn default() -> Self {
        use TemplateFamily::*;
        let mut formatter = Self::empty();
        formatter
            .register(Git, "push", templates::git_push)
            .register(Git, "tag_push", templates::git_tag_push)
            .register(Git, "release", templates::git_release)
            .register(Git, "pull_request", templates::git_pull_request)
            .register(Git, "merge_request", templates::git_pull_request)
            .register(Git, "issues", templates::git_issue)
            .register(Git, "issue_comment", templates::git_comment)
            .register(Git, "note", templates::git_comment)
            .register(Rss, "article", templates::rss_article)
            .register(Rss, "article_batch", templates::rss_batch)
            .register(Netlify, "deploy", templates::netlify_deploy);
        formatter
    }
}

/// Display value of `name`, or [`MISSING`].
pub(crate) fn field(event: &NotificationEvent, name: &str) -> String {
    event
        .fields
        .get(name)
        .map(FieldValue::to_string)
        .unwrap_or_else(|| MISSING.to_owned())
}

fn subject(family: TemplateFamily, event: &NotificationEvent) -> String {
    let platform = event.source_platform.display_name();
    match family {
        TemplateFamily::Git => format!(
            "[{platform}] {}: {}",
            field(event, "repository"),
            event.event_kind
        ),
        TemplateFamily::Rss => format!("New article: {}", field(event, "title")),
        TemplateFamily::Netlify => format!(
            "Netlify {}: {}",
            field(event, "site_name"),
            field(event, "state")
        ),
        TemplateFamily::Generic => format!("New {platform} webhook notification"),
    }
}

/// Every field in order: scalars as `label: value`, nested values as a
/// `label:` line followed by indented pretty JSON.
pub fn render_generic(event: &NotificationEvent) -> String {
    let mut out = format!(
        "[{}] {} notification\n",
        event.source_platform.display_name(),
        event.event_kind
    );
    for (name, value) in event.fields.iter() {
        if value.is_scalar() {
            out.push_str(&format!("{name}: {value}\n"));
            continue;
        }
        out.push_str(&format!("{name}:\n"));
        let pretty = serde_json::to_string_pretty(&value.to_json())
            .unwrap_or_else(|_| value.to_string());
        for line in pretty.lines() {
            out.push_str(&format!("  {line}\n"));
        }
    }
    out.trim_end().to_owned()
}

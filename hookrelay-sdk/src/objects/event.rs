//! The canonical event every source is normalized into.

use super::fields::{FieldValue, Fields};
use serde::{Serialize, Serializer};
use std::fmt;
use time::OffsetDateTime;

/// Where an event came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourcePlatform {
    GitHub,
    GitLab,
    Gitea,
    Gogs,
    Rss,
    Generic,
    Netlify,
    /// A source without a dedicated adapter.
    Other(String),
}

impl SourcePlatform {
    pub fn as_str(&self) -> &str {
        match self {
            SourcePlatform::GitHub => "github",
            SourcePlatform::GitLab => "gitlab",
            SourcePlatform::Gitea => "gitea",
            SourcePlatform::Gogs => "gogs",
            SourcePlatform::Rss => "rss",
            SourcePlatform::Generic => "generic",
            SourcePlatform::Netlify => "netlify",
            SourcePlatform::Other(name) => name,
        }
    }

    /// Human-facing name used in message subjects.
    pub fn display_name(&self) -> &str {
        match self {
            SourcePlatform::GitHub => "GitHub",
            SourcePlatform::GitLab => "GitLab",
            SourcePlatform::Gitea => "Gitea",
            SourcePlatform::Gogs => "Gogs",
            SourcePlatform::Rss => "RSS",
            SourcePlatform::Generic => "Generic",
            SourcePlatform::Netlify => "Netlify",
            SourcePlatform::Other(name) => name,
        }
    }

    /// Git hosting platforms share templates and field names.
    pub fn is_git_host(&self) -> bool {
        matches!(
            self,
            SourcePlatform::GitHub
                | SourcePlatform::GitLab
                | SourcePlatform::Gitea
                | SourcePlatform::Gogs
        )
    }
}

impl fmt::Display for SourcePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SourcePlatform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Kind used when a source does not say what happened.
pub const UNKNOWN_KIND: &str = "unknown";

/// A normalized notification.
///
/// Built once by the normalizer or the feed poller and never mutated
/// afterwards. There is no id or receive timestamp, so normalizing the same
/// input twice yields equal events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationEvent {
    pub source_platform: SourcePlatform,
    pub event_kind: String,
    pub fields: Fields,
    #[serde(with = "time::serde::rfc3339::option")]
    pub occurred_at: Option<OffsetDateTime>,
}

impl NotificationEvent {
    pub fn new(source_platform: SourcePlatform, event_kind: impl Into<String>) -> Self {
        Self {
            source_platform,
            event_kind: event_kind.into(),
            fields: Fields::new(),
            occurred_at: None,
        }
    }

    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name, value);
        self
    }

    pub fn with_occurred_at(mut self, occurred_at: Option<OffsetDateTime>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    /// Text value of a field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.text(name)
    }
}

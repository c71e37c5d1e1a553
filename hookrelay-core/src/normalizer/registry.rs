//! Dispatch table from `(platform, event kind)` to an extractor.
//!
//! Supporting a new kind means registering one more function; existing
//! extractors are never edited for it. Each platform may also carry one
//! fallback that handles every kind without a dedicated entry.

use super::{generic, git, gitlab, netlify, rss};
use crate::ingest::ParseError;
use hookrelay_sdk::objects::{Fields, SourcePlatform};
use serde_json::Value;
use time::OffsetDateTime;

/// What an extractor reads.
#[derive(Debug, Clone, Copy)]
pub struct ExtractInput<'a> {
    pub platform: &'a SourcePlatform,
    pub kind: &'a str,
    pub payload: &'a Value,
}

/// What an extractor produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Event {
        fields: Fields,
        occurred_at: Option<OffsetDateTime>,
    },
    /// The payload is valid but carries nothing worth announcing.
    NoEvent(String),
}

impl Extracted {
    pub fn event(fields: Fields) -> Self {
        Extracted::Event {
            fields,
            occurred_at: None,
        }
    }

    pub fn event_at(fields: Fields, occurred_at: Option<OffsetDateTime>) -> Self {
        Extracted::Event {
            fields,
            occurred_at,
        }
    }

    pub fn no_event(reason: impl Into<String>) -> Self {
        Extracted::NoEvent(reason.into())
    }
}

pub type Extractor = fn(&ExtractInput<'_>) -> Result<Extracted, ParseError>;

/// Registered extractors.
///
/// Entries are few, so both tables are plain vectors scanned linearly.
#[derive(Clone)]
pub struct ExtractorRegistry {
    entries: Vec<(SourcePlatform, String, Extractor)>,
    fallbacks: Vec<(SourcePlatform, Extractor)>,
}

impl ExtractorRegistry {
    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            fallbacks: Vec::new(),
        }
    }

    /// Register `extractor` for `kind` on `platform`, replacing any previous entry.
    pub fn register(
        &mut self,
        platform: SourcePlatform,
        kind: impl Into<String>,
        extractor: Extractor,
    ) -> &mut Self {
        let kind = kind.into();
        match self
            .entries
            .iter_mut()
            .find(|(p, k, _)| *p == platform && *k == kind)
        {
            Some(entry) => entry.2 = extractor,
            None => self.entries.push((platform, kind, extractor)),
        }
        self
    }

    /// Register the extractor used for kinds of `platform` without an entry.
    pub fn register_fallback(&mut self, platform: SourcePlatform, extractor: Extractor) -> &mut Self {
        match self.fallbacks.iter_mut().find(|(p, _)| *p == platform) {
            Some(entry) => entry.1 = extractor,
            None => self.fallbacks.push((platform, extractor)),
        }
        self
    }

    /// Exact entry first, then the platform fallback.
    pub fn lookup(&self, platform: &SourcePlatform, kind: &str) -> Option<Extractor> {
        self.entries
            .iter()
            .find(|(p, k, _)| p == platform && k == kind)
            .map(|(_, _, f)| *f)
            .or_else(|| {
                self.fallbacks
                    .iter()
                    .find(|(p, _)| p == platform)
                    .map(|(_, f)| *f)
            })
    }

    /// Whether `kind` has a dedicated entry (fallbacks excluded).
    pub fn has_entry(&self, platform: &SourcePlatform, kind: &str) -> bool {
        self.entries
            .iter()
            .any(|(p, k, _)| p == platform && k == kind)
    }
}

impl Default for ExtractorRegistry {
    /// Every built-in extractor.
    fn default() -> Self {
        let mut registry = Self::empty();

        for host in [
            SourcePlatform::GitHub,
            SourcePlatform::Gitea,
            SourcePlatform::Gogs,
        ] {
            registry
                .register(host.clone(), "push", git::push)
                .register(host.clone(), "release", git::release)
                .register(host.clone(), "pull_request", git::pull_request)
                .register(host.clone(), "issues", git::issues)
                .register(host.clone(), "issue_comment", git::issue_comment)
                .register_fallback(host, git::fallback);
        }
        registry.register(SourcePlatform::GitHub, "ping", git::ping);

        registry
            .register(SourcePlatform::GitLab, "push", git::push)
            .register(SourcePlatform::GitLab, "tag_push", gitlab::tag_push)
            .register(SourcePlatform::GitLab, "merge_request", gitlab::merge_request)
            .register(SourcePlatform::GitLab, "issues", gitlab::issues)
            .register(SourcePlatform::GitLab, "note", gitlab::note)
            .register(SourcePlatform::GitLab, "release", gitlab::release)
            .register_fallback(SourcePlatform::GitLab, git::fallback);

        registry
            .register(SourcePlatform::Rss, rss::ARTICLE_KIND, rss::article)
            .register(SourcePlatform::Rss, rss::BATCH_KIND, rss::article_batch);

        registry.register(SourcePlatform::Netlify, netlify::DEPLOY_KIND, netlify::deploy);

        registry.register_fallback(SourcePlatform::Generic, generic::extract);

        registry
    }
}

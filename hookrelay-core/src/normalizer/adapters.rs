//! Per-platform knowledge that sits in front of the extractor registry:
//! which header carries the signature, under which scheme, whether a bad
//! signature blocks the request, and where the event kind is read from.

use crate::ingest::{ParseError, WebhookHeaders};
use crate::utils::json::first_str;
use hookrelay_sdk::objects::{SourcePlatform, UNKNOWN_KIND};
use hookrelay_sdk::signature::{
    GENERIC_SIGNATURE_HEADER, GITEA_SIGNATURE_HEADER, GITHUB_SHA1_HEADER, GITLAB_TOKEN_HEADER,
    GOGS_SIGNATURE_HEADER, HUB_SHA256_HEADER, NETLIFY_SIGNATURE_HEADER, RSS_SIGNATURE_HEADER,
    SignatureScheme,
};
use serde_json::Value;

pub const GITHUB_EVENT_HEADER: &str = "x-github-event";
pub const GITLAB_EVENT_HEADER: &str = "x-gitlab-event";
pub const GITEA_EVENT_HEADER: &str = "x-gitea-event";
pub const GOGS_EVENT_HEADER: &str = "x-gogs-event";

/// Whether a failed signature check stops the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationPolicy {
    /// Failure is `Unauthorized`.
    Enforced,
    /// Failure is logged and processing continues.
    Advisory,
}

pub trait SourceAdapter: Send + Sync {
    fn platform(&self) -> SourcePlatform;

    fn policy(&self) -> VerificationPolicy {
        VerificationPolicy::Enforced
    }

    /// Scheme and presented value to check.
    fn signature<'h>(&self, headers: &'h WebhookHeaders) -> (SignatureScheme, Option<&'h str>);

    /// Discriminator used for the registry lookup.
    fn event_kind(&self, headers: &WebhookHeaders, payload: &Value) -> Result<String, ParseError>;
}

/// Pick the Git host from its event header.
///
/// Gitea also sends GitHub and Gogs headers, and Gogs sends GitHub ones, so
/// the more specific hosts are checked first.
pub fn detect_git_host(headers: &WebhookHeaders) -> Option<SourcePlatform> {
    if headers.contains(GITEA_EVENT_HEADER) {
        Some(SourcePlatform::Gitea)
    } else if headers.contains(GOGS_EVENT_HEADER) {
        Some(SourcePlatform::Gogs)
    } else if headers.contains(GITLAB_EVENT_HEADER) {
        Some(SourcePlatform::GitLab)
    } else if headers.contains(GITHUB_EVENT_HEADER) {
        Some(SourcePlatform::GitHub)
    } else {
        None
    }
}

/// The adapter for `platform`, if there is one.
pub fn adapter_for(platform: &SourcePlatform) -> Option<&'static dyn SourceAdapter> {
    match platform {
        SourcePlatform::GitHub => Some(&GitHubAdapter),
        SourcePlatform::GitLab => Some(&GitLabAdapter),
        SourcePlatform::Gitea => Some(&GiteaAdapter),
        SourcePlatform::Gogs => Some(&GogsAdapter),
        SourcePlatform::Rss => Some(&RssAdapter),
        SourcePlatform::Netlify => Some(&NetlifyAdapter),
        SourcePlatform::Generic => Some(&GenericAdapter),
        SourcePlatform::Other(_) => None,
    }
}

fn header_kind(headers: &WebhookHeaders, name: &str) -> String {
    headers
        .get(name)
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .unwrap_or(UNKNOWN_KIND)
        .to_owned()
}

// ---------------------------------------------------------------------------
// Git hosts
// ---------------------------------------------------------------------------

pub struct GitHubAdapter;

impl SourceAdapter for GitHubAdapter {
    fn platform(&self) -> SourcePlatform {
        SourcePlatform::GitHub
    }

    fn signature<'h>(&self, headers: &'h WebhookHeaders) -> (SignatureScheme, Option<&'h str>) {
        match headers.get(HUB_SHA256_HEADER) {
            Some(sig) => (SignatureScheme::HmacSha256Prefixed, Some(sig)),
            None => (SignatureScheme::HmacSha1, headers.get(GITHUB_SHA1_HEADER)),
        }
    }

    fn event_kind(&self, headers: &WebhookHeaders, _: &Value) -> Result<String, ParseError> {
        Ok(header_kind(headers, GITHUB_EVENT_HEADER))
    }
}

pub struct GiteaAdapter;

impl SourceAdapter for GiteaAdapter {
    fn platform(&self) -> SourcePlatform {
        SourcePlatform::Gitea
    }

    fn signature<'h>(&self, headers: &'h WebhookHeaders) -> (SignatureScheme, Option<&'h str>) {
        (SignatureScheme::HmacSha256, headers.get(GITEA_SIGNATURE_HEADER))
    }

    fn event_kind(&self, headers: &WebhookHeaders, _: &Value) -> Result<String, ParseError> {
        Ok(header_kind(headers, GITEA_EVENT_HEADER))
    }
}

pub struct GogsAdapter;

impl SourceAdapter for GogsAdapter {
    fn platform(&self) -> SourcePlatform {
        SourcePlatform::Gogs
    }

    fn signature<'h>(&self, headers: &'h WebhookHeaders) -> (SignatureScheme, Option<&'h str>) {
        (SignatureScheme::HmacSha256, headers.get(GOGS_SIGNATURE_HEADER))
    }

    fn event_kind(&self, headers: &WebhookHeaders, _: &Value) -> Result<String, ParseError> {
        Ok(header_kind(headers, GOGS_EVENT_HEADER))
    }
}

pub struct GitLabAdapter;

impl GitLabAdapter {
    /// Map `X-Gitlab-Event` values onto the shared kind names.
    pub fn canonical_kind(header: &str) -> String {
        match header.trim() {
            "Push Hook" => "push".to_owned(),
            "Tag Push Hook" => "tag_push".to_owned(),
            "Merge Request Hook" => "merge_request".to_owned(),
            "Issue Hook" | "Confidential Issue Hook" => "issues".to_owned(),
            "Note Hook" | "Confidential Note Hook" => "note".to_owned(),
            "Release Hook" => "release".to_owned(),
            other => {
                let lowered = other.to_ascii_lowercase();
                let stem = lowered.strip_suffix(" hook").unwrap_or(&lowered);
                stem.trim().replace(' ', "_")
            }
        }
    }
}

impl SourceAdapter for GitLabAdapter {
    fn platform(&self) -> SourcePlatform {
        SourcePlatform::GitLab
    }

    fn signature<'h>(&self, headers: &'h WebhookHeaders) -> (SignatureScheme, Option<&'h str>) {
        (SignatureScheme::SharedToken, headers.get(GITLAB_TOKEN_HEADER))
    }

    fn event_kind(&self, headers: &WebhookHeaders, payload: &Value) -> Result<String, ParseError> {
        if let Some(header) = headers.get(GITLAB_EVENT_HEADER).filter(|h| !h.trim().is_empty()) {
            return Ok(Self::canonical_kind(header));
        }
        Ok(first_str(payload, &[&["object_kind"]])
            .unwrap_or(UNKNOWN_KIND)
            .to_owned())
    }
}

// ---------------------------------------------------------------------------
// Other sources
// ---------------------------------------------------------------------------

pub struct RssAdapter;

impl SourceAdapter for RssAdapter {
    fn platform(&self) -> SourcePlatform {
        SourcePlatform::Rss
    }

    fn policy(&self) -> VerificationPolicy {
        VerificationPolicy::Advisory
    }

    fn signature<'h>(&self, headers: &'h WebhookHeaders) -> (SignatureScheme, Option<&'h str>) {
        (
            SignatureScheme::HmacSha256OptionalPrefix,
            headers.get(RSS_SIGNATURE_HEADER),
        )
    }

    fn event_kind(&self, _: &WebhookHeaders, payload: &Value) -> Result<String, ParseError> {
        if payload.get("article").is_some_and(Value::is_object) {
            Ok(super::rss::ARTICLE_KIND.to_owned())
        } else if payload.get("articles").is_some_and(Value::is_array) {
            Ok(super::rss::BATCH_KIND.to_owned())
        } else {
            Err(ParseError::MissingField("article"))
        }
    }
}

pub struct NetlifyAdapter;

impl SourceAdapter for NetlifyAdapter {
    fn platform(&self) -> SourcePlatform {
        SourcePlatform::Netlify
    }

    fn signature<'h>(&self, headers: &'h WebhookHeaders) -> (SignatureScheme, Option<&'h str>) {
        (SignatureScheme::HmacSha256, headers.get(NETLIFY_SIGNATURE_HEADER))
    }

    fn event_kind(&self, _: &WebhookHeaders, _: &Value) -> Result<String, ParseError> {
        Ok(super::netlify::DEPLOY_KIND.to_owned())
    }
}

pub struct GenericAdapter;

impl SourceAdapter for GenericAdapter {
    fn platform(&self) -> SourcePlatform {
        SourcePlatform::Generic
    }

    fn signature<'h>(&self, headers: &'h WebhookHeaders) -> (SignatureScheme, Option<&'h str>) {
        let presented = headers
            .get(HUB_SHA256_HEADER)
            .or_else(|| headers.get(GENERIC_SIGNATURE_HEADER));
        (SignatureScheme::HmacSha256Prefixed, presented)
    }

    fn event_kind(&self, _: &WebhookHeaders, payload: &Value) -> Result<String, ParseError> {
        Ok(first_str(payload, &[&["event"], &["event_type"], &["type"]])
            .unwrap_or(UNKNOWN_KIND)
            .to_owned())
    }
}

//! Per-platform verification secrets.

use crate::objects::SourcePlatform;
use std::fmt;

/// Shared secrets used to verify inbound webhooks, one per platform.
///
/// An empty string disables verification for that platform. The `Debug`
/// output never contains the secret values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PlatformSecrets {
    pub github: String,
    pub gitlab: String,
    pub gitea: String,
    pub gogs: String,
    pub netlify: String,
    pub generic: String,
    pub rss: String,
}

impl PlatformSecrets {
    /// Secret for `platform`. Platforms without an adapter have none.
    pub fn for_platform(&self, platform: &SourcePlatform) -> &str {
        match platform {
            SourcePlatform::GitHub => &self.github,
            SourcePlatform::GitLab => &self.gitlab,
            SourcePlatform::Gitea => &self.gitea,
            SourcePlatform::Gogs => &self.gogs,
            SourcePlatform::Netlify => &self.netlify,
            SourcePlatform::Generic => &self.generic,
            SourcePlatform::Rss => &self.rss,
            SourcePlatform::Other(_) => "",
        }
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "<unset>" } else { "<redacted>" }
}

impl fmt::Debug for PlatformSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformSecrets")
            .field("github", &redact(&self.github))
            .field("gitlab", &redact(&self.gitlab))
            .field("gitea", &redact(&self.gitea))
            .field("gogs", &redact(&self.gogs))
            .field("netlify", &redact(&self.netlify))
            .field("generic", &redact(&self.generic))
            .field("rss", &redact(&self.rss))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_does_not_leak_secrets() {
        let secrets = PlatformSecrets {
            github: "gh-very-secret".into(),
            ..Default::default()
        };
        let printed = format!("{secrets:?}");
        assert!(!printed.contains("gh-very-secret"));
        assert!(printed.contains("<redacted>"));
        assert!(printed.contains("<unset>"));
    }

    #[test]
    fn test_lookup_by_platform() {
        let secrets = PlatformSecrets {
            gitea: "tea".into(),
            ..Default::default()
        };
        assert_eq!(secrets.for_platform(&SourcePlatform::Gitea), "tea");
        assert_eq!(secrets.for_platform(&SourcePlatform::GitHub), "");
        assert_eq!(secrets.for_platform(&SourcePlatform::Other("x".into())), "");
    }
}

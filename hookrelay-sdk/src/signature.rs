//! Signature schemes used by the webhook sources hookrelay accepts.
//!
//! Every scheme except [`SignatureScheme::SharedToken`] is an HMAC over the
//! raw request body, hex encoded:
//!
//! ```text
//! X-Hub-Signature:     sha1={hex}      (GitHub, legacy)
//! X-Hub-Signature-256: sha256={hex}    (GitHub, generic senders)
//! X-Gitea-Signature:   {hex}           (Gitea, Gogs, Netlify)
//! X-Rss-Signature:     [sha256=]{hex}  (RSS push)
//! X-Gitlab-Token:      {secret}        (GitLab)
//! ```
//!
//! An empty secret disables verification for that source. All comparisons
//! go through [`ring::hmac::verify`], so they run in constant time.

use ring::hmac;

/// Legacy GitHub signature header (`sha1=`).
pub const GITHUB_SHA1_HEADER: &str = "x-hub-signature";
/// GitHub and generic sender signature header (`sha256=`).
pub const HUB_SHA256_HEADER: &str = "x-hub-signature-256";
/// Alternative generic sender signature header (`sha256=`).
pub const GENERIC_SIGNATURE_HEADER: &str = "x-signature";
/// Gitea signature header (bare hex).
pub const GITEA_SIGNATURE_HEADER: &str = "x-gitea-signature";
/// Gogs signature header (bare hex).
pub const GOGS_SIGNATURE_HEADER: &str = "x-gogs-signature";
/// Netlify signature header (bare hex).
pub const NETLIFY_SIGNATURE_HEADER: &str = "x-webhook-signature";
/// RSS push signature header (optional `sha256=`).
pub const RSS_SIGNATURE_HEADER: &str = "x-rss-signature";
/// GitLab shared token header.
pub const GITLAB_TOKEN_HEADER: &str = "x-gitlab-token";

/// How a presented signature relates to the secret and the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    /// `sha1=` + hex HMAC-SHA1. The prefix is mandatory.
    HmacSha1,
    /// Bare hex HMAC-SHA256.
    HmacSha256,
    /// `sha256=` + hex HMAC-SHA256. The prefix is mandatory.
    HmacSha256Prefixed,
    /// Hex HMAC-SHA256, `sha256=` stripped when present.
    HmacSha256OptionalPrefix,
    /// The presented value must equal the secret.
    SharedToken,
}

impl SignatureScheme {
    fn algorithm(self) -> hmac::Algorithm {
        match self {
            SignatureScheme::HmacSha1 => hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
            _ => hmac::HMAC_SHA256,
        }
    }

    /// Remove the scheme prefix, failing when a mandatory prefix is absent.
    fn strip<'a>(self, presented: &'a str) -> Result<&'a str, SignatureError> {
        match self {
            SignatureScheme::HmacSha1 => presented
                .strip_prefix("sha1=")
                .ok_or(SignatureError::InvalidFormat),
            SignatureScheme::HmacSha256Prefixed => presented
                .strip_prefix("sha256=")
                .ok_or(SignatureError::InvalidFormat),
            SignatureScheme::HmacSha256OptionalPrefix => {
                Ok(presented.strip_prefix("sha256=").unwrap_or(presented))
            }
            SignatureScheme::HmacSha256 | SignatureScheme::SharedToken => Ok(presented),
        }
    }
}

/// Errors produced by signature checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature header is missing")]
    Missing,
    #[error("invalid signature format")]
    InvalidFormat,
    #[error("signature mismatch")]
    Mismatch,
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::Mismatch
    }
}

/// Result of a successful check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// The presented value matched.
    Verified,
    /// No secret is configured, nothing was checked.
    Skipped,
}

/// Check `presented` against `secret` and `raw_body` under `scheme`.
///
/// `presented` is `None` when the request carried no signature header.
pub fn check(
    raw_body: &[u8],
    secret: &str,
    presented: Option<&str>,
    scheme: SignatureScheme,
) -> Result<Verification, SignatureError> {
    if secret.is_empty() {
        return Ok(Verification::Skipped);
    }
    let presented = presented
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or(SignatureError::Missing)?;

    if scheme == SignatureScheme::SharedToken {
        // Compare tags of both values so the comparison stays constant time.
        let key = hmac::Key::new(hmac::HMAC_SHA256, b"hookrelay-shared-token");
        let expected = hmac::sign(&key, secret.as_bytes());
        hmac::verify(&key, presented.as_bytes(), expected.as_ref())?;
        return Ok(Verification::Verified);
    }

    let digest = hex::decode(scheme.strip(presented)?).map_err(|_| SignatureError::InvalidFormat)?;
    let key = hmac::Key::new(scheme.algorithm(), secret.as_bytes());
    hmac::verify(&key, raw_body, &digest)?;
    Ok(Verification::Verified)
}

/// Boolean form of [`check`]: `true` when verified or skipped.
pub fn verify(
    raw_body: &[u8],
    secret: &str,
    presented: Option<&str>,
    scheme: SignatureScheme,
) -> bool {
    check(raw_body, secret, presented, scheme).is_ok()
}

/// Produce the header value a sender would present for `raw_body`.
pub fn sign(raw_body: &[u8], secret: &str, scheme: SignatureScheme) -> String {
    if scheme == SignatureScheme::SharedToken {
        return secret.to_owned();
    }
    let key = hmac::Key::new(scheme.algorithm(), secret.as_bytes());
    let digest = hex::encode(hmac::sign(&key, raw_body).as_ref());
    match scheme {
        SignatureScheme::HmacSha1 => format!("sha1={digest}"),
        SignatureScheme::HmacSha256Prefixed | SignatureScheme::HmacSha256OptionalPrefix => {
            format!("sha256={digest}")
        }
        SignatureScheme::HmacSha256 | SignatureScheme::SharedToken => digest,
    }
}

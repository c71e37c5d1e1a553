//! Event normalizer.
//!
//! Turns an [`InboundWebhook`] into a [`NotificationEvent`]:
//!
//! 1. Resolve the platform from the route hint or the Git host headers
//! 2. Check the signature under the adapter's [`VerificationPolicy`]
//! 3. Decode the body and read the event kind
//! 4. Run the extractor registered for `(platform, kind)`
//!
//! Normalizing is a pure function of the request and the secrets: the same
//! request always yields an equal result.

pub mod adapters;
pub mod generic;
pub mod git;
pub mod gitlab;
pub mod netlify;
pub mod registry;
pub mod rss;

pub use adapters::{SourceAdapter, VerificationPolicy, adapter_for, detect_git_host};
pub use registry::{ExtractInput, Extracted, Extractor, ExtractorRegistry};

use crate::ingest::{InboundWebhook, ParseError, PlatformHint, decode_payload};
use hookrelay_sdk::config::PlatformSecrets;
use hookrelay_sdk::objects::{NotificationEvent, SourcePlatform};
use hookrelay_sdk::signature::{self, SignatureError, Verification};
use kanau::processor::Processor;
use thiserror::Error;
use tracing::{debug, warn};

/// Outcome of a request that was understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Event(NotificationEvent),
    /// Valid and authentic, but nothing to announce.
    NoEvent {
        platform: SourcePlatform,
        reason: String,
    },
}

/// Errors that stop a request.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The body could not be decoded or lacks a required part.
    #[error("invalid payload: {0}")]
    Parse(#[from] ParseError),

    /// No adapter matches the request.
    #[error("unable to determine the source platform")]
    UnknownPlatform,

    /// An enforced signature check failed.
    #[error("{platform} signature rejected: {source}")]
    Unauthorized {
        platform: SourcePlatform,
        source: SignatureError,
    },
}

/// Verifies, decodes and maps inbound webhooks.
pub struct Normalizer {
    secrets: PlatformSecrets,
    registry: ExtractorRegistry,
}

impl Normalizer {
    /// A normalizer with every built-in extractor.
    pub fn new(secrets: PlatformSecrets) -> Self {
        Self::with_registry(secrets, ExtractorRegistry::default())
    }

    pub fn with_registry(secrets: PlatformSecrets, registry: ExtractorRegistry) -> Self {
        Self { secrets, registry }
    }

    pub fn normalize(&self, inbound: &InboundWebhook) -> Result<Normalized, NormalizeError> {
        let platform = match &inbound.hint {
            PlatformHint::Fixed(platform) => platform.clone(),
            PlatformHint::DetectGitHost => {
                detect_git_host(&inbound.headers).ok_or(NormalizeError::UnknownPlatform)?
            }
        };
        let adapter = adapter_for(&platform).ok_or(NormalizeError::UnknownPlatform)?;

        if inbound.raw_body.iter().all(u8::is_ascii_whitespace) {
            return Err(ParseError::EmptyBody.into());
        }

        self.verify(adapter, inbound)?;

        let payload = decode_payload(inbound.headers.content_type(), &inbound.raw_body)?;
        let kind = adapter.event_kind(&inbound.headers, &payload)?;

        let Some(extractor) = self.registry.lookup(&platform, &kind) else {
            debug!(platform = %platform, kind = %kind, "No extractor registered");
            return Ok(Normalized::NoEvent {
                platform,
                reason: format!("unsupported event kind `{kind}`"),
            });
        };

        if !self.registry.has_entry(&platform, &kind) {
            debug!(platform = %platform, kind = %kind, "Using platform fallback extractor");
        }

        let extracted = extractor(&ExtractInput {
            platform: &platform,
            kind: &kind,
            payload: &payload,
        })?;

        Ok(match extracted {
            Extracted::Event {
                fields,
                occurred_at,
            } => Normalized::Event(
                NotificationEvent::new(platform, kind)
                    .with_fields(fields)
                    .with_occurred_at(occurred_at),
            ),
            Extracted::NoEvent(reason) => {
                debug!(platform = %platform, kind = %kind, reason = %reason, "Nothing to announce");
                Normalized::NoEvent { platform, reason }
            }
        })
    }

    fn verify(
        &self,
        adapter: &dyn SourceAdapter,
        inbound: &InboundWebhook,
    ) -> Result<(), NormalizeError> {
        let platform = adapter.platform();
        let secret = self.secrets.for_platform(&platform);
        let (scheme, presented) = adapter.signature(&inbound.headers);

        match signature::check(&inbound.raw_body, secret, presented, scheme) {
            Ok(Verification::Verified) => {
                debug!(platform = %platform, "Signature verified");
                Ok(())
            }
            Ok(Verification::Skipped) => {
                warn!(platform = %platform, "No secret configured, signature not checked");
                Ok(())
            }
            Err(e) => match adapter.policy() {
                VerificationPolicy::Enforced => {
                    warn!(platform = %platform, error = %e, "Rejecting webhook");
                    Err(NormalizeError::Unauthorized {
                        platform,
                        source: e,
                    })
                }
                VerificationPolicy::Advisory => {
                    warn!(
                        platform = %platform,
                        error = %e,
                        "Signature check failed, continuing because verification is advisory"
                    );
                    Ok(())
                }
            },
        }
    }
}

impl Processor<InboundWebhook> for Normalizer {
    type Output = Normalized;
    type Error = NormalizeError;

    async fn process(&self, event: InboundWebhook) -> Result<Normalized, NormalizeError> {
        self.normalize(&event)
    }
}

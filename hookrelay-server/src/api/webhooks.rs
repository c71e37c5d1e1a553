//! Webhook intake handlers.
//!
//! # Endpoints
//!
//! - `POST /webhook/git`     – GitHub, GitLab, Gitea or Gogs, detected from headers
//! - `POST /webhook/generic` – any JSON sender
//! - `POST /webhook/rss`     – RSS push services
//! - `POST /webhook/netlify` – Netlify deploy notifications
//!
//! Handlers normalize synchronously, queue the event for delivery and
//! answer right away; delivery happens in the background.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use hookrelay_core::ingest::{InboundWebhook, PlatformHint};
use hookrelay_core::normalizer::{NormalizeError, Normalized};
use hookrelay_sdk::objects::SourcePlatform;
use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;

use crate::api::extractors::RawWebhook;
use crate::state::AppState;

/// Build the webhook router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/git", post(git_webhook))
        .route("/generic", post(generic_webhook))
        .route("/rss", post(rss_webhook))
        .route("/netlify", post(netlify_webhook))
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_kind: Option<String>,
}

async fn git_webhook(
    State(state): State<AppState>,
    webhook: RawWebhook,
) -> Result<impl IntoResponse, WebhookApiError> {
    accept(&state, PlatformHint::DetectGitHost, webhook)
}

async fn generic_webhook(
    State(state): State<AppState>,
    webhook: RawWebhook,
) -> Result<impl IntoResponse, WebhookApiError> {
    accept(&state, PlatformHint::Fixed(SourcePlatform::Generic), webhook)
}

async fn rss_webhook(
    State(state): State<AppState>,
    webhook: RawWebhook,
) -> Result<impl IntoResponse, WebhookApiError> {
    accept(&state, PlatformHint::Fixed(SourcePlatform::Rss), webhook)
}

async fn netlify_webhook(
    State(state): State<AppState>,
    webhook: RawWebhook,
) -> Result<impl IntoResponse, WebhookApiError> {
    accept(&state, PlatformHint::Fixed(SourcePlatform::Netlify), webhook)
}

fn accept(
    state: &AppState,
    hint: PlatformHint,
    webhook: RawWebhook,
) -> Result<(StatusCode, Json<AcceptedResponse>), WebhookApiError> {
    let inbound = InboundWebhook::new(hint, webhook.headers, webhook.body);

    match state.normalizer.normalize(&inbound)? {
        Normalized::Event(event) => {
            let platform = event.source_platform.to_string();
            let event_kind = event.event_kind.clone();
            state.events.try_send(event).map_err(|e| match e {
                TrySendError::Full(_) => WebhookApiError::QueueFull,
                TrySendError::Closed(_) => WebhookApiError::Unavailable,
            })?;

            tracing::info!(platform = %platform, kind = %event_kind, "Webhook accepted");
            Ok((
                StatusCode::ACCEPTED,
                Json(AcceptedResponse {
                    message: "event queued for delivery".to_owned(),
                    platform: Some(platform),
                    event_kind: Some(event_kind),
                }),
            ))
        }
        Normalized::NoEvent { platform, reason } => {
            tracing::info!(platform = %platform, reason = %reason, "Webhook produced no event");
            Ok((
                StatusCode::ACCEPTED,
                Json(AcceptedResponse {
                    message: reason,
                    platform: Some(platform.to_string()),
                    event_kind: None,
                }),
            ))
        }
    }
}

/// Errors that can occur in webhook handlers.
#[derive(Debug)]
pub enum WebhookApiError {
    Normalize(NormalizeError),
    /// The delivery worker is gone.
    Unavailable,
    /// The delivery worker is behind and the event queue has no free slot.
    QueueFull,
}

impl From<NormalizeError> for WebhookApiError {
    fn from(err: NormalizeError) -> Self {
        WebhookApiError::Normalize(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        match self {
            WebhookApiError::Normalize(e @ NormalizeError::Unauthorized { .. }) => {
                tracing::warn!(error = %e, "Webhook rejected");
                (StatusCode::UNAUTHORIZED, "signature verification failed").into_response()
            }
            WebhookApiError::Normalize(e) => {
                tracing::warn!(error = %e, "Webhook could not be parsed");
                (StatusCode::BAD_REQUEST, e.to_string()).into_response()
            }
            WebhookApiError::Unavailable => {
                tracing::error!("Event channel closed, cannot queue webhook event");
                (StatusCode::SERVICE_UNAVAILABLE, "delivery unavailable").into_response()
            }
            WebhookApiError::QueueFull => {
                tracing::warn!("Event queue full, rejecting webhook");
                (StatusCode::SERVICE_UNAVAILABLE, "delivery queue full").into_response()
            }
        }
    }
}

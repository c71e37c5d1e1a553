//! Custom Axum extractors for webhook intake.
//!
//! `RawWebhook` captures the headers and the exact body bytes. Signatures
//! are computed over the raw bytes, so the body must not be parsed before
//! the normalizer sees it.

use axum::{
    extract::{FromRequest, Request},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use hookrelay_core::ingest::WebhookHeaders;

use crate::state::AppState;

/// Largest accepted webhook body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub struct RawWebhook {
    pub headers: WebhookHeaders,
    pub body: Bytes,
}

#[derive(Debug, thiserror::Error)]
pub enum RawWebhookError {
    #[error("failed to read request body")]
    BodyReadError,
}

impl IntoResponse for RawWebhookError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            RawWebhookError::BodyReadError => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "failed to read request body",
            ),
        };
        (status, message).into_response()
    }
}

/// Headers with non-UTF-8 values are dropped.
fn collect_headers(map: &HeaderMap) -> WebhookHeaders {
    map.iter()
        .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?)))
        .collect()
}

impl FromRequest<AppState> for RawWebhook {
    type Rejection = RawWebhookError;

    async fn from_request(req: Request, _state: &AppState) -> Result<Self, Self::Rejection> {
        let headers = collect_headers(req.headers());
        let body = axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|_| RawWebhookError::BodyReadError)?;
        Ok(RawWebhook { headers, body })
    }
}

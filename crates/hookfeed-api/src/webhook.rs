// Webhook intake route
//
// The body is taken as raw bytes: the signature covers the exact payload, so
// nothing may parse or re-encode it before verification.

use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, DefaultBodyLimit, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use hookfeed_core::{FeedError, InboundDelivery, IngestOutcome};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::common::{ApiError, ErrorResponse};
use crate::AppState;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const DELIVERY_HEADER: &str = "x-github-delivery";
pub const EVENT_HEADER: &str = "x-github-event";

/// GitHub caps webhook payloads at 25 MB
const MAX_PAYLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Create webhook routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/webhook", post(receive_webhook))
        .layer(DefaultBodyLimit::max(MAX_PAYLOAD_BYTES))
        .with_state(state)
}

/// Outcome of a webhook delivery
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookResponse {
    /// One of "received", "duplicate", "ignored".
    #[schema(example = "received")]
    pub status: String,
    /// Identifier of the newly stored event (only for "received").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<i64>,
}

impl From<IngestOutcome> for WebhookResponse {
    fn from(outcome: IngestOutcome) -> Self {
        Self {
            status: outcome.status().to_string(),
            event_id: outcome.event_id(),
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// POST /api/webhook - Receive a signed GitHub delivery
#[utoipa::path(
    post,
    path = "/api/webhook",
    request_body(content = String, description = "Raw GitHub webhook payload", content_type = "application/json"),
    params(
        ("X-Hub-Signature-256" = String, Header, description = "sha256=<hex HMAC of the body>"),
        ("X-GitHub-Delivery" = String, Header, description = "Delivery identifier"),
        ("X-GitHub-Event" = String, Header, description = "Notification type")
    ),
    responses(
        (status = 200, description = "Delivery processed", body = WebhookResponse),
        (status = 400, description = "Missing headers or malformed payload", body = ErrorResponse),
        (status = 401, description = "Invalid signature", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "webhook"
)]
pub async fn receive_webhook(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let delivery = InboundDelivery {
        raw_payload: body.to_vec(),
        signature: header_value(&headers, SIGNATURE_HEADER),
        delivery_id: header_value(&headers, DELIVERY_HEADER),
        source_kind: header_value(&headers, EVENT_HEADER),
    };

    match state
        .pipeline
        .ingest(&delivery, state.webhook_secret.as_bytes())
        .await
    {
        Ok(outcome) => Ok(Json(outcome.into())),
        Err(err) => {
            match &err {
                FeedError::Unauthorized => {
                    let remote_addr = connect_info
                        .map(|ConnectInfo(addr)| addr.to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    tracing::warn!(remote_addr = %remote_addr, "Rejected webhook with invalid signature");
                }
                FeedError::Storage(_) | FeedError::Internal(_) => {
                    tracing::error!(
                        delivery_id = %delivery.delivery_id,
                        error = %err,
                        "Failed to ingest webhook"
                    );
                }
                _ => {
                    tracing::info!(
                        delivery_id = %delivery.delivery_id,
                        category = err.category(),
                        error = %err,
                        "Rejected webhook"
                    );
                }
            }
            Err(err.into())
        }
    }
}

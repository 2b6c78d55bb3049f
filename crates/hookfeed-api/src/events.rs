// Event history and live stream routes
//
// History is served from the store; the live stream is fed by the broadcast
// hub and only carries events stored after the client connected.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        IntoResponse,
    },
    routing::get,
    Json, Router,
};
use futures::{Stream, StreamExt};
use hookfeed_core::{EventPage, PageRequest};
use serde::Deserialize;
use std::convert::Infallible;
use utoipa::IntoParams;

use crate::auth::AuthUser;
use crate::common::{ApiError, ErrorResponse};
use crate::AppState;

/// SSE event name for every live message
pub const NEW_EVENT: &str = "new_event";

/// Create event routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/events", get(list_events))
        .route("/api/events/stream", get(stream_events))
        .route("/api/events/:id", get(get_event))
        .with_state(state)
}

// ============================================
// Query Parameters
// ============================================

/// Query parameters for the events list
///
/// Values are taken as strings so that non-numeric input falls back to the
/// defaults instead of being rejected.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct EventsQuery {
    /// Page number, starting at 1. Defaults to 1.
    #[param(example = "1")]
    pub page: Option<String>,
    /// Page size, 1 to 100. Defaults to 20.
    #[param(example = "20")]
    pub per_page: Option<String>,
    /// Only return events of this notification type (e.g. "issues", "pull_request").
    #[param(example = "issues")]
    pub event_type: Option<String>,
}

// ============================================
// HTTP Handlers
// ============================================

/// GET /api/events - List stored events, newest first
#[utoipa::path(
    get,
    path = "/api/events",
    params(EventsQuery),
    responses(
        (status = 200, description = "Page of events", body = EventPage),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn list_events(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventPage>, ApiError> {
    let request = PageRequest::from_query(query.page.as_deref(), query.per_page.as_deref());

    let page = state
        .query
        .list(request, query.event_type.as_deref())
        .await
        .map_err(|e| {
            tracing::error!("Failed to list events: {}", e);
            ApiError::from(e)
        })?;

    Ok(Json(page))
}

/// GET /api/events/{id} - Get one event
#[utoipa::path(
    get,
    path = "/api/events/{id}",
    params(("id" = i64, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event found", body = hookfeed_core::Event),
        (status = 400, description = "Invalid event id", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn get_event(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<hookfeed_core::Event>, ApiError> {
    let id: i64 = id
        .parse()
        .map_err(|_| ApiError::bad_request("invalid event id"))?;

    let event = state.query.get(id).await.map_err(|e| {
        tracing::error!(event_id = id, "Failed to get event: {}", e);
        ApiError::from(e)
    })?;

    event
        .map(Json)
        .ok_or_else(|| ApiError::not_found("event not found"))
}

/// GET /api/events/stream - Live event stream (SSE)
///
/// Every message has event name `new_event` and the event JSON as data.
/// Events stored before the connection opened are not replayed.
#[utoipa::path(
    get,
    path = "/api/events/stream",
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream"),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn stream_events(
    user: AuthUser,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let subscription = state.hub.subscribe().await;
    tracing::info!(
        subscriber_id = subscription.id(),
        subject = %user.subject,
        "Live stream opened"
    );

    // Dropping the stream (client disconnect) drops the subscription,
    // which unregisters it from the hub
    let stream = sse_stream(subscription);

    (
        [(header::CACHE_CONTROL, "no-cache")],
        Sse::new(stream).keep_alive(KeepAlive::default()),
    )
}

fn sse_stream(
    subscription: hookfeed_core::Subscription,
) -> impl Stream<Item = Result<SseEvent, Infallible>> {
    subscription.map(|frame| Ok(SseEvent::default().event(NEW_EVENT).data(frame)))
}

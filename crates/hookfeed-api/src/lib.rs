// Hookfeed API
// Decision: One shared AppState; the auth gate reads its AuthState through FromRef
// Decision: Webhook intake and health are public; history and live stream are gated

pub mod auth;
pub mod common;
pub mod config;
pub mod events;
pub mod health;
pub mod webhook;

use std::sync::Arc;

use axum::extract::FromRef;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use hookfeed_core::{EventStore, HubHandle, IngestionPipeline, QueryService};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{AuthConfig, AuthState};

/// App state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
    pub hub: HubHandle,
    pub pipeline: IngestionPipeline,
    pub query: QueryService,
    pub webhook_secret: Arc<str>,
    pub auth: AuthState,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EventStore>,
        hub: HubHandle,
        webhook_secret: &str,
        auth_config: AuthConfig,
    ) -> Self {
        Self {
            pipeline: IngestionPipeline::new(store.clone(), Arc::new(hub.clone())),
            query: QueryService::new(store.clone()),
            store,
            hub,
            webhook_secret: Arc::from(webhook_secret),
            auth: AuthState::new(auth_config),
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(input: &AppState) -> Self {
        input.auth.clone()
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        webhook::receive_webhook,
        events::list_events,
        events::get_event,
        events::stream_events,
        health::health,
    ),
    components(
        schemas(
            hookfeed_core::Event,
            hookfeed_core::EventKind,
            hookfeed_core::EventPage,
            hookfeed_core::Pagination,
            webhook::WebhookResponse,
            health::HealthResponse,
            health::HealthChecks,
            common::ErrorResponse,
        )
    ),
    tags(
        (name = "webhook", description = "Signed GitHub webhook intake"),
        (name = "events", description = "Event history and live stream (SSE)"),
        (name = "health", description = "Service health")
    ),
    info(
        title = "Hookfeed API",
        version = "0.1.0",
        description = "Ingests GitHub webhooks and serves them as history and a live feed",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;

/// Build the full application router
pub fn build_router(state: AppState, frontend_url: &str) -> Router {
    let app = Router::new()
        .merge(health::routes(state.clone()))
        .merge(webhook::routes(state.clone()))
        .merge(events::routes(state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    let app = match frontend_url.parse::<HeaderValue>() {
        Ok(origin) => app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::exact(origin))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::AUTHORIZATION,
                    header::ACCEPT,
                    header::ORIGIN,
                    header::CACHE_CONTROL,
                ])
                .allow_credentials(true),
        ),
        Err(_) => {
            tracing::warn!(frontend_url, "Invalid FRONTEND_URL; CORS not configured");
            app
        }
    };

    security_headers(app)
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
}

fn security_headers(app: Router) -> Router {
    app.layer(SetResponseHeaderLayer::overriding(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    ))
    .layer(SetResponseHeaderLayer::overriding(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    ))
    .layer(SetResponseHeaderLayer::overriding(
        header::X_FRAME_OPTIONS,
        HeaderValue::from_static("DENY"),
    ))
    .layer(SetResponseHeaderLayer::overriding(
        header::X_XSS_PROTECTION,
        HeaderValue::from_static("1; mode=block"),
    ))
}

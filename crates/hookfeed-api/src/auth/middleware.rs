// Authentication extractor for read endpoints
// Decision: Support both cookie-based (dashboard) and header-based (API) tokens
// Decision: In "none" mode, create an anonymous principal

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::CookieJar;
use serde::Serialize;
use std::sync::Arc;

use super::{
    config::{AuthConfig, AuthMode},
    jwt::JwtService,
};

/// Cookie carrying the access token for browser clients
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Authentication error
#[derive(Debug, Clone, Serialize)]
pub struct AuthError {
    pub error: String,
    #[serde(skip)]
    pub status: StatusCode,
}

impl AuthError {
    pub fn unauthorized(message: &str) -> Self {
        Self {
            error: message.to_string(),
            status: StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Authenticated principal extracted from request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Principal identifier (token subject)
    pub subject: String,
    /// Authentication method used
    pub auth_method: AuthMethod,
}

impl AuthUser {
    /// Create an anonymous principal for no-auth mode
    pub fn anonymous() -> Self {
        Self {
            subject: "anonymous".to_string(),
            auth_method: AuthMethod::None,
        }
    }
}

/// Authentication method used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// No authentication (anonymous)
    None,
    /// JWT access token
    Jwt,
}

/// Auth state shared across routes
#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub jwt_service: Arc<JwtService>,
}

impl AuthState {
    pub fn new(config: AuthConfig) -> Self {
        let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));
        Self {
            config,
            jwt_service,
        }
    }
}

/// Extractor for an authenticated principal
/// This is required - returns 401 if not authenticated
#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        extract_auth_user(parts, &auth_state)
    }
}

/// Extract authenticated principal from request
fn extract_auth_user(parts: &Parts, auth_state: &AuthState) -> Result<AuthUser, AuthError> {
    // In no-auth mode, always return anonymous principal
    if auth_state.config.mode == AuthMode::None {
        return Ok(AuthUser::anonymous());
    }

    // Try to extract from Authorization header first
    if let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| AuthError::unauthorized("Invalid authorization header"))?;

        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return validate_jwt_token(token, auth_state);
        }
    }

    // Try to extract from cookie (for the dashboard)
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(ACCESS_TOKEN_COOKIE) {
        return validate_jwt_token(cookie.value(), auth_state);
    }

    // No valid credentials found
    Err(AuthError::unauthorized("Authentication required"))
}

/// Validate JWT token and return principal
fn validate_jwt_token(token: &str, auth_state: &AuthState) -> Result<AuthUser, AuthError> {
    let claims = auth_state
        .jwt_service
        .validate_access_token(token)
        .map_err(|e| {
            tracing::debug!("JWT validation failed: {}", e);
            AuthError::unauthorized("Invalid or expired token")
        })?;

    Ok(AuthUser {
        subject: claims.sub,
        auth_method: AuthMethod::Jwt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header_name: Option<(&str, String)>) -> Parts {
        let mut builder = Request::builder().uri("/api/events");
        if let Some((name, value)) = header_name {
            builder = builder.header(name, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_auth_user_anonymous() {
        let user = AuthUser::anonymous();
        assert_eq!(user.subject, "anonymous");
        assert_eq!(user.auth_method, AuthMethod::None);
    }

    #[test]
    fn test_none_mode_allows_everything() {
        let state = AuthState::new(AuthConfig::default());
        let user = extract_auth_user(&parts_with(None), &state).unwrap();
        assert_eq!(user, AuthUser::anonymous());
    }

    #[test]
    fn test_jwt_mode_requires_credentials() {
        let state = AuthState::new(AuthConfig::jwt("secret"));
        let err = extract_auth_user(&parts_with(None), &state).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.error, "Authentication required");
    }

    #[test]
    fn test_jwt_mode_bearer_token() {
        let state = AuthState::new(AuthConfig::jwt("secret"));
        let token = state.jwt_service.generate_access_token("ops").unwrap();

        let parts = parts_with(Some(("authorization", format!("Bearer {token}"))));
        let user = extract_auth_user(&parts, &state).unwrap();

        assert_eq!(user.subject, "ops");
        assert_eq!(user.auth_method, AuthMethod::Jwt);
    }

    #[test]
    fn test_jwt_mode_cookie_token() {
        let state = AuthState::new(AuthConfig::jwt("secret"));
        let token = state.jwt_service.generate_access_token("browser").unwrap();

        let parts = parts_with(Some(("cookie", format!("{ACCESS_TOKEN_COOKIE}={token}"))));
        let user = extract_auth_user(&parts, &state).unwrap();

        assert_eq!(user.subject, "browser");
    }

    #[test]
    fn test_jwt_mode_bad_token() {
        let state = AuthState::new(AuthConfig::jwt("secret"));
        let parts = parts_with(Some(("authorization", "Bearer nope".to_string())));

        let err = extract_auth_user(&parts, &state).unwrap_err();
        assert_eq!(err.error, "Invalid or expired token");
    }

    #[test]
    fn test_auth_error_body() {
        let json = serde_json::to_value(AuthError::unauthorized("Authentication required")).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Authentication required" }));
    }
}

//! Authentication for the patient registry
//!
//! Token issuing and validation, password hashing, the bearer middleware
//! that guards the patient and search routes, and auth event logging.

use serde::{Deserialize, Serialize};

#[cfg(feature = "with-axum")]
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
#[cfg(feature = "with-axum")]
use std::sync::Arc;
#[cfg(feature = "with-axum")]
use tracing::{debug, warn};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

// JWT handling
pub mod token;

// bcrypt password hashes
pub mod password;

// Structured auth event logging
pub mod logging;

pub use token::{SecurityError, TokenManager, TokenType};

#[cfg(feature = "with-axum")]
use crate::auth::logging::{log_auth_event, AuthEvent, AuthEventType};

/// Claims carried by access and refresh tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Issued at (as timestamp)
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

/// Caller identity placed in request extensions by [`auth_middleware`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct AuthenticatedUser {
    pub username: String,
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Read the bearer token from request headers
#[cfg(feature = "with-axum")]
pub fn bearer_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
}

/// 401 response shared by the middleware and the token endpoints
#[cfg(feature = "with-axum")]
pub fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))],
        Json(serde_json::json!({
            "error": "unauthorized",
            "message": message,
        })),
    )
        .into_response()
}

/// Authentication middleware for protected routes
///
/// Accepts only access tokens. On success the [`AuthenticatedUser`] and the
/// decoded [`Claims`] are inserted into the request extensions.
#[cfg(feature = "with-axum")]
pub async fn auth_middleware(
    State(tokens): State<Arc<TokenManager>>,
    mut req: Request,
    next: Next,
) -> Response {
    let request_path = req.uri().path().to_string();
    let start_time = std::time::Instant::now();

    let reject = |details: String| {
        let event = AuthEvent::new(AuthEventType::TokenValidation, None, false)
            .with_details(details)
            .with_resource(request_path.clone())
            .with_duration(start_time.elapsed().as_millis() as u64)
            .with_auth_method("access_token");
        log_auth_event(event);
        unauthorized("Not authenticated")
    };

    let Some(token) = bearer_from_headers(req.headers()) else {
        debug!("Missing or malformed Authorization header");
        return reject("Missing or malformed Authorization header".to_string());
    };

    match tokens.validate_typed(token, TokenType::Access) {
        Ok(claims) => {
            let event = AuthEvent::new(AuthEventType::TokenValidation, Some(&claims.sub), true)
                .with_resource(request_path.clone())
                .with_duration(start_time.elapsed().as_millis() as u64)
                .with_auth_method("access_token");
            log_auth_event(event);

            req.extensions_mut().insert(AuthenticatedUser {
                username: claims.sub.clone(),
            });
            req.extensions_mut().insert(claims);

            next.run(req).await
        }
        Err(e) => {
            warn!("Rejected bearer token on {}: {}", request_path, e);
            reject(e.to_string())
        }
    }
}

/// Apply CORS and security headers to the whole application
#[cfg(feature = "with-web")]
pub fn configure_security(app: axum::Router) -> axum::Router {
    use axum::http::{HeaderName, Method};
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::set_header::SetResponseHeaderLayer;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("x-permitted-cross-domain-policies"),
            HeaderValue::from_static("none"),
        ));

    app.layer(cors).layer(security_headers)
}

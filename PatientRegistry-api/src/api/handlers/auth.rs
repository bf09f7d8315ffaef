use axum::{
    extract::{rejection::{JsonRejection, QueryRejection}, FromRequest, Query, Request, State},
    http::{header, HeaderMap},
    Form, Json,
};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::IntoParams;

use patient_registry_domain::auth::bearer_from_headers;
use patient_registry_domain::entities::user::{
    LoginRequest, RegisterRequest, TokenPair, TokenVerification, UserResponse,
};

use crate::api::routes::AppState;
use crate::entities::ErrorResponse;

/// Query for `/auth/refresh`
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RefreshQuery {
    /// Refresh token; the `Authorization: Bearer` header is used when absent
    pub refresh_token: Option<String>,
}

/// Query for `/auth/verify`
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyQuery {
    /// Access or refresh token to check
    pub token: Option<String>,
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

/// Create an account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid data, or email or username taken", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ErrorResponse> {
    let Json(request) = payload?;
    let user = state.users.register(request).await?;
    info!("Registered user {}", user.username);
    Ok(Json(user))
}

/// Exchange a username and password for a token pair
///
/// Takes an OAuth2 password form or the same fields as JSON.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body(content = LoginRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token pair issued", body = TokenPair),
        (status = 400, description = "Malformed credentials", body = ErrorResponse),
        (status = 401, description = "Incorrect username or password", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<TokenPair>, ErrorResponse> {
    let credentials = if is_json(request.headers()) {
        let Json(body) = Json::<LoginRequest>::from_request(request, &()).await?;
        body
    } else {
        let Form(body) = Form::<LoginRequest>::from_request(request, &()).await?;
        body
    };

    Ok(Json(state.users.login(credentials).await?))
}

/// Trade a refresh token for a new pair
#[utoipa::path(
    post,
    path = "/auth/refresh",
    params(RefreshQuery),
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Could not validate credentials", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip(state, headers, query))]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<RefreshQuery>, QueryRejection>,
) -> Result<Json<TokenPair>, ErrorResponse> {
    let Query(query) = query?;
    let token = query
        .refresh_token
        .filter(|token| !token.is_empty())
        .or_else(|| bearer_from_headers(&headers).map(str::to_string))
        .ok_or_else(|| ErrorResponse::unauthorized("Could not validate credentials"))?;

    Ok(Json(state.users.refresh(&token).await?))
}

/// Account behind the bearer access token
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current account", body = UserResponse),
        (status = 400, description = "Inactive user", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "auth"
)]
#[instrument(skip(state, headers))]
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, ErrorResponse> {
    let token = bearer_from_headers(&headers)
        .ok_or_else(|| ErrorResponse::unauthorized("Not authenticated"))?;

    Ok(Json(state.users.current_user(token).await?))
}

/// Check a token and report its subject
#[utoipa::path(
    post,
    path = "/auth/verify",
    params(VerifyQuery),
    responses(
        (status = 200, description = "Token is valid", body = TokenVerification),
        (status = 401, description = "Invalid token", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip(state, query))]
pub async fn verify(
    State(state): State<AppState>,
    query: Result<Query<VerifyQuery>, QueryRejection>,
) -> Result<Json<TokenVerification>, ErrorResponse> {
    let Query(query) = query?;
    let token = query
        .token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ErrorResponse::validation_error("token: field required", None))?;

    Ok(Json(state.users.verify(&token).await?))
}

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use tracing::{debug, instrument, warn};

use patient_registry_domain::entities::search::{
    SearchQuery, SearchResponse, SuggestionsQuery, SuggestionsResponse,
};

use crate::api::routes::AppState;
use crate::entities::ErrorResponse;

/// Search patients with filters, sorting and relevance scores
#[utoipa::path(
    get,
    path = "/search/patients",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching patients", body = SearchResponse),
        (status = 400, description = "Invalid search parameters", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "search"
)]
#[instrument(skip(state, query))]
pub async fn search_patients(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<SearchResponse>, ErrorResponse> {
    let Query(query) = query?;
    let criteria = query.into_criteria().map_err(|message| {
        warn!("Rejected search parameters: {}", message);
        ErrorResponse::validation_error(message, None)
    })?;

    let response = state.search.search(criteria).await?;
    debug!(
        "Search matched {} patients in {:.2}ms",
        response.total, response.query_time_ms
    );
    Ok(Json(response))
}

/// Autocomplete values for conditions, medications, allergies or cities
#[utoipa::path(
    get,
    path = "/search/suggestions",
    params(SuggestionsQuery),
    responses(
        (status = 200, description = "Suggested values", body = SuggestionsResponse),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
    ),
    security(
        ("bearer" = [])
    ),
    tag = "search"
)]
#[instrument(skip(state, query))]
pub async fn suggestions(
    State(state): State<AppState>,
    query: Result<Query<SuggestionsQuery>, QueryRejection>,
) -> Result<Json<SuggestionsResponse>, ErrorResponse> {
    let Query(query) = query?;
    let limit = query
        .limit()
        .map_err(|message| ErrorResponse::validation_error(message, None))?;

    Ok(Json(
        state
            .search
            .suggestions(&query.field, &query.prefix, limit)
            .await?,
    ))
}

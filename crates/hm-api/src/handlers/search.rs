use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use hm_common::api::search_request::SearchRequest;
use hm_common::api::search_response::SearchResponse;
use hm_common::run_id;
use tracing::info;

use crate::error::ApiError;
use crate::{MAX_SEARCH_RESULTS, SharedState};

/// Loads the current pool and returns the best matches for the query string.
///
/// One `now` snapshot is taken per request so every candidate is compared
/// against the same instant.
pub async fn search_handymen(
    State(state): State<SharedState>,
    Query(request): Query<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let limit = request.limit(state.config.default_max, MAX_SEARCH_RESULTS)?;
    let query = request.to_query();
    let now = Utc::now();

    let source = state.source.clone();
    let engine = state.engine.clone();
    let blocking_query = query.clone();
    let (pool_size, ranked) = tokio::task::spawn_blocking(move || {
        let candidates = source.load()?;
        let ranked = engine.rank(&candidates, &blocking_query, limit, now)?;
        Ok::<_, ApiError>((candidates.len(), ranked))
    })
    .await
    .map_err(|err| ApiError::Internal(format!("ranking task failed: {err}")))??;

    info!(
        run_id = run_id::get(),
        trade = query.trade.as_deref().unwrap_or(""),
        district = query.district.as_deref().unwrap_or(""),
        pool = pool_size,
        returned = ranked.len(),
        "handyman search completed"
    );

    Ok(Json(SearchResponse::from_ranked(ranked, now)))
}

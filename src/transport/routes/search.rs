use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use tracing::{debug, error};

use crate::{
    common::errors::ApiError,
    protocol::{SearchParams, SearchSource, SearchTrack},
    server::AppState,
    sources,
};

/// GET /search?query=...&source=...
pub async fn search_tracks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchTrack>>, ApiError> {
    debug!(
        "GET /search: query={:?} source={:?}",
        params.query, params.source
    );

    let query = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|query| !query.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing \"query\" query parameter."))?;

    let source = match params.source.as_deref() {
        Some(source) => source
            .parse::<SearchSource>()
            .map_err(|_| ApiError::bad_request("Invalid \"source\" query parameter."))?,
        None => SearchSource::default(),
    };

    let tracks = sources::search_tracks(
        state.resolver.as_ref(),
        query,
        source,
        state.config.search.max_results,
    )
    .await
    .map_err(|err| {
        error!("Search for '{}' on {} failed: {}", query, source, err);
        ApiError::internal(err.to_string())
    })?;

    Ok(Json(tracks))
}

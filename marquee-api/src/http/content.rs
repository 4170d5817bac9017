//! Catalog search proxy for the content picker

use axum::{
    extract::{Query, State},
    Json,
};

use marquee_core::{models::ContentRef, service::SearchQuery};

use crate::http::{AppError, AppResult, AppState};

/// `GET /api/content/search?query=&type=`
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<ContentRef>>> {
    let catalog = state
        .catalog
        .as_ref()
        .ok_or_else(|| AppError::service_unavailable("Content catalog is not configured"))?;

    let results = catalog.search(&query).await?;
    Ok(Json(results))
}

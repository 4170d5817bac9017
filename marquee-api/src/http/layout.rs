//! Layout document endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use marquee_core::models::{Layout, PageKey};

use crate::http::{AppResult, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct LayoutQuery {
    /// Fill automatic sections from the catalog
    #[serde(default)]
    pub resolve: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PageListResponse {
    pub pages: Vec<PageKey>,
}

/// `GET /api/layout/{page}`
///
/// Pages without a stored document answer with the empty layout.
pub async fn get_layout(
    State(state): State<AppState>,
    Path(page): Path<String>,
    Query(query): Query<LayoutQuery>,
) -> AppResult<Json<Layout>> {
    let page = PageKey::parse(&page)?;

    let layout = if query.resolve {
        state.layout_store.get_resolved(&page).await?
    } else {
        state.layout_store.get(&page).await?
    };

    Ok(Json(layout))
}

/// `PUT /api/layout/{page}`
///
/// The body replaces the whole document. Malformed list fields are coerced
/// rather than rejected; the normalized document is returned.
pub async fn put_layout(
    State(state): State<AppState>,
    Path(page): Path<String>,
    Json(document): Json<JsonValue>,
) -> AppResult<Json<Layout>> {
    let page = PageKey::parse(&page)?;
    let layout = state.layout_store.put_raw(&page, document).await?;
    debug!(page = %page, "Layout replaced over HTTP");
    Ok(Json(layout))
}

/// `GET /api/layout`
pub async fn list_pages(State(state): State<AppState>) -> AppResult<Json<PageListResponse>> {
    let pages = state.layout_store.list_pages().await?;
    Ok(Json(PageListResponse { pages }))
}

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use pagestack_core::document::{DocumentSummary, Page};

use super::VersionQuery;
use crate::error::ApiResult;
use crate::extract::{Path, Query, RawBody};
use crate::state::AppState;

/// Page routes, nested under their site.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sites/{siteid}/pages", get(list_pages).post(create_page))
        .route(
            "/sites/{siteid}/pages/{pageid}",
            get(get_page)
                .put(update_page)
                .patch(update_page)
                .delete(delete_page),
        )
}

/// The site id names the path prefix the listed pages live under.
async fn list_pages(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
) -> ApiResult<Json<Vec<DocumentSummary>>> {
    Ok(Json(state.pages().list(&site_id).await?))
}

async fn create_page(
    State(state): State<AppState>,
    Path(_site_id): Path<String>,
    RawBody(body): RawBody,
) -> ApiResult<Json<Page>> {
    let page = state.pages().create(&body, Utc::now()).await?;
    Ok(Json(page))
}

async fn get_page(
    State(state): State<AppState>,
    Path((_site_id, page_id)): Path<(String, String)>,
    Query(query): Query<VersionQuery>,
) -> ApiResult<Json<Page>> {
    let key = query.key(page_id)?;
    Ok(Json(state.pages().get(&key).await?))
}

async fn update_page(
    State(state): State<AppState>,
    Path((_site_id, page_id)): Path<(String, String)>,
    Query(query): Query<VersionQuery>,
    RawBody(body): RawBody,
) -> ApiResult<Json<Page>> {
    let key = query.key(page_id)?;
    let page = state.pages().update(&key, &body, Utc::now()).await?;
    Ok(Json(page))
}

async fn delete_page(
    State(state): State<AppState>,
    Path((_site_id, page_id)): Path<(String, String)>,
    Query(query): Query<VersionQuery>,
) -> ApiResult<StatusCode> {
    let key = query.key(page_id)?;
    state.pages().delete(&key).await?;
    Ok(StatusCode::OK)
}

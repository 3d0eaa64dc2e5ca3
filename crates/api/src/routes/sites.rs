use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use pagestack_core::document::Site;

use super::VersionQuery;
use crate::error::ApiResult;
use crate::extract::{Path, Query, RawBody};
use crate::state::AppState;

/// Site routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/sites", post(create_site)).route(
        "/sites/{siteid}",
        get(get_site)
            .put(update_site)
            .patch(update_site)
            .delete(delete_site),
    )
}

async fn create_site(
    State(state): State<AppState>,
    RawBody(body): RawBody,
) -> ApiResult<Json<Site>> {
    let site = state.sites().create(&body, Utc::now()).await?;
    Ok(Json(site))
}

async fn get_site(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
    Query(query): Query<VersionQuery>,
) -> ApiResult<Json<Site>> {
    let key = query.key(site_id)?;
    Ok(Json(state.sites().get(&key).await?))
}

async fn update_site(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
    Query(query): Query<VersionQuery>,
    RawBody(body): RawBody,
) -> ApiResult<Json<Site>> {
    let key = query.key(site_id)?;
    let site = state.sites().update(&key, &body, Utc::now()).await?;
    Ok(Json(site))
}

async fn delete_site(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
    Query(query): Query<VersionQuery>,
) -> ApiResult<StatusCode> {
    let key = query.key(site_id)?;
    state.sites().delete(&key).await?;
    Ok(StatusCode::OK)
}

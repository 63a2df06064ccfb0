use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use blogcms_backend::error::AppResult;
use blogcms_backend::feed::{blog_feed, RSS_XML};

use crate::api::blogs::load_blog;
use crate::state::AppState;

/// GET /blog/:id/rss.xml - 博客RSS
pub async fn blog_rss(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let blog = load_blog(&state, id).await?;
    let xml = blog_feed(&state.db, &blog, &state.urls(&headers)).await?;
    Ok(([(header::CONTENT_TYPE, RSS_XML)], xml).into_response())
}

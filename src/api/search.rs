use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use blogcms_backend::error::{AppError, AppResult};
use blogcms_backend::models::{Blog, Chirp, Page, Post};
use blogcms_backend::search::{self as index, Searchable};
use blogcms_backend::utils::PageWindow;

use crate::api::{ApiResponse, CurrentUser};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    #[default]
    Posts,
    Pages,
    Blogs,
    Chirps,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub kind: SearchKind,
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub results: Vec<Value>,
    pub total: u64,
    pub page: i64,
    pub per_page: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Query the index, then load the rows it ranked / 搜索并加载结果
async fn run<T>(state: &AppState, q: &str, window: PageWindow) -> AppResult<(Vec<Value>, u64)>
where
    T: Searchable + Serialize,
{
    let found =
        index::search::<T>(&state.db, state.index.client().as_ref(), q, window.page, window.per_page).await?;

    let results = found
        .items
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Index(e.to_string()))?;
    Ok((results, found.total))
}

/// GET /api/search?q=&kind=&page=
///
/// Drafts never reach the index, so totals only count visible rows.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<ApiResponse<SearchResults>>> {
    let per_page = state.config.search.per_page as i64;
    let window = PageWindow::new(query.page, per_page);
    let q = query.q.trim();

    let (results, total) = if q.is_empty() {
        (Vec::new(), 0)
    } else {
        match query.kind {
            SearchKind::Posts => run::<Post>(&state, q, window).await?,
            SearchKind::Pages => run::<Page>(&state, q, window).await?,
            SearchKind::Blogs => run::<Blog>(&state, q, window).await?,
            SearchKind::Chirps => run::<Chirp>(&state, q, window).await?,
        }
    };

    Ok(Json(ApiResponse::success(SearchResults {
        results,
        total,
        page: window.page,
        per_page: window.per_page,
        has_next: window.has_next(total as i64),
        has_prev: window.has_prev(),
    })))
}

#[derive(Debug, Default, Serialize)]
pub struct ReindexReport {
    pub posts: usize,
    pub pages: usize,
    pub blogs: usize,
    pub chirps: usize,
}

/// POST /api/admin/search/reindex - rebuild every collection / 重建搜索索引
pub async fn reindex(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<ApiResponse<ReindexReport>>> {
    tracing::info!("Search reindex requested by {}", user.username);
    let client = state.index.client().as_ref();

    let report = ReindexReport {
        posts: index::reindex::<Post>(&state.db, client).await?,
        pages: index::reindex::<Page>(&state.db, client).await?,
        blogs: index::reindex::<Blog>(&state.db, client).await?,
        chirps: index::reindex::<Chirp>(&state.db, client).await?,
    };
    Ok(Json(ApiResponse::success(report)))
}

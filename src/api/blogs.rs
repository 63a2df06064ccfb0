use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use blogcms_backend::error::{AppError, AppResult};
use blogcms_backend::models::{Blog, CreateBlogRequest, UpdateBlogRequest, Webmention};
use blogcms_backend::store::{blogs as blog_store, webmentions as mention_store, Listing};
use blogcms_backend::utils::PageWindow;

use crate::api::{ensure_owner, ApiResponse, CurrentUser, PageQuery};
use crate::state::AppState;

/// Load a blog or 404 / 加载博客
pub(crate) async fn load_blog(state: &AppState, id: i64) -> AppResult<Blog> {
    blog_store::get_blog(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("blog"))
}

/// GET /api/blogs
pub async fn list_blogs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ApiResponse<Listing<Blog>>>> {
    let window = PageWindow::new(query.page, state.config.federation.posts_per_page);
    let listing = blog_store::list_blogs(&state.db, window).await?;
    Ok(Json(ApiResponse::success(listing)))
}

/// POST /api/blogs
pub async fn create_blog(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateBlogRequest>,
) -> AppResult<Json<ApiResponse<Blog>>> {
    let mut uow = state.begin().await?;
    let blog = blog_store::create_blog(&mut uow, &user, req).await?;
    uow.commit().await?;
    Ok(Json(ApiResponse::success(blog)))
}

/// GET /api/blogs/:id
pub async fn get_blog(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Blog>>> {
    Ok(Json(ApiResponse::success(load_blog(&state, id).await?)))
}

/// POST /api/blogs/:id - update title, description or newsletter flag / 更新博客
pub async fn update_blog(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateBlogRequest>,
) -> AppResult<Json<ApiResponse<Blog>>> {
    let blog = load_blog(&state, id).await?;
    ensure_owner(&user, blog.user_id)?;

    let mut uow = state.begin().await?;
    let blog = blog_store::update_blog(&mut uow, blog, req).await?;
    uow.commit().await?;
    Ok(Json(ApiResponse::success(blog)))
}

/// POST /api/blogs/:id/delete
pub async fn delete_blog(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    let blog = load_blog(&state, id).await?;
    ensure_owner(&user, blog.user_id)?;

    let mut uow = state.begin().await?;
    blog_store::delete_blog(&mut uow, blog).await?;
    uow.commit().await?;
    Ok(Json(ApiResponse::success(())))
}

/// GET /api/blogs/:id/webmentions
pub async fn list_webmentions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<Webmention>>>> {
    let blog = load_blog(&state, id).await?;
    let mentions = mention_store::list_blog_webmentions(&state.db, blog.id).await?;
    Ok(Json(ApiResponse::success(mentions)))
}

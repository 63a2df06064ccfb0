use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use blogcms_backend::error::{AppError, AppResult};
use blogcms_backend::import;
use blogcms_backend::models::{CreatePostRequest, Post, UpdatePostRequest};
use blogcms_backend::store::{posts as post_store, Listing};
use blogcms_backend::utils::PageWindow;

use crate::api::blogs::load_blog;
use crate::api::{ensure_owner, ApiResponse, CurrentUser, PageQuery};
use crate::state::AppState;

/// Load a post or 404 / 加载文章
pub(crate) async fn load_post(state: &AppState, id: i64) -> AppResult<Post> {
    post_store::get_post(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("post"))
}

/// GET /api/blogs/:id/posts - drafts are listed for the owner only / 文章列表
pub async fn list_blog_posts(
    State(state): State<Arc<AppState>>,
    viewer: Option<CurrentUser>,
    Path(blog_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ApiResponse<Listing<Post>>>> {
    let blog = load_blog(&state, blog_id).await?;
    let include_drafts = matches!(viewer, Some(CurrentUser(ref u)) if u.id == blog.user_id);

    let window = PageWindow::new(query.page, state.config.federation.posts_per_page);
    let listing = post_store::list_blog_posts(&state.db, blog.id, window, include_drafts).await?;
    Ok(Json(ApiResponse::success(listing)))
}

/// POST /api/blogs/:id/posts
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(blog_id): Path<i64>,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<Json<ApiResponse<Post>>> {
    let blog = load_blog(&state, blog_id).await?;
    ensure_owner(&user, blog.user_id)?;

    let mut uow = state.begin().await?;
    let post = post_store::create_post(&mut uow, &blog, &user, req).await?;
    uow.commit().await?;
    Ok(Json(ApiResponse::success(post)))
}

/// POST /api/blogs/:id/import - Markdown file with front matter / 导入Markdown
pub async fn import_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(blog_id): Path<i64>,
    body: String,
) -> AppResult<Json<ApiResponse<Post>>> {
    let blog = load_blog(&state, blog_id).await?;
    ensure_owner(&user, blog.user_id)?;

    let mut uow = state.begin().await?;
    let post = import::import_post(&mut uow, &blog, &user, &body).await?;
    uow.commit().await?;
    Ok(Json(ApiResponse::success(post)))
}

/// GET /api/posts/:id - unpublished posts look missing to everyone but the author
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    viewer: Option<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Post>>> {
    let post = load_post(&state, id).await?;
    if !post.published && !matches!(viewer, Some(CurrentUser(ref u)) if u.id == post.user_id) {
        return Err(AppError::not_found("post"));
    }
    Ok(Json(ApiResponse::success(post)))
}

/// POST /api/posts/:id
pub async fn update_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePostRequest>,
) -> AppResult<Json<ApiResponse<Post>>> {
    let post = load_post(&state, id).await?;
    ensure_owner(&user, post.user_id)?;

    let mut uow = state.begin().await?;
    let post = post_store::update_post(&mut uow, post, req).await?;
    uow.commit().await?;
    Ok(Json(ApiResponse::success(post)))
}

/// POST /api/posts/:id/delete
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    let post = load_post(&state, id).await?;
    ensure_owner(&user, post.user_id)?;

    let mut uow = state.begin().await?;
    post_store::delete_post(&mut uow, post).await?;
    uow.commit().await?;
    Ok(Json(ApiResponse::success(())))
}

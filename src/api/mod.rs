pub mod blogs;
pub mod chirps;
pub mod comments;
pub mod feed;
pub mod federation;
pub mod pages;
pub mod posts;
pub mod search;
pub mod server;
pub mod users;
pub mod webmention;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use blogcms_backend::error::{AppError, AppResult};
use blogcms_backend::models::User;
use blogcms_backend::store::users as user_store;

use crate::state::AppState;

/// Header set by the fronting identity provider / 身份提供方设置的请求头
pub const REMOTE_USER_HEADER: &str = "x-remote-user";

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data: Some(data),
        }
    }
}

/// Authenticated caller / 当前用户
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let username = parts
            .headers
            .get(REMOTE_USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let user = user_store::find_by_username(&state.db, username)
            .await?
            .ok_or(AppError::Unauthorized)?;
        Ok(CurrentUser(user))
    }
}

/// Only the owner may change a resource / 仅所有者可修改
pub fn ensure_owner(user: &User, owner_id: i64) -> AppResult<()> {
    if user.id != owner_id {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

/// All routes / 全部路由
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(server::health_check))
        // Users / 用户
        .route("/api/users", post(users::register))
        .route("/api/users/:username", get(users::get_profile))
        // Blogs / 博客
        .route("/api/blogs", get(blogs::list_blogs).post(blogs::create_blog))
        .route("/api/blogs/:id", get(blogs::get_blog).post(blogs::update_blog))
        .route("/api/blogs/:id/delete", post(blogs::delete_blog))
        .route("/api/blogs/:id/posts", get(posts::list_blog_posts).post(posts::create_post))
        .route("/api/blogs/:id/import", post(posts::import_post))
        .route("/api/blogs/:id/pages", get(pages::list_blog_pages).post(pages::create_page))
        .route("/api/blogs/:id/webmentions", get(blogs::list_webmentions))
        // Posts / 文章
        .route("/api/posts/:id", get(posts::get_post).post(posts::update_post))
        .route("/api/posts/:id/delete", post(posts::delete_post))
        .route(
            "/api/posts/:id/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/api/comments/:id/delete", post(comments::delete_comment))
        // Pages / 页面
        .route("/api/pages/:id", get(pages::get_page).post(pages::update_page))
        .route("/api/pages/:id/delete", post(pages::delete_page))
        // Chirps / 短动态
        .route("/api/chirps", get(chirps::list_chirps).post(chirps::create_chirp))
        // Search / 搜索
        .route("/api/search", get(search::search))
        .route("/api/admin/search/reindex", post(search::reindex))
        // Federation / 联邦
        .route("/.well-known/webfinger", get(federation::webfinger))
        .route("/actor/:username", get(federation::actor))
        .route("/actors/:username", get(federation::actor))
        .route("/actors/:username/outbox", get(federation::outbox))
        .route(
            "/actors/:username/posts/:post_id/activity",
            get(federation::activity),
        )
        .route("/blog/:id/rss.xml", get(feed::blog_rss))
        .route("/webmention", post(webmention::receive))
        .with_state(state)
}

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use blogcms_backend::error::{AppError, AppResult};
use blogcms_backend::federation::{
    build_outbox, parse_acct, ActivityObject, Jrd, Person, ACTIVITY_JSON, JRD_JSON,
};
use blogcms_backend::models::User;
use blogcms_backend::store::{posts as post_store, users as user_store};

use crate::api::PageQuery;
use crate::state::AppState;

/// Serialize with a media type other than plain JSON / 指定Content-Type输出
fn typed_json<T: Serialize>(content_type: &'static str, doc: T) -> Response {
    ([(header::CONTENT_TYPE, content_type)], Json(doc)).into_response()
}

async fn load_actor(state: &AppState, username: &str) -> AppResult<User> {
    user_store::find_by_username(&state.db, username)
        .await?
        .ok_or_else(|| AppError::not_found("user"))
}

#[derive(Debug, Deserialize)]
pub struct WebfingerQuery {
    pub resource: Option<String>,
}

/// GET /.well-known/webfinger?resource=acct:user@domain
pub async fn webfinger(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<WebfingerQuery>,
) -> AppResult<Response> {
    let resource = query.resource.unwrap_or_default();
    let (username, domain) = parse_acct(&resource)?;
    let user = load_actor(&state, &username).await?;

    let jrd = Jrd::for_account(&resource, &user.username, &domain, &state.urls(&headers));
    Ok(typed_json(JRD_JSON, jrd))
}

/// GET /actors/:username - actor document / 角色文档
pub async fn actor(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> AppResult<Response> {
    let user = load_actor(&state, &username).await?;
    Ok(typed_json(ACTIVITY_JSON, Person::for_user(&user, &state.urls(&headers))))
}

/// GET /actors/:username/outbox?page=N
pub async fn outbox(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let user = load_actor(&state, &username).await?;
    let urls = state.urls(&headers);

    let page = build_outbox(
        &state.db,
        &user,
        &urls,
        query.page,
        state.config.federation.posts_per_page,
    )
    .await?;
    Ok(typed_json(ACTIVITY_JSON, page.to_collection(&user.username, &urls)))
}

/// GET /actors/:username/posts/:post_id/activity
pub async fn activity(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((username, post_id)): Path<(String, i64)>,
) -> AppResult<Response> {
    let user = load_actor(&state, &username).await?;
    let post = post_store::find_published_for_user(&state.db, user.id, post_id)
        .await?
        .ok_or_else(|| AppError::not_found("post"))?;

    let urls = state.urls(&headers);
    let create = ActivityObject::from_post(&post, &user.username, &urls).to_create(&user.username, &urls);
    Ok(typed_json(ACTIVITY_JSON, create))
}

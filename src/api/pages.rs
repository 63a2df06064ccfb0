use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use blogcms_backend::error::{AppError, AppResult};
use blogcms_backend::models::{CreatePageRequest, Page, UpdatePageRequest};
use blogcms_backend::store::pages as page_store;

use crate::api::blogs::load_blog;
use crate::api::{ensure_owner, ApiResponse, CurrentUser};
use crate::state::AppState;

async fn load_page(state: &AppState, id: i64) -> AppResult<Page> {
    page_store::get_page(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("page"))
}

/// GET /api/blogs/:id/pages
pub async fn list_blog_pages(
    State(state): State<Arc<AppState>>,
    viewer: Option<CurrentUser>,
    Path(blog_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<Page>>>> {
    let blog = load_blog(&state, blog_id).await?;
    let include_drafts = matches!(viewer, Some(CurrentUser(ref u)) if u.id == blog.user_id);
    let pages = page_store::list_blog_pages(&state.db, blog.id, include_drafts).await?;
    Ok(Json(ApiResponse::success(pages)))
}

/// POST /api/blogs/:id/pages
pub async fn create_page(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(blog_id): Path<i64>,
    Json(req): Json<CreatePageRequest>,
) -> AppResult<Json<ApiResponse<Page>>> {
    let blog = load_blog(&state, blog_id).await?;
    ensure_owner(&user, blog.user_id)?;

    let mut uow = state.begin().await?;
    let page = page_store::create_page(&mut uow, &blog, &user, req).await?;
    uow.commit().await?;
    Ok(Json(ApiResponse::success(page)))
}

/// GET /api/pages/:id
pub async fn get_page(
    State(state): State<Arc<AppState>>,
    viewer: Option<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Page>>> {
    let page = load_page(&state, id).await?;
    if !page.published && !matches!(viewer, Some(CurrentUser(ref u)) if u.id == page.user_id) {
        return Err(AppError::not_found("page"));
    }
    Ok(Json(ApiResponse::success(page)))
}

/// POST /api/pages/:id
pub async fn update_page(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePageRequest>,
) -> AppResult<Json<ApiResponse<Page>>> {
    let page = load_page(&state, id).await?;
    ensure_owner(&user, page.user_id)?;

    let mut uow = state.begin().await?;
    let page = page_store::update_page(&mut uow, page, req).await?;
    uow.commit().await?;
    Ok(Json(ApiResponse::success(page)))
}

/// POST /api/pages/:id/delete
pub async fn delete_page(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    let page = load_page(&state, id).await?;
    ensure_owner(&user, page.user_id)?;

    let mut uow = state.begin().await?;
    page_store::delete_page(&mut uow, page).await?;
    uow.commit().await?;
    Ok(Json(ApiResponse::success(())))
}

#[cfg(test)]
mod tests {
    use crate::api::posts::tests::seeded;
    use crate::api::router;
    use crate::api::testing::{get, post_json, send};
    use crate::state::testing::state;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_page_lifecycle() {
        let (state, index) = state().await;
        let app = router(state);
        let blog = seeded(&app).await;

        let (status, body) = send(
            &app,
            post_json(
                &format!("/api/blogs/{}/pages", blog),
                Some("alice"),
                json!({"title": "About", "content": "who I am"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["data"]["id"].as_i64().unwrap();
        assert_eq!(index.document_count("pages"), 1);

        let (_, body) = send(&app, get(&format!("/api/blogs/{}/pages", blog))).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (status, _) = send(
            &app,
            post_json(&format!("/api/pages/{}/delete", id), Some("bob"), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            post_json(&format!("/api/pages/{}", id), Some("alice"), json!({"published": false})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["published"], false);

        let (status, _) = send(&app, get(&format!("/api/pages/{}", id))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            post_json(&format!("/api/pages/{}/delete", id), Some("alice"), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(index.document_count("pages"), 0);
    }
}

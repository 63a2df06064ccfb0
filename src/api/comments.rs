use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use blogcms_backend::error::{AppError, AppResult};
use blogcms_backend::models::{Comment, CreateCommentRequest};
use blogcms_backend::store::comments as comment_store;

use crate::api::posts::load_post;
use crate::api::{ApiResponse, CurrentUser};
use crate::state::AppState;

/// GET /api/posts/:id/comments
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<Comment>>>> {
    let post = load_post(&state, post_id).await?;
    if !post.published {
        return Err(AppError::not_found("post"));
    }
    let comments = comment_store::list_post_comments(&state.db, post.id).await?;
    Ok(Json(ApiResponse::success(comments)))
}

/// POST /api/posts/:id/comments - any signed-in user may comment on a published post / 发表评论
pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<i64>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<Json<ApiResponse<Comment>>> {
    let post = load_post(&state, post_id).await?;
    if !post.published {
        return Err(AppError::not_found("post"));
    }

    let mut uow = state.begin().await?;
    let comment = comment_store::create_comment(&mut uow, &post, &user, req).await?;
    uow.commit().await?;
    Ok(Json(ApiResponse::success(comment)))
}

/// POST /api/comments/:id/delete - the commenter or the post's author / 删除评论
pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    let comment = comment_store::get_comment(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("comment"))?;
    let post = load_post(&state, comment.post_id).await?;
    if user.id != comment.user_id && user.id != post.user_id {
        return Err(AppError::Forbidden);
    }

    let mut uow = state.begin().await?;
    comment_store::delete_comment(&mut uow, comment).await?;
    uow.commit().await?;
    Ok(Json(ApiResponse::success(())))
}

#[cfg(test)]
mod tests {
    use crate::api::posts::tests::{create_post, seeded};
    use crate::api::router;
    use crate::api::testing::{get, post_json, send};
    use crate::state::testing::state;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_comment_permissions() {
        let (state, _) = state().await;
        let app = router(state);
        let blog = seeded(&app).await;
        let post = create_post(&app, blog, json!({"title": "Hi", "content": "there"})).await;
        let comments = format!("/api/posts/{}/comments", post);

        let (status, _) = send(&app, post_json(&comments, None, json!({"content": "anon"}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(&app, post_json(&comments, Some("bob"), json!({"content": "nice"}))).await;
        assert_eq!(status, StatusCode::OK);
        let first = body["data"]["id"].as_i64().unwrap();

        let (_, body) = send(&app, post_json(&comments, Some("bob"), json!({"content": "again"}))).await;
        let second = body["data"]["id"].as_i64().unwrap();

        let (_, body) = send(&app, get(&comments)).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"][0]["content"], "nice");

        // Post author removes a reader's comment, the reader removes their own
        let (status, _) = send(
            &app,
            post_json(&format!("/api/comments/{}/delete", first), Some("alice"), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(
            &app,
            post_json(&format!("/api/comments/{}/delete", second), Some("bob"), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, get(&comments)).await;
        assert!(body["data"].as_array().unwrap().is_empty());
    }
}

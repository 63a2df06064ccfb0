use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use blogcms_backend::error::AppResult;
use blogcms_backend::models::{Chirp, CreateChirpRequest};
use blogcms_backend::store::{chirps as chirp_store, Listing};
use blogcms_backend::utils::PageWindow;

use crate::api::{ApiResponse, CurrentUser, PageQuery};
use crate::state::AppState;

/// GET /api/chirps
pub async fn list_chirps(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ApiResponse<Listing<Chirp>>>> {
    let window = PageWindow::new(query.page, state.config.federation.posts_per_page);
    let listing = chirp_store::list_chirps(&state.db, window).await?;
    Ok(Json(ApiResponse::success(listing)))
}

/// POST /api/chirps
pub async fn create_chirp(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateChirpRequest>,
) -> AppResult<Json<ApiResponse<Chirp>>> {
    let mut uow = state.begin().await?;
    let chirp = chirp_store::create_chirp(&mut uow, &user, req).await?;
    uow.commit().await?;
    Ok(Json(ApiResponse::success(chirp)))
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
    async fn test_chirp_timeline() {
        let (state, index) = state().await;
        let app = router(state);
        seeded(&app).await;

        let (status, _) = send(&app, post_json("/api/chirps", Some("bob"), json!({"content": "first"}))).await;
        assert_eq!(status, StatusCode::OK);
        send(&app, post_json("/api/chirps", Some("alice"), json!({"content": "second"}))).await;

        let (status, _) = send(
            &app,
            post_json("/api/chirps", Some("bob"), json!({"content": "x".repeat(281)})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(&app, get("/api/chirps")).await;
        assert_eq!(body["data"]["total"], 2);
        assert_eq!(body["data"]["items"][0]["content"], "second");
        assert_eq!(index.document_count("chirps"), 2);
    }
}

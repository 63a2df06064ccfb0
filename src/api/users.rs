use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use blogcms_backend::error::{AppError, AppResult};
use blogcms_backend::models::{CreateUserRequest, User};
use blogcms_backend::store::users as user_store;

use crate::api::ApiResponse;
use crate::state::AppState;

/// POST /api/users - register a user / 注册用户
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let mut uow = state.begin().await?;
    let user = user_store::create_user(&mut uow, req).await?;
    uow.commit().await?;
    Ok(Json(ApiResponse::success(user)))
}

/// GET /api/users/:username
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = user_store::find_by_username(&state.db, &username)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;
    Ok(Json(ApiResponse::success(user)))
}

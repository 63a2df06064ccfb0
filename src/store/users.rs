use sqlx::sqlite::SqliteExecutor;

use crate::error::{AppError, AppResult};
use crate::models::{CreateUserRequest, User};
use crate::uow::UnitOfWork;
use crate::utils::now_rfc3339;

fn valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= 32
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Register a user / 注册用户
pub async fn create_user(uow: &mut UnitOfWork, req: CreateUserRequest) -> AppResult<User> {
    let username = req.username.trim();
    if !valid_username(username) {
        return Err(AppError::bad_request(
            "username must be 1-32 letters, digits, '_' or '-'",
        ));
    }
    let email = req.email.trim();
    if !email.contains('@') {
        return Err(AppError::bad_request("invalid email address"));
    }

    let user: User = sqlx::query_as(
        "INSERT INTO users (username, email, display_name, public_key_pem, active, created_at)
         VALUES (?, ?, ?, ?, 1, ?) RETURNING *",
    )
    .bind(username)
    .bind(email)
    .bind(&req.display_name)
    .bind(&req.public_key_pem)
    .bind(now_rfc3339())
    .fetch_one(uow.conn())
    .await
    .map_err(|e| match AppError::from(e) {
        err if err.is_unique_violation() => {
            AppError::bad_request("username or email already taken")
        }
        err => err,
    })?;

    tracing::info!("User registered: {}", user.username);
    uow.add(user.clone());
    Ok(user)
}

pub async fn get_user<'e>(db: impl SqliteExecutor<'e>, id: i64) -> AppResult<Option<User>> {
    Ok(sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?)
}

/// Look up an active user by username / 按用户名查找
pub async fn find_by_username<'e>(
    db: impl SqliteExecutor<'e>,
    username: &str,
) -> AppResult<Option<User>> {
    Ok(
        sqlx::query_as("SELECT * FROM users WHERE username = ? AND active = 1")
            .bind(username)
            .fetch_optional(db)
            .await?,
    )
}

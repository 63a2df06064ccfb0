use sqlx::sqlite::SqliteExecutor;
use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::models::{Chirp, CreateChirpRequest, User};
use crate::uow::UnitOfWork;
use crate::utils::{now_rfc3339, PageWindow};

use super::{require_text, Listing};

/// Maximum chirp length in characters / 短动态最大字符数
pub const MAX_CHIRP_CHARS: usize = 280;

pub async fn create_chirp(uow: &mut UnitOfWork, author: &User, req: CreateChirpRequest) -> AppResult<Chirp> {
    require_text("content", &req.content)?;
    let content = req.content.trim();
    if content.chars().count() > MAX_CHIRP_CHARS {
        return Err(AppError::bad_request(format!(
            "chirp longer than {} characters",
            MAX_CHIRP_CHARS
        )));
    }

    let chirp: Chirp = sqlx::query_as(
        "INSERT INTO chirps (user_id, content, created_at) VALUES (?, ?, ?) RETURNING *",
    )
    .bind(author.id)
    .bind(content)
    .bind(now_rfc3339())
    .fetch_one(uow.conn())
    .await?;

    uow.add(chirp.clone());
    Ok(chirp)
}

pub async fn get_chirp<'e>(db: impl SqliteExecutor<'e>, id: i64) -> AppResult<Option<Chirp>> {
    Ok(sqlx::query_as("SELECT * FROM chirps WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?)
}

/// Public timeline, newest first / 动态时间线
pub async fn list_chirps(pool: &SqlitePool, window: PageWindow) -> AppResult<Listing<Chirp>> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chirps")
        .fetch_one(pool)
        .await?;

    let items = sqlx::query_as("SELECT * FROM chirps ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?")
        .bind(window.per_page)
        .bind(window.offset())
        .fetch_all(pool)
        .await?;

    Ok(Listing { items, total })
}

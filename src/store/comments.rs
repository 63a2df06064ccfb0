use sqlx::sqlite::SqliteExecutor;
use sqlx::SqlitePool;

use crate::error::AppResult;
use crate::models::{Comment, CreateCommentRequest, Post, User};
use crate::sanitize::clean_html;
use crate::uow::UnitOfWork;
use crate::utils::now_rfc3339;

use super::require_text;

pub async fn create_comment(
    uow: &mut UnitOfWork,
    post: &Post,
    author: &User,
    req: CreateCommentRequest,
) -> AppResult<Comment> {
    let content = clean_html(req.content.trim());
    require_text("content", &content)?;

    let comment: Comment = sqlx::query_as(
        "INSERT INTO comments (post_id, user_id, content, created_at) VALUES (?, ?, ?, ?) RETURNING *",
    )
    .bind(post.id)
    .bind(author.id)
    .bind(&content)
    .bind(now_rfc3339())
    .fetch_one(uow.conn())
    .await?;

    uow.add(comment.clone());
    Ok(comment)
}

pub async fn get_comment<'e>(db: impl SqliteExecutor<'e>, id: i64) -> AppResult<Option<Comment>> {
    Ok(sqlx::query_as("SELECT * FROM comments WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?)
}

/// Comments of a post, oldest first / 文章评论
pub async fn list_post_comments(pool: &SqlitePool, post_id: i64) -> AppResult<Vec<Comment>> {
    Ok(
        sqlx::query_as("SELECT * FROM comments WHERE post_id = ? ORDER BY created_at, id")
            .bind(post_id)
            .fetch_all(pool)
            .await?,
    )
}

pub async fn delete_comment(uow: &mut UnitOfWork, comment: Comment) -> AppResult<()> {
    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(comment.id)
        .execute(uow.conn())
        .await?;

    uow.delete(comment);
    Ok(())
}

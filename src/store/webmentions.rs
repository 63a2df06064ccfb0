use sqlx::sqlite::SqliteExecutor;
use sqlx::SqlitePool;

use crate::error::AppResult;
use crate::models::{Blog, Webmention};
use crate::uow::UnitOfWork;
use crate::utils::now_rfc3339;

/// Existing verified mention for a (source, target) pair / 已验证的提及
pub async fn find_verified<'e>(
    db: impl SqliteExecutor<'e>,
    source: &str,
    target: &str,
) -> AppResult<Option<Webmention>> {
    Ok(
        sqlx::query_as("SELECT * FROM webmentions WHERE source = ? AND target = ? AND verified = 1")
            .bind(source)
            .bind(target)
            .fetch_optional(db)
            .await?,
    )
}

/// Persist a mention that passed verification / 保存已验证的提及
///
/// The mention is attributed to the blog owner.
pub async fn insert_verified(
    uow: &mut UnitOfWork,
    blog: &Blog,
    source: &str,
    target: &str,
    content: Option<String>,
) -> AppResult<Webmention> {
    let mention: Webmention = sqlx::query_as(
        "INSERT INTO webmentions (blog_id, user_id, source, target, content, verified, created_at)
         VALUES (?, ?, ?, ?, ?, 1, ?) RETURNING *",
    )
    .bind(blog.id)
    .bind(blog.user_id)
    .bind(source)
    .bind(target)
    .bind(content)
    .bind(now_rfc3339())
    .fetch_one(uow.conn())
    .await?;

    tracing::info!("Webmention {} -> {} stored for blog {}", source, target, blog.slug);
    uow.add(mention.clone());
    Ok(mention)
}

/// Fill `content` once; verified mentions are otherwise immutable / 补全内容
pub async fn backfill_content(
    uow: &mut UnitOfWork,
    mut mention: Webmention,
    content: String,
) -> AppResult<Webmention> {
    if mention.content.as_deref().is_some_and(|c| !c.is_empty()) {
        return Ok(mention);
    }

    sqlx::query("UPDATE webmentions SET content = ? WHERE id = ? AND (content IS NULL OR content = '')")
        .bind(&content)
        .bind(mention.id)
        .execute(uow.conn())
        .await?;

    mention.content = Some(content);
    uow.mark_dirty(mention.clone());
    Ok(mention)
}

/// Verified mentions of a blog, newest first / 博客收到的提及
pub async fn list_blog_webmentions(pool: &SqlitePool, blog_id: i64) -> AppResult<Vec<Webmention>> {
    Ok(sqlx::query_as(
        "SELECT * FROM webmentions WHERE blog_id = ? AND verified = 1 ORDER BY created_at DESC, id DESC",
    )
    .bind(blog_id)
    .fetch_all(pool)
    .await?)
}

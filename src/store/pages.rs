use sqlx::sqlite::SqliteExecutor;
use sqlx::SqlitePool;

use crate::error::AppResult;
use crate::models::{Blog, CreatePageRequest, Page, UpdatePageRequest, User};
use crate::sanitize::{clean_html, clean_text};
use crate::uow::UnitOfWork;
use crate::utils::now_rfc3339;

use super::require_text;

/// Static page of a blog / 博客静态页面
pub async fn create_page(
    uow: &mut UnitOfWork,
    blog: &Blog,
    author: &User,
    req: CreatePageRequest,
) -> AppResult<Page> {
    let title = clean_text(req.title.trim());
    require_text("title", &title)?;
    let content = clean_html(&req.content);

    let now = now_rfc3339();
    let page: Page = sqlx::query_as(
        "INSERT INTO pages (blog_id, user_id, title, content, published, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(blog.id)
    .bind(author.id)
    .bind(&title)
    .bind(&content)
    .bind(req.published)
    .bind(&now)
    .bind(&now)
    .fetch_one(uow.conn())
    .await?;

    uow.add(page.clone());
    Ok(page)
}

pub async fn get_page<'e>(db: impl SqliteExecutor<'e>, id: i64) -> AppResult<Option<Page>> {
    Ok(sqlx::query_as("SELECT * FROM pages WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?)
}

/// Pages of a blog in title order / 博客页面列表
pub async fn list_blog_pages(pool: &SqlitePool, blog_id: i64, include_drafts: bool) -> AppResult<Vec<Page>> {
    let sql = if include_drafts {
        "SELECT * FROM pages WHERE blog_id = ? ORDER BY title, id"
    } else {
        "SELECT * FROM pages WHERE blog_id = ? AND published = 1 ORDER BY title, id"
    };

    Ok(sqlx::query_as(sql).bind(blog_id).fetch_all(pool).await?)
}

pub async fn update_page(uow: &mut UnitOfWork, mut page: Page, req: UpdatePageRequest) -> AppResult<Page> {
    if let Some(title) = req.title {
        let title = clean_text(title.trim());
        require_text("title", &title)?;
        page.title = title;
    }
    if let Some(content) = req.content {
        page.content = clean_html(&content);
    }
    if let Some(published) = req.published {
        page.published = published;
    }
    page.updated_at = now_rfc3339();

    sqlx::query("UPDATE pages SET title = ?, content = ?, published = ?, updated_at = ? WHERE id = ?")
        .bind(&page.title)
        .bind(&page.content)
        .bind(page.published)
        .bind(&page.updated_at)
        .bind(page.id)
        .execute(uow.conn())
        .await?;

    uow.mark_dirty(page.clone());
    Ok(page)
}

pub async fn delete_page(uow: &mut UnitOfWork, page: Page) -> AppResult<()> {
    sqlx::query("DELETE FROM pages WHERE id = ?")
        .bind(page.id)
        .execute(uow.conn())
        .await?;

    uow.delete(page);
    Ok(())
}

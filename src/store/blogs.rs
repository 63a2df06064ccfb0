use sqlx::sqlite::SqliteExecutor;
use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::models::{Blog, Comment, CreateBlogRequest, Page, Post, UpdateBlogRequest, User, Webmention};
use crate::uow::UnitOfWork;
use crate::utils::{is_valid_slug, now_rfc3339, slugify, PageWindow};

use super::{require_text, Listing};

/// Create a blog owned by `owner` / 创建博客
///
/// The slug comes from the request or, when absent, from the title.
pub async fn create_blog(uow: &mut UnitOfWork, owner: &User, req: CreateBlogRequest) -> AppResult<Blog> {
    require_text("title", &req.title)?;

    let slug = match req.slug.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s.to_lowercase(),
        _ => slugify(&req.title),
    };
    if !is_valid_slug(&slug) {
        return Err(AppError::bad_request(format!("invalid blog slug: {:?}", slug)));
    }

    let blog: Blog = sqlx::query_as(
        "INSERT INTO blogs (user_id, title, description, slug, newsletter, created_at)
         VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(owner.id)
    .bind(req.title.trim())
    .bind(&req.description)
    .bind(&slug)
    .bind(req.newsletter)
    .bind(now_rfc3339())
    .fetch_one(uow.conn())
    .await
    .map_err(|e| match AppError::from(e) {
        err if err.is_unique_violation() => AppError::bad_request("blog slug already taken"),
        err => err,
    })?;

    tracing::info!("Blog created: {} ({})", blog.slug, blog.id);
    uow.add(blog.clone());
    Ok(blog)
}

pub async fn get_blog<'e>(db: impl SqliteExecutor<'e>, id: i64) -> AppResult<Option<Blog>> {
    Ok(sqlx::query_as("SELECT * FROM blogs WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?)
}

/// Resolve a blog from its subdomain slug / 按slug查找博客
pub async fn find_by_slug<'e>(db: impl SqliteExecutor<'e>, slug: &str) -> AppResult<Option<Blog>> {
    Ok(sqlx::query_as("SELECT * FROM blogs WHERE slug = ?")
        .bind(slug)
        .fetch_optional(db)
        .await?)
}

/// Newest blogs first / 博客列表
pub async fn list_blogs(pool: &SqlitePool, window: PageWindow) -> AppResult<Listing<Blog>> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blogs")
        .fetch_one(pool)
        .await?;

    let items = sqlx::query_as("SELECT * FROM blogs ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?")
        .bind(window.per_page)
        .bind(window.offset())
        .fetch_all(pool)
        .await?;

    Ok(Listing { items, total })
}

pub async fn update_blog(uow: &mut UnitOfWork, mut blog: Blog, req: UpdateBlogRequest) -> AppResult<Blog> {
    if let Some(title) = req.title {
        require_text("title", &title)?;
        blog.title = title.trim().to_string();
    }
    if let Some(description) = req.description {
        blog.description = Some(description);
    }
    if let Some(newsletter) = req.newsletter {
        blog.newsletter = newsletter;
    }

    sqlx::query("UPDATE blogs SET title = ?, description = ?, newsletter = ? WHERE id = ?")
        .bind(&blog.title)
        .bind(&blog.description)
        .bind(blog.newsletter)
        .bind(blog.id)
        .execute(uow.conn())
        .await?;

    uow.mark_dirty(blog.clone());
    Ok(blog)
}

/// Delete a blog with its posts, their comments, its pages and webmentions / 删除博客
///
/// Children are registered as deleted before the row goes, so the index drops
/// them together with the blog.
pub async fn delete_blog(uow: &mut UnitOfWork, blog: Blog) -> AppResult<()> {
    let posts: Vec<Post> = sqlx::query_as("SELECT * FROM posts WHERE blog_id = ?")
        .bind(blog.id)
        .fetch_all(uow.conn())
        .await?;
    let comments: Vec<Comment> = sqlx::query_as(
        "SELECT c.* FROM comments c JOIN posts p ON c.post_id = p.id WHERE p.blog_id = ?",
    )
    .bind(blog.id)
    .fetch_all(uow.conn())
    .await?;
    let pages: Vec<Page> = sqlx::query_as("SELECT * FROM pages WHERE blog_id = ?")
        .bind(blog.id)
        .fetch_all(uow.conn())
        .await?;
    let mentions: Vec<Webmention> = sqlx::query_as("SELECT * FROM webmentions WHERE blog_id = ?")
        .bind(blog.id)
        .fetch_all(uow.conn())
        .await?;

    sqlx::query("DELETE FROM blogs WHERE id = ?")
        .bind(blog.id)
        .execute(uow.conn())
        .await?;

    tracing::info!(
        "Blog deleted: {} with {} posts, {} pages",
        blog.slug,
        posts.len(),
        pages.len()
    );

    for comment in comments {
        uow.delete(comment);
    }
    for post in posts {
        uow.delete(post);
    }
    for page in pages {
        uow.delete(page);
    }
    for mention in mentions {
        uow.delete(mention);
    }
    uow.delete(blog);
    Ok(())
}

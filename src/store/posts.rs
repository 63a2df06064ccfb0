use sqlx::sqlite::SqliteExecutor;
use sqlx::SqlitePool;

use crate::error::AppResult;
use crate::models::{Blog, Comment, CreatePostRequest, Post, UpdatePostRequest, User};
use crate::sanitize::{clean_html, clean_text};
use crate::uow::UnitOfWork;
use crate::utils::{now_rfc3339, PageWindow};

use super::{require_text, Listing};

/// Create a post in `blog` / 发布文章
pub async fn create_post(
    uow: &mut UnitOfWork,
    blog: &Blog,
    author: &User,
    req: CreatePostRequest,
) -> AppResult<Post> {
    let title = clean_text(req.title.trim());
    require_text("title", &title)?;
    let content = clean_html(&req.content);

    let now = now_rfc3339();
    let post: Post = sqlx::query_as(
        "INSERT INTO posts (blog_id, user_id, title, content, published, publish_in_newsletter, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(blog.id)
    .bind(author.id)
    .bind(&title)
    .bind(&content)
    .bind(req.published)
    .bind(req.publish_in_newsletter && blog.newsletter)
    .bind(&now)
    .bind(&now)
    .fetch_one(uow.conn())
    .await?;

    tracing::debug!("Post {} created in blog {}", post.id, blog.id);
    uow.add(post.clone());
    Ok(post)
}

pub async fn get_post<'e>(db: impl SqliteExecutor<'e>, id: i64) -> AppResult<Option<Post>> {
    Ok(sqlx::query_as("SELECT * FROM posts WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?)
}

/// Posts of a blog, newest first; drafts only when asked for / 博客文章列表
pub async fn list_blog_posts(
    pool: &SqlitePool,
    blog_id: i64,
    window: PageWindow,
    include_drafts: bool,
) -> AppResult<Listing<Post>> {
    let filter = if include_drafts {
        "blog_id = ?"
    } else {
        "blog_id = ? AND published = 1"
    };

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM posts WHERE {}", filter))
        .bind(blog_id)
        .fetch_one(pool)
        .await?;

    let items = sqlx::query_as(&format!(
        "SELECT * FROM posts WHERE {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        filter
    ))
    .bind(blog_id)
    .bind(window.per_page)
    .bind(window.offset())
    .fetch_all(pool)
    .await?;

    Ok(Listing { items, total })
}

/// Published posts of one author across all blogs, newest first / 作者已发布文章
pub async fn list_published_by_user(
    pool: &SqlitePool,
    user_id: i64,
    window: PageWindow,
) -> AppResult<Listing<Post>> {
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE user_id = ? AND published = 1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

    if total == 0 {
        return Ok(Listing {
            items: Vec::new(),
            total,
        });
    }

    let items = sqlx::query_as(
        "SELECT * FROM posts WHERE user_id = ? AND published = 1
         ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
    )
    .bind(user_id)
    .bind(window.per_page)
    .bind(window.offset())
    .fetch_all(pool)
    .await?;

    Ok(Listing { items, total })
}

/// A published post by `user_id`, if any / 作者的已发布文章
pub async fn find_published_for_user<'e>(
    db: impl SqliteExecutor<'e>,
    user_id: i64,
    post_id: i64,
) -> AppResult<Option<Post>> {
    Ok(
        sqlx::query_as("SELECT * FROM posts WHERE id = ? AND user_id = ? AND published = 1")
            .bind(post_id)
            .bind(user_id)
            .fetch_optional(db)
            .await?,
    )
}

pub async fn update_post(uow: &mut UnitOfWork, mut post: Post, req: UpdatePostRequest) -> AppResult<Post> {
    if let Some(title) = req.title {
        let title = clean_text(title.trim());
        require_text("title", &title)?;
        post.title = title;
    }
    if let Some(content) = req.content {
        post.content = clean_html(&content);
    }
    if let Some(published) = req.published {
        post.published = published;
    }
    if let Some(flag) = req.publish_in_newsletter {
        post.publish_in_newsletter = flag;
    }
    post.updated_at = now_rfc3339();

    sqlx::query(
        "UPDATE posts SET title = ?, content = ?, published = ?, publish_in_newsletter = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&post.title)
    .bind(&post.content)
    .bind(post.published)
    .bind(post.publish_in_newsletter)
    .bind(&post.updated_at)
    .bind(post.id)
    .execute(uow.conn())
    .await?;

    uow.mark_dirty(post.clone());
    Ok(post)
}

/// Delete a post and its comments / 删除文章及评论
pub async fn delete_post(uow: &mut UnitOfWork, post: Post) -> AppResult<()> {
    let comments: Vec<Comment> = sqlx::query_as("SELECT * FROM comments WHERE post_id = ?")
        .bind(post.id)
        .fetch_all(uow.conn())
        .await?;

    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(post.id)
        .execute(uow.conn())
        .await?;

    for comment in comments {
        uow.delete(comment);
    }
    uow.delete(post);
    Ok(())
}

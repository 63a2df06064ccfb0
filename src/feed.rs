//! RSS 2.0 feed of a blog / 博客RSS订阅
//!
//! Items are the blog's published posts, newest first.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::federation::Urls;
use crate::models::{Blog, Post};
use crate::store::posts;
use crate::utils::PageWindow;

pub const RSS_XML: &str = "application/rss+xml";

/// Most items in one feed / 订阅最大条目数
pub const FEED_ITEMS: i64 = 50;

type XmlWriter = Writer<Vec<u8>>;

fn xml_err(e: quick_xml::Error) -> AppError {
    AppError::Feed(e.to_string())
}

/// RFC 3339 row timestamp as RFC 2822 / 转换为RFC 2822时间
fn rfc2822(timestamp: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|t| t.to_rfc2822())
}

fn start(writer: &mut XmlWriter, tag: BytesStart<'_>) -> AppResult<()> {
    writer.write_event(Event::Start(tag)).map_err(xml_err)
}

fn end(writer: &mut XmlWriter, name: &str) -> AppResult<()> {
    writer.write_event(Event::End(BytesEnd::new(name))).map_err(xml_err)
}

fn text_element(writer: &mut XmlWriter, name: &str, value: &str) -> AppResult<()> {
    start(writer, BytesStart::new(name))?;
    writer
        .write_event(Event::Text(BytesText::new(value)))
        .map_err(xml_err)?;
    end(writer, name)
}

fn write_item(writer: &mut XmlWriter, post: &Post, urls: &Urls) -> AppResult<()> {
    let link = urls.post(post.id);

    start(writer, BytesStart::new("item"))?;
    text_element(writer, "title", &post.title)?;
    text_element(writer, "link", &link)?;
    start(
        writer,
        BytesStart::new("guid").with_attributes([("isPermaLink", "true")]),
    )?;
    writer
        .write_event(Event::Text(BytesText::new(&link)))
        .map_err(xml_err)?;
    end(writer, "guid")?;
    if let Some(date) = rfc2822(&post.created_at) {
        text_element(writer, "pubDate", &date)?;
    }
    text_element(writer, "description", &post.content)?;
    end(writer, "item")
}

/// Render the feed document / 生成RSS文档
pub fn render_rss(blog: &Blog, items: &[Post], urls: &Urls, built_at: DateTime<Utc>) -> AppResult<String> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    start(&mut writer, BytesStart::new("rss").with_attributes([("version", "2.0")]))?;
    start(&mut writer, BytesStart::new("channel"))?;
    text_element(&mut writer, "title", &blog.title)?;
    text_element(&mut writer, "link", &urls.blog(blog.id))?;
    text_element(&mut writer, "description", blog.description.as_deref().unwrap_or(&blog.title))?;
    text_element(&mut writer, "lastBuildDate", &built_at.to_rfc2822())?;
    for post in items {
        write_item(&mut writer, post, urls)?;
    }
    end(&mut writer, "channel")?;
    end(&mut writer, "rss")?;

    String::from_utf8(writer.into_inner()).map_err(|e| AppError::Feed(e.to_string()))
}

/// Feed of `blog`'s latest published posts / 博客最新文章订阅
pub async fn blog_feed(pool: &SqlitePool, blog: &Blog, urls: &Urls) -> AppResult<String> {
    let listing = posts::list_blog_posts(pool, blog.id, PageWindow::new(1, FEED_ITEMS), false).await?;
    render_rss(blog, &listing.items, urls, Utc::now())
}

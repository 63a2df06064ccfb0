//! Markdown import with front matter / 带头信息的Markdown导入
//!
//! A document starts with a `---` YAML block or a `+++` TOML block. The block
//! must carry a `title`; `draft: true` imports the post unpublished.

use pulldown_cmark::{html, Options, Parser};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::{Blog, CreatePostRequest, Post, User};
use crate::store::posts::create_post;
use crate::uow::UnitOfWork;

#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    title: Option<String>,
    #[serde(default)]
    draft: bool,
}

/// Parsed Markdown file / 解析后的Markdown文件
#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownDocument {
    pub title: String,
    pub html: String,
    pub draft: bool,
}

enum Format {
    Yaml,
    Toml,
}

/// Split `text` into (front matter, body) / 拆分头信息与正文
fn split_front_matter(text: &str) -> Option<(Format, &str, &str)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let first_end = text.find('\n').unwrap_or(text.len());
    let (fence, format) = match text[..first_end].trim_end() {
        "---" => ("---", Format::Yaml),
        "+++" => ("+++", Format::Toml),
        _ => return None,
    };

    let rest = text.get(first_end + 1..)?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == fence {
            let body = &rest[offset + line.len()..];
            return Some((format, &rest[..offset], body));
        }
        offset += line.len();
    }
    None
}

fn parse_front_matter(format: Format, raw: &str) -> AppResult<FrontMatter> {
    if raw.trim().is_empty() {
        return Ok(FrontMatter::default());
    }
    match format {
        Format::Yaml => serde_yaml::from_str(raw)
            .map_err(|e| AppError::bad_request(format!("invalid front matter: {}", e))),
        Format::Toml => toml::from_str(raw)
            .map_err(|e| AppError::bad_request(format!("invalid front matter: {}", e))),
    }
}

fn render_markdown(body: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let mut out = String::new();
    html::push_html(&mut out, Parser::new_ext(body, options));
    out
}

/// Parse a Markdown file with front matter / 解析Markdown文件
pub fn parse_markdown(text: &str) -> AppResult<MarkdownDocument> {
    let (format, raw, body) =
        split_front_matter(text).ok_or_else(|| AppError::bad_request("no front matter"))?;
    let meta = parse_front_matter(format, raw)?;

    let title = meta
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::bad_request("front matter has no title"))?;

    Ok(MarkdownDocument {
        title,
        html: render_markdown(body),
        draft: meta.draft,
    })
}

/// Import a Markdown file as a post of `blog` / 导入为文章
pub async fn import_post(
    uow: &mut UnitOfWork,
    blog: &Blog,
    author: &User,
    text: &str,
) -> AppResult<Post> {
    let doc = parse_markdown(text)?;
    tracing::debug!("Importing \"{}\" into blog {} (draft: {})", doc.title, blog.id, doc.draft);

    create_post(
        uow,
        blog,
        author,
        CreatePostRequest {
            title: doc.title,
            content: doc.html,
            published: !doc.draft,
            publish_in_newsletter: false,
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{IndexClient, IndexSync, MemoryIndex};
    use crate::store::fixtures;
    use std::sync::Arc;

    #[test]
    fn test_yaml_front_matter() {
        let doc = parse_markdown("---\ntitle: Hello\ndraft: true\n---\n# Heading\n\nSome *text*.\n").unwrap();
        assert_eq!(doc.title, "Hello");
        assert!(doc.draft);
        assert_eq!(doc.html, "<h1>Heading</h1>\n<p>Some <em>text</em>.</p>\n");
    }

    #[test]
    fn test_toml_front_matter() {
        let doc = parse_markdown("+++\r\ntitle = \"Plus\"\r\n+++\r\nbody\r\n").unwrap();
        assert_eq!(doc.title, "Plus");
        assert!(!doc.draft);
        assert!(doc.html.contains("<p>body</p>"));
    }

    #[test]
    fn test_missing_front_matter_or_title() {
        for text in [
            "# Just markdown",
            "---\ntitle: never closed\n",
            "---\n---\nbody",
            "---\ndraft: true\n---\nbody",
            "---\ntitle: \"  \"\n---\nbody",
            "---\ntitle: [unclosed\n---\nbody",
        ] {
            let err = parse_markdown(text).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)), "{:?}", text);
        }
    }

    #[tokio::test]
    async fn test_import_goes_through_unit_of_work() {
        let pool = fixtures::pool().await;
        let owner = fixtures::user(&pool, "alice").await;
        let blog = fixtures::blog(&pool, &owner, "notes").await;
        let index = Arc::new(MemoryIndex::new());
        let sync = IndexSync::inline(index.clone());

        let mut uow = UnitOfWork::begin(&pool).await.unwrap();
        sync.attach(&mut uow);
        let live = import_post(
            &mut uow,
            &blog,
            &owner,
            "---\ntitle: Pelican\n---\nwide <script>x()</script>wings\n",
        )
        .await
        .unwrap();
        let draft = import_post(&mut uow, &blog, &owner, "---\ntitle: Heron\ndraft: true\n---\nlegs\n")
            .await
            .unwrap();
        uow.commit().await.unwrap();

        assert!(live.published);
        assert!(!live.content.contains("script"));
        assert!(!draft.published);
        assert_eq!(index.query("posts", "pelican", 1, 10).await.unwrap().total, 1);
        assert_eq!(index.query("posts", "heron", 1, 10).await.unwrap().total, 0);
    }
}

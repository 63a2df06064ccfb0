//! HTML sanitizing for user-authored content / 用户内容HTML清洗
//!
//! Bodies keep a small formatting allow-list; titles keep no markup at all.

use std::collections::HashSet;

use ammonia::Builder;

/// Tags allowed in post, page and comment bodies / 正文允许的标签
pub const ALLOWED_TAGS: &[&str] = &[
    "p", "strong", "em", "u", "h2", "h3", "h4", "h5", "h6", "a", "img", "ul", "ol", "li",
];

/// Clean a body, keeping allow-listed tags / 清洗正文
pub fn clean_html(input: &str) -> String {
    Builder::default()
        .tags(ALLOWED_TAGS.iter().copied().collect::<HashSet<_>>())
        .clean(input)
        .to_string()
}

/// Clean a title down to text / 清洗标题
pub fn clean_text(input: &str) -> String {
    Builder::empty()
        .clean_content_tags(["script", "style"].into_iter().collect::<HashSet<_>>())
        .clean(input)
        .to_string()
}

/// Slug, time and pagination utility functions / 工具函数

use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").expect("valid slug regex"));

/// Current UTC time, fixed-width RFC 3339 so strings sort chronologically / 当前UTC时间
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Derive a URL slug from a title / 由标题生成slug
/// "Hello, World!" -> "hello-world"
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Check slug format / 校验slug格式
pub fn is_valid_slug(slug: &str) -> bool {
    slug.len() <= 63 && SLUG_RE.is_match(slug)
}

/// Truncate to at most `max` characters on a char boundary / 按字符截断
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// 1-based page window / 分页窗口（页码从1开始）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub per_page: i64,
}

impl PageWindow {
    /// Pages below 1 clamp to 1, page size to at least 1 / 页码小于1时取1
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn has_next(&self, total: i64) -> bool {
        self.page.saturating_mul(self.per_page) < total
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn next_num(&self, total: i64) -> Option<i64> {
        self.has_next(total).then(|| self.page + 1)
    }

    pub fn prev_num(&self) -> Option<i64> {
        self.has_prev().then(|| self.page - 1)
    }
}

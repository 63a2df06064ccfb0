//! Text tokenizer for the in-process index / 内存索引分词器
//!
//! jieba handles CJK segmentation; Latin text is split on non-alphanumerics and
//! lowercased. Post and page bodies are HTML, so markup is stripped first.

use jieba_rs::Jieba;
use once_cell::sync::Lazy;

static JIEBA: Lazy<Jieba> = Lazy::new(Jieba::new);

/// Tokenize document or query text / 分词
///
/// Punctuation-only segments are dropped; the same function is used for indexing
/// and querying so both sides agree on token boundaries.
pub fn tokenize(text: &str) -> Vec<String> {
    let plain = strip_tags(text);
    let mut tokens = Vec::new();

    for word in JIEBA.cut_for_search(&plain, true) {
        // jieba keeps "hello-world" style runs together; split them further
        for part in word.split(|c: char| !c.is_alphanumeric()) {
            if part.is_empty() {
                continue;
            }
            tokens.push(part.to_lowercase());
        }
    }

    tokens
}

/// Remove HTML tags, keeping their text content / 去除HTML标签
pub fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }

    out
}

/// Check if text contains CJK characters (Chinese, Japanese, Korean) / 检测CJK字符
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{4e00}'..='\u{9fff}' |
            '\u{3400}'..='\u{4dbf}' |
            '\u{3040}'..='\u{309f}' |
            '\u{30a0}'..='\u{30ff}' |
            '\u{ac00}'..='\u{d7af}'
        )
    })
}

//! In-process inverted index / 内存倒排索引
//!
//! One collection per index name. Each collection keeps the token list of every
//! document (so re-upserts and deletes can retract old postings) and an
//! inverted map `token -> {doc id -> term frequency}`.
//!
//! Ranking sums, over the query tokens, the term frequency of exact matches
//! with weight 2 and of prefix matches with weight 1. Ties go to the lower id.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::AppResult;

use super::client::{Document, IndexClient, RankedIds};
use super::tokenizer::tokenize;

const EXACT_WEIGHT: u64 = 2;
const PREFIX_WEIGHT: u64 = 1;

#[derive(Debug, Default)]
struct Collection {
    /// doc id -> tokens it was indexed with / 文档词表
    documents: HashMap<i64, Vec<String>>,
    /// token -> doc id -> term frequency / 倒排表
    postings: HashMap<String, HashMap<i64, u64>>,
}

impl Collection {
    fn remove(&mut self, id: i64) -> bool {
        let Some(tokens) = self.documents.remove(&id) else {
            return false;
        };

        for token in tokens {
            if let Some(docs) = self.postings.get_mut(&token) {
                docs.remove(&id);
                if docs.is_empty() {
                    self.postings.remove(&token);
                }
            }
        }
        true
    }

    fn insert(&mut self, id: i64, tokens: Vec<String>) {
        self.remove(id);

        for token in &tokens {
            *self
                .postings
                .entry(token.clone())
                .or_default()
                .entry(id)
                .or_default() += 1;
        }
        self.documents.insert(id, tokens);
    }

    fn score(&self, query_tokens: &[String]) -> Vec<(i64, u64)> {
        let mut scores: HashMap<i64, u64> = HashMap::new();

        for token in query_tokens {
            if let Some(docs) = self.postings.get(token) {
                for (id, tf) in docs {
                    *scores.entry(*id).or_default() += tf * EXACT_WEIGHT;
                }
            }

            for (indexed, docs) in &self.postings {
                if indexed != token && indexed.starts_with(token.as_str()) {
                    for (id, tf) in docs {
                        *scores.entry(*id).or_default() += tf * PREFIX_WEIGHT;
                    }
                }
            }
        }

        let mut ranked: Vec<(i64, u64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }
}

/// Collect indexable text from a document's string values / 提取文档文本
fn document_tokens(document: &Document) -> Vec<String> {
    document
        .values()
        .filter_map(Value::as_str)
        .flat_map(tokenize)
        .collect()
}

/// Memory-backed index client / 内存索引客户端
#[derive(Debug, Default)]
pub struct MemoryIndex {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection / 集合文档数
    pub fn document_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.documents.len())
            .unwrap_or(0)
    }

    /// Drop every collection / 清空索引
    pub fn clear(&self) {
        self.collections.write().clear();
    }
}

#[async_trait]
impl IndexClient for MemoryIndex {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn upsert(&self, collection: &str, id: i64, document: &Document) -> AppResult<()> {
        let tokens = document_tokens(document);
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id, tokens);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: i64) -> AppResult<()> {
        if let Some(c) = self.collections.write().get_mut(collection) {
            c.remove(id);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        expression: &str,
        page: i64,
        per_page: i64,
    ) -> AppResult<RankedIds> {
        let query_tokens = tokenize(expression);
        if query_tokens.is_empty() {
            return Ok(RankedIds::empty());
        }

        let ranked = match self.collections.read().get(collection) {
            Some(c) => c.score(&query_tokens),
            None => return Ok(RankedIds::empty()),
        };

        let total = ranked.len() as u64;
        if per_page <= 0 {
            return Ok(RankedIds { ids: Vec::new(), total });
        }

        let offset = (page.max(1) - 1).saturating_mul(per_page) as usize;
        let ids = ranked
            .into_iter()
            .skip(offset)
            .take(per_page as usize)
            .map(|(id, _)| id)
            .collect();

        Ok(RankedIds { ids, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(title: &str, content: &str) -> Document {
        let mut d = Document::new();
        d.insert("title".to_string(), Value::from(title));
        d.insert("content".to_string(), Value::from(content));
        d
    }

    #[tokio::test]
    async fn test_index_and_query() {
        let index = MemoryIndex::new();
        index.upsert("posts", 1, &doc("Rust notes", "ownership and borrowing")).await.unwrap();
        index.upsert("posts", 2, &doc("Cooking", "zebra cake")).await.unwrap();
        index.upsert("posts", 3, &doc("测试文章", "中文内容")).await.unwrap();

        let hits = index.query("posts", "zebra", 1, 10).await.unwrap();
        assert_eq!(hits, RankedIds { ids: vec![2], total: 1 });

        let hits = index.query("posts", "测试", 1, 10).await.unwrap();
        assert_eq!(hits.ids, vec![3]);

        let hits = index.query("pages", "zebra", 1, 10).await.unwrap();
        assert_eq!(hits, RankedIds::empty());
    }

    #[tokio::test]
    async fn test_exact_beats_prefix() {
        let index = MemoryIndex::new();
        index.upsert("posts", 1, &doc("testing", "")).await.unwrap();
        index.upsert("posts", 2, &doc("test", "")).await.unwrap();

        let hits = index.query("posts", "test", 1, 10).await.unwrap();
        assert_eq!(hits.ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_ties_break_by_id() {
        let index = MemoryIndex::new();
        for id in [5, 3, 9] {
            index.upsert("chirps", id, &doc("", "same words")).await.unwrap();
        }

        let hits = index.query("chirps", "same", 1, 10).await.unwrap();
        assert_eq!(hits.ids, vec![3, 5, 9]);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_and_is_idempotent() {
        let index = MemoryIndex::new();
        index.upsert("posts", 1, &doc("alpha", "")).await.unwrap();
        index.upsert("posts", 1, &doc("beta", "")).await.unwrap();

        assert!(index.query("posts", "alpha", 1, 10).await.unwrap().ids.is_empty());
        let first = index.query("posts", "beta", 1, 10).await.unwrap();

        index.upsert("posts", 1, &doc("beta", "")).await.unwrap();
        let second = index.query("posts", "beta", 1, 10).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(index.document_count("posts"), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let index = MemoryIndex::new();
        index.upsert("posts", 1, &doc("gone", "")).await.unwrap();
        index.delete("posts", 1).await.unwrap();
        index.delete("posts", 1).await.unwrap();
        index.delete("missing", 1).await.unwrap();

        assert_eq!(index.query("posts", "gone", 1, 10).await.unwrap(), RankedIds::empty());
        assert_eq!(index.document_count("posts"), 0);
    }

    #[tokio::test]
    async fn test_paging() {
        let index = MemoryIndex::new();
        for id in 1..=5 {
            index.upsert("posts", id, &doc("page", "")).await.unwrap();
        }

        let second = index.query("posts", "page", 2, 2).await.unwrap();
        assert_eq!(second, RankedIds { ids: vec![3, 4], total: 5 });

        let clamped = index.query("posts", "page", 0, 2).await.unwrap();
        assert_eq!(clamped.ids, vec![1, 2]);

        let zero = index.query("posts", "page", 1, 0).await.unwrap();
        assert_eq!(zero, RankedIds { ids: vec![], total: 5 });

        let past_end = index.query("posts", "page", 9, 2).await.unwrap();
        assert!(past_end.ids.is_empty());
        assert_eq!(past_end.total, 5);

        index.clear();
        assert_eq!(index.document_count("posts"), 0);
    }
}

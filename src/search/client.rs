//! Index client boundary / 索引客户端
//!
//! Every backend answers the same three primitives. A disabled client accepts
//! writes silently and answers every query with zero hits, so callers never
//! branch on availability.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::config::{SearchBackend, SearchConfig};
use crate::error::AppResult;

use super::elastic::ElasticIndex;
use super::memory::MemoryIndex;

/// Field map stored for one document / 文档字段
pub type Document = Map<String, Value>;

/// One page of ranked ids plus the total hit count / 排序后的ID页
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedIds {
    /// Relevance order, best first / 按相关度排序
    pub ids: Vec<i64>,
    pub total: u64,
}

impl RankedIds {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// External search index / 外部搜索索引
#[async_trait]
pub trait IndexClient: Send + Sync {
    /// Backend name for logs / 后端名称
    fn name(&self) -> &'static str;

    fn is_enabled(&self) -> bool {
        true
    }

    /// Create or overwrite document `id` in `collection` / 写入文档
    async fn upsert(&self, collection: &str, id: i64, document: &Document) -> AppResult<()>;

    /// Remove document `id`; removing a missing document succeeds / 删除文档
    async fn delete(&self, collection: &str, id: i64) -> AppResult<()>;

    /// Ranked ids for a 1-based page / 查询（页码从1开始）
    async fn query(
        &self,
        collection: &str,
        expression: &str,
        page: i64,
        per_page: i64,
    ) -> AppResult<RankedIds>;
}

/// No-op client used when search is turned off / 禁用的索引
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledIndex;

#[async_trait]
impl IndexClient for DisabledIndex {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn upsert(&self, _collection: &str, _id: i64, _document: &Document) -> AppResult<()> {
        Ok(())
    }

    async fn delete(&self, _collection: &str, _id: i64) -> AppResult<()> {
        Ok(())
    }

    async fn query(
        &self,
        _collection: &str,
        _expression: &str,
        _page: i64,
        _per_page: i64,
    ) -> AppResult<RankedIds> {
        Ok(RankedIds::empty())
    }
}

/// Build the configured backend / 按配置创建索引客户端
pub fn build_client(config: &SearchConfig) -> AppResult<Arc<dyn IndexClient>> {
    let client: Arc<dyn IndexClient> = match config.backend {
        SearchBackend::Disabled => Arc::new(DisabledIndex),
        SearchBackend::Memory => Arc::new(MemoryIndex::new()),
        SearchBackend::Elasticsearch => Arc::new(ElasticIndex::from_config(config)?),
    };

    tracing::info!(
        "Search index backend: {} (sync {:?})",
        client.name(),
        config.sync_mode
    );
    Ok(client)
}

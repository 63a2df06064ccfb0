//! Search module - index clients, searchable entities and commit-driven sync / 搜索模块
//!
//! Call direction is one way: stores register entities on a unit of work, the
//! unit of work hands its change set to [`IndexSync`] after commit, and
//! [`IndexSync`] talks to an [`IndexClient`]. Reads go through [`search`],
//! which resolves ranked ids back to rows.

pub mod client;
pub mod elastic;
pub mod memory;
pub mod searchable;
pub mod sync;
pub mod tokenizer;

pub use client::{build_client, DisabledIndex, Document, IndexClient, RankedIds};
pub use memory::MemoryIndex;
pub use searchable::{fetch_ranked, reindex, search, IndexedDocument, SearchPage, Searchable};
pub use sync::{IndexOp, IndexSync};

/// Index test doubles / 测试替身
#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::client::{Document, IndexClient, RankedIds};
    use crate::error::{AppError, AppResult};

    /// Answers every query with the same ranked ids / 固定结果
    pub struct FixedIndex {
        hits: RankedIds,
        queries: AtomicUsize,
    }

    impl FixedIndex {
        pub fn new(ids: Vec<i64>, total: u64) -> Self {
            Self {
                hits: RankedIds { ids, total },
                queries: AtomicUsize::new(0),
            }
        }

        pub fn query_count(&self) -> usize {
            self.queries.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IndexClient for FixedIndex {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn upsert(&self, _: &str, _: i64, _: &Document) -> AppResult<()> {
            Ok(())
        }

        async fn delete(&self, _: &str, _: i64) -> AppResult<()> {
            Ok(())
        }

        async fn query(&self, _: &str, _: &str, _: i64, _: i64) -> AppResult<RankedIds> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(self.hits.clone())
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Upsert(String, i64),
        Delete(String, i64),
    }

    /// Records every write / 记录写操作
    #[derive(Default)]
    pub struct RecordingIndex {
        calls: Mutex<Vec<Call>>,
    }

    impl RecordingIndex {
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl IndexClient for RecordingIndex {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn upsert(&self, collection: &str, id: i64, _: &Document) -> AppResult<()> {
            self.calls.lock().push(Call::Upsert(collection.to_string(), id));
            Ok(())
        }

        async fn delete(&self, collection: &str, id: i64) -> AppResult<()> {
            self.calls.lock().push(Call::Delete(collection.to_string(), id));
            Ok(())
        }

        async fn query(&self, _: &str, _: &str, _: i64, _: i64) -> AppResult<RankedIds> {
            Ok(RankedIds::empty())
        }
    }

    /// Fails every call / 总是失败
    pub struct FailingIndex;

    #[async_trait]
    impl IndexClient for FailingIndex {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn upsert(&self, _: &str, _: i64, _: &Document) -> AppResult<()> {
            Err(AppError::Index("index unavailable".to_string()))
        }

        async fn delete(&self, _: &str, _: i64) -> AppResult<()> {
            Err(AppError::Index("index unavailable".to_string()))
        }

        async fn query(&self, _: &str, _: &str, _: i64, _: i64) -> AppResult<RankedIds> {
            Err(AppError::Index("index unavailable".to_string()))
        }
    }
}

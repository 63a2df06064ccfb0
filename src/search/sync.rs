//! Post-commit index synchronization / 提交后索引同步
//!
//! After a unit of work commits, its change set is turned into index operations
//! (upsert for added/modified searchable entities, delete for deleted ones).
//! Failures are logged and swallowed: the commit already happened and the
//! index is allowed to lag behind it.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::config::{SearchConfig, SyncMode};
use crate::uow::{ChangeSet, UnitOfWork};

use super::client::{Document, IndexClient};

/// One index mutation / 单个索引操作
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOp {
    Upsert {
        collection: &'static str,
        id: i64,
        document: Document,
    },
    Delete {
        collection: &'static str,
        id: i64,
    },
}

/// Translate a committed change set into index operations / 生成索引操作
///
/// Non-searchable entities are skipped here rather than at capture time. A
/// written row that is not indexable (a draft) becomes a delete, so unpublishing
/// removes it from the index.
pub fn plan(change_set: &ChangeSet) -> Vec<IndexOp> {
    let upserts = change_set
        .added
        .iter()
        .chain(change_set.modified.iter())
        .filter_map(|entity| entity.searchable())
        .map(|doc| {
            if doc.is_indexable() {
                IndexOp::Upsert {
                    collection: doc.index_name(),
                    id: doc.document_id(),
                    document: doc.to_document(),
                }
            } else {
                IndexOp::Delete {
                    collection: doc.index_name(),
                    id: doc.document_id(),
                }
            }
        });

    let deletes = change_set
        .deleted
        .iter()
        .filter_map(|entity| entity.searchable())
        .map(|doc| IndexOp::Delete {
            collection: doc.index_name(),
            id: doc.document_id(),
        });

    upserts.chain(deletes).collect()
}

/// Apply operations one by one, logging failures / 执行索引操作
///
/// Returns the number of failed operations.
pub async fn apply(client: &dyn IndexClient, ops: Vec<IndexOp>) -> usize {
    let mut failed = 0;

    for op in ops {
        let result = match &op {
            IndexOp::Upsert {
                collection,
                id,
                document,
            } => client.upsert(collection, *id, document).await,
            IndexOp::Delete { collection, id } => client.delete(collection, *id).await,
        };

        if let Err(e) = result {
            failed += 1;
            tracing::warn!("Index sync failed for {:?}: {}", op_label(&op), e);
        }
    }

    failed
}

fn op_label(op: &IndexOp) -> String {
    match op {
        IndexOp::Upsert { collection, id, .. } => format!("upsert {}/{}", collection, id),
        IndexOp::Delete { collection, id } => format!("delete {}/{}", collection, id),
    }
}

#[derive(Clone)]
enum Dispatch {
    Inline,
    Queued(mpsc::Sender<Vec<IndexOp>>),
}

/// Hooks units of work up to the index / 索引同步器
#[derive(Clone)]
pub struct IndexSync {
    client: Arc<dyn IndexClient>,
    dispatch: Dispatch,
}

impl IndexSync {
    /// Apply operations inside the post-commit hook / 同步模式
    pub fn inline(client: Arc<dyn IndexClient>) -> Self {
        Self {
            client,
            dispatch: Dispatch::Inline,
        }
    }

    /// Start the background worker behind a bounded queue / 启动后台同步任务
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(client: Arc<dyn IndexClient>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(run_worker(client.clone(), rx));
        Self {
            client,
            dispatch: Dispatch::Queued(tx),
        }
    }

    pub fn from_config(client: Arc<dyn IndexClient>, config: &SearchConfig) -> Self {
        match config.sync_mode {
            SyncMode::Inline => Self::inline(client),
            SyncMode::Queued => Self::spawn(client, config.queue_capacity),
        }
    }

    pub fn client(&self) -> &Arc<dyn IndexClient> {
        &self.client
    }

    /// Register the post-commit sync on a unit of work / 注册提交后同步
    pub fn attach(&self, uow: &mut UnitOfWork) {
        let sync = self.clone();
        uow.on_postcommit(move |change_set| async move {
            let ops = plan(&change_set);
            if !ops.is_empty() {
                sync.dispatch(ops).await;
            }
        });
    }

    /// Hand operations to the index; never fails / 分发索引操作
    pub async fn dispatch(&self, ops: Vec<IndexOp>) {
        match &self.dispatch {
            Dispatch::Inline => {
                apply(self.client.as_ref(), ops).await;
            }
            Dispatch::Queued(tx) => match tx.try_send(ops) {
                Ok(()) => {}
                Err(TrySendError::Full(ops)) => {
                    tracing::warn!("Index sync queue full, dropped {} operations", ops.len());
                }
                Err(TrySendError::Closed(ops)) => {
                    tracing::warn!("Index sync worker stopped, dropped {} operations", ops.len());
                }
            },
        }
    }
}

async fn run_worker(client: Arc<dyn IndexClient>, mut rx: mpsc::Receiver<Vec<IndexOp>>) {
    tracing::info!("Index sync worker started ({})", client.name());

    while let Some(ops) = rx.recv().await {
        let count = ops.len();
        let failed = apply(client.as_ref(), ops).await;
        tracing::debug!("Index sync batch applied: {} ops, {} failed", count, failed);
    }

    tracing::info!("Index sync worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{Chirp, Comment, Entity, Post};
    use crate::search::memory::MemoryIndex;
    use crate::search::testing::{Call, FailingIndex, RecordingIndex};
    use std::time::Duration;

    fn post(id: i64, title: &str) -> Post {
        Post {
            id,
            blog_id: 1,
            user_id: 1,
            title: title.to_string(),
            content: String::new(),
            published: true,
            publish_in_newsletter: false,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn comment(id: i64) -> Comment {
        Comment {
            id,
            post_id: 1,
            user_id: 1,
            content: "c".to_string(),
            created_at: String::new(),
        }
    }

    #[test]
    fn test_plan_filters_non_searchable() {
        let change_set = ChangeSet {
            added: vec![Entity::Post(post(1, "a")), Entity::Comment(comment(1))],
            modified: vec![Entity::Post(post(2, "b"))],
            deleted: vec![Entity::Post(post(3, "c")), Entity::Comment(comment(2))],
        };

        let ops = plan(&change_set);
        assert_eq!(ops.len(), 3);
        assert!(matches!(ops[0], IndexOp::Upsert { collection: "posts", id: 1, .. }));
        assert!(matches!(ops[1], IndexOp::Upsert { collection: "posts", id: 2, .. }));
        assert_eq!(ops[2], IndexOp::Delete { collection: "posts", id: 3 });
    }

    #[test]
    fn test_plan_turns_drafts_into_deletes() {
        let mut draft = post(4, "draft");
        draft.published = false;
        let change_set = ChangeSet {
            added: vec![],
            modified: vec![Entity::Post(draft)],
            deleted: vec![],
        };

        assert_eq!(
            plan(&change_set),
            vec![IndexOp::Delete { collection: "posts", id: 4 }]
        );
    }

    #[tokio::test]
    async fn test_apply_swallows_failures() {
        let ops = plan(&ChangeSet {
            added: vec![Entity::Post(post(1, "a"))],
            modified: vec![],
            deleted: vec![Entity::Post(post(2, "b"))],
        });
        assert_eq!(apply(&FailingIndex, ops).await, 2);
    }

    #[tokio::test]
    async fn test_inline_sync_runs_after_commit_only() {
        let pool = db::connect_memory().await.unwrap();
        let recorder = Arc::new(RecordingIndex::default());
        let sync = IndexSync::inline(recorder.clone());

        let mut uow = UnitOfWork::begin(&pool).await.unwrap();
        sync.attach(&mut uow);
        uow.add(Chirp {
            id: 1,
            user_id: 1,
            content: "rolled back".to_string(),
            created_at: String::new(),
        });
        uow.rollback().await.unwrap();
        assert!(recorder.calls().is_empty());

        let mut uow = UnitOfWork::begin(&pool).await.unwrap();
        sync.attach(&mut uow);
        uow.add(post(5, "kept"));
        uow.delete(post(6, "gone"));
        uow.commit().await.unwrap();

        assert_eq!(
            recorder.calls(),
            vec![
                Call::Upsert("posts".to_string(), 5),
                Call::Delete("posts".to_string(), 6),
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_index_does_not_fail_commit() {
        let pool = db::connect_memory().await.unwrap();
        let sync = IndexSync::inline(Arc::new(FailingIndex));

        let mut uow = UnitOfWork::begin(&pool).await.unwrap();
        sync.attach(&mut uow);
        uow.add(post(1, "fine"));
        assert!(uow.commit().await.is_ok());
    }

    #[tokio::test]
    async fn test_queued_sync_is_eventually_visible() {
        let index = Arc::new(MemoryIndex::new());
        let sync = IndexSync::spawn(index.clone(), 8);

        sync.dispatch(plan(&ChangeSet {
            added: vec![Entity::Post(post(1, "eventually"))],
            modified: vec![],
            deleted: vec![],
        }))
        .await;

        let mut found = false;
        for _ in 0..100 {
            if index.document_count("posts") == 1 {
                found = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(found);
    }

    #[tokio::test]
    async fn test_full_queue_drops_batch() {
        let (tx, mut rx) = mpsc::channel(1);
        let sync = IndexSync {
            client: Arc::new(RecordingIndex::default()),
            dispatch: Dispatch::Queued(tx),
        };

        let batch = vec![IndexOp::Delete { collection: "posts", id: 1 }];
        sync.dispatch(batch.clone()).await;
        sync.dispatch(vec![IndexOp::Delete { collection: "posts", id: 2 }]).await;

        assert_eq!(rx.try_recv().unwrap(), batch);
        assert!(rx.try_recv().is_err());
    }
}

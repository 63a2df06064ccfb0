//! Unit of work - one write transaction plus its commit lifecycle / 工作单元
//!
//! Writes register the entities they touch (added / modified / deleted).
//! `commit` snapshots that registry into a [`ChangeSet`] right before the
//! database commit, then hands the snapshot to post-commit callbacks exactly
//! once after the commit succeeded. Rollback, a failed commit or dropping the
//! unit of work discards the snapshot without running any callback.

use futures::future::BoxFuture;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::future::Future;
use std::sync::Arc;

use crate::error::AppResult;
use crate::models::{Entity, EntityKind};

type PrecommitHook = Box<dyn FnOnce(&ChangeSet) + Send>;
type PostcommitHook = Box<dyn FnOnce(Arc<ChangeSet>) -> BoxFuture<'static, ()> + Send>;

/// Snapshot of the entities touched by one transaction / 事务变更集
///
/// The three sequences are disjoint and keep registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub added: Vec<Entity>,
    pub modified: Vec<Entity>,
    pub deleted: Vec<Entity>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }
}

/// Entities registered so far in the open transaction / 待提交实体登记
#[derive(Debug, Default)]
struct Pending {
    added: Vec<Entity>,
    dirty: Vec<Entity>,
    deleted: Vec<Entity>,
}

fn position(list: &[Entity], key: (EntityKind, i64)) -> Option<usize> {
    list.iter().position(|e| e.key() == key)
}

/// Replace the entry with the same key, or append / 同键替换，否则追加
fn upsert(list: &mut Vec<Entity>, entity: Entity) {
    match position(list, entity.key()) {
        Some(idx) => list[idx] = entity,
        None => list.push(entity),
    }
}

impl Pending {
    fn add(&mut self, entity: Entity) {
        if position(&self.deleted, entity.key()).is_some() {
            return;
        }
        upsert(&mut self.added, entity);
    }

    fn mark_dirty(&mut self, entity: Entity) {
        let key = entity.key();
        if position(&self.deleted, key).is_some() {
            return;
        }
        // Still new in this transaction: keep it in `added` with fresh values
        if let Some(idx) = position(&self.added, key) {
            self.added[idx] = entity;
            return;
        }
        upsert(&mut self.dirty, entity);
    }

    fn delete(&mut self, entity: Entity) {
        let key = entity.key();
        self.added.retain(|e| e.key() != key);
        self.dirty.retain(|e| e.key() != key);
        upsert(&mut self.deleted, entity);
    }

    fn len(&self) -> usize {
        self.added.len() + self.dirty.len() + self.deleted.len()
    }

    fn capture(&mut self) -> ChangeSet {
        ChangeSet {
            added: std::mem::take(&mut self.added),
            modified: std::mem::take(&mut self.dirty),
            deleted: std::mem::take(&mut self.deleted),
        }
    }
}

/// One write transaction with lifecycle callbacks / 带生命周期回调的写事务
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
    pending: Pending,
    precommit: Vec<PrecommitHook>,
    postcommit: Vec<PostcommitHook>,
}

impl UnitOfWork {
    /// Begin a transaction on the pool / 开启事务
    pub async fn begin(pool: &SqlitePool) -> AppResult<Self> {
        let tx = pool.begin().await?;
        Ok(Self {
            tx,
            pending: Pending::default(),
            precommit: Vec::new(),
            postcommit: Vec::new(),
        })
    }

    /// Connection bound to this transaction / 事务连接
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    /// Register a newly inserted entity / 登记新增实体
    pub fn add(&mut self, entity: impl Into<Entity>) {
        self.pending.add(entity.into());
    }

    /// Register an updated entity / 登记修改实体
    pub fn mark_dirty(&mut self, entity: impl Into<Entity>) {
        self.pending.mark_dirty(entity.into());
    }

    /// Register a deleted entity; deletion is terminal for this transaction / 登记删除实体
    pub fn delete(&mut self, entity: impl Into<Entity>) {
        self.pending.delete(entity.into());
    }

    /// Number of registered entities / 已登记实体数
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Run with the captured change set right before the database commit / 提交前回调
    pub fn on_precommit<F>(&mut self, hook: F)
    where
        F: FnOnce(&ChangeSet) + Send + 'static,
    {
        self.precommit.push(Box::new(hook));
    }

    /// Run once after the database commit succeeded / 提交成功后回调
    pub fn on_postcommit<F, Fut>(&mut self, hook: F)
    where
        F: FnOnce(Arc<ChangeSet>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.postcommit
            .push(Box::new(move |change_set| Box::pin(hook(change_set))));
    }

    /// Capture, commit, then replay the snapshot to post-commit callbacks / 提交
    pub async fn commit(self) -> AppResult<()> {
        let UnitOfWork {
            tx,
            mut pending,
            precommit,
            postcommit,
        } = self;

        let change_set = pending.capture();
        tracing::debug!(
            "Committing unit of work: {} added, {} modified, {} deleted",
            change_set.added.len(),
            change_set.modified.len(),
            change_set.deleted.len()
        );

        for hook in precommit {
            hook(&change_set);
        }

        // A failed commit drops the snapshot and the post-commit callbacks here
        tx.commit().await?;

        let change_set = Arc::new(change_set);
        for hook in postcommit {
            hook(Arc::clone(&change_set)).await;
        }

        Ok(())
    }

    /// Roll back and discard everything registered / 回滚
    pub async fn rollback(self) -> AppResult<()> {
        tracing::debug!("Rolling back unit of work with {} pending entities", self.pending.len());
        self.tx.rollback().await?;
        Ok(())
    }
}

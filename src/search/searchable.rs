//! Searchable entity capability / 可搜索实体
//!
//! A searchable type declares its collection name, table and indexed fields.
//! Search asks the index for ranked ids and resolves them back to rows with an
//! explicit rank mapping, so the index order survives the database round trip.

use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqlitePool};

use crate::error::AppResult;
use crate::models::{Blog, Chirp, Entity, Page, Post};

use super::client::{Document, IndexClient};

/// Object-safe view used when dispatching over mixed change sets / 索引文档视图
pub trait IndexedDocument: Send + Sync {
    fn index_name(&self) -> &'static str;
    fn document_id(&self) -> i64;
    fn to_document(&self) -> Document;
    /// Whether the row belongs in the index at all / 是否应进入索引
    fn is_indexable(&self) -> bool;
}

/// Static search declaration of an entity type / 实体的搜索声明
pub trait Searchable: for<'r> FromRow<'r, SqliteRow> + Send + Sync + Unpin + Sized {
    /// Index collection name / 索引集合名
    const INDEX: &'static str;
    /// Primary storage table / 数据表
    const TABLE: &'static str;
    /// Indexed text fields / 索引字段
    const FIELDS: &'static [&'static str];

    fn id(&self) -> i64;

    /// Value of one declared field / 字段值
    fn field(&self, name: &str) -> Value;

    /// Rows that are not publicly visible stay out of the index / 非公开内容不入索引
    fn is_indexable(&self) -> bool {
        true
    }
}

impl<T: Searchable> IndexedDocument for T {
    fn index_name(&self) -> &'static str {
        T::INDEX
    }

    fn document_id(&self) -> i64 {
        self.id()
    }

    fn to_document(&self) -> Document {
        T::FIELDS
            .iter()
            .map(|name| (name.to_string(), self.field(name)))
            .collect()
    }

    fn is_indexable(&self) -> bool {
        Searchable::is_indexable(self)
    }
}

impl Searchable for Post {
    const INDEX: &'static str = "posts";
    const TABLE: &'static str = "posts";
    const FIELDS: &'static [&'static str] = &["title", "content"];

    fn id(&self) -> i64 {
        self.id
    }

    fn is_indexable(&self) -> bool {
        self.published
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "title" => Value::from(self.title.as_str()),
            "content" => Value::from(self.content.as_str()),
            _ => Value::Null,
        }
    }
}

impl Searchable for Page {
    const INDEX: &'static str = "pages";
    const TABLE: &'static str = "pages";
    const FIELDS: &'static [&'static str] = &["title", "content"];

    fn id(&self) -> i64 {
        self.id
    }

    fn is_indexable(&self) -> bool {
        self.published
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "title" => Value::from(self.title.as_str()),
            "content" => Value::from(self.content.as_str()),
            _ => Value::Null,
        }
    }
}

impl Searchable for Blog {
    const INDEX: &'static str = "blogs";
    const TABLE: &'static str = "blogs";
    const FIELDS: &'static [&'static str] = &["title", "description"];

    fn id(&self) -> i64 {
        self.id
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "title" => Value::from(self.title.as_str()),
            "description" => Value::from(self.description.clone()),
            _ => Value::Null,
        }
    }
}

impl Searchable for Chirp {
    const INDEX: &'static str = "chirps";
    const TABLE: &'static str = "chirps";
    const FIELDS: &'static [&'static str] = &["content"];

    fn id(&self) -> i64 {
        self.id
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "content" => Value::from(self.content.as_str()),
            _ => Value::Null,
        }
    }
}

impl Entity {
    /// Search capability of this entity, if its type is searchable / 搜索能力
    pub fn searchable(&self) -> Option<&dyn IndexedDocument> {
        match self {
            Entity::Post(p) => Some(p as &dyn IndexedDocument),
            Entity::Page(p) => Some(p as &dyn IndexedDocument),
            Entity::Blog(b) => Some(b as &dyn IndexedDocument),
            Entity::Chirp(c) => Some(c as &dyn IndexedDocument),
            Entity::User(_) | Entity::Comment(_) | Entity::Webmention(_) => None,
        }
    }
}

/// One page of resolved search results / 一页搜索结果
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage<T> {
    pub items: Vec<T>,
    /// Total hits reported by the index / 索引报告的总命中数
    pub total: u64,
}

/// Paged search over a searchable type / 分页搜索
///
/// A zero total returns before any database access.
pub async fn search<T: Searchable>(
    pool: &SqlitePool,
    client: &dyn IndexClient,
    expression: &str,
    page: i64,
    per_page: i64,
) -> AppResult<SearchPage<T>> {
    let hits = client.query(T::INDEX, expression, page, per_page).await?;
    if hits.total == 0 {
        return Ok(SearchPage {
            items: Vec::new(),
            total: 0,
        });
    }

    let items = fetch_ranked::<T>(pool, &hits.ids).await?;
    if items.len() < hits.ids.len() {
        tracing::debug!(
            "Dropped {} stale ids from {} search results",
            hits.ids.len() - items.len(),
            T::INDEX
        );
    }

    Ok(SearchPage {
        items,
        total: hits.total,
    })
}

/// Load rows for `ids` in the given order; ids without a row are skipped / 按排名加载
pub async fn fetch_ranked<T: Searchable>(pool: &SqlitePool, ids: &[i64]) -> AppResult<Vec<T>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let ranks: String = (0..ids.len())
        .map(|rank| format!(" WHEN ? THEN {}", rank))
        .collect();
    let sql = format!(
        "SELECT * FROM {} WHERE id IN ({}) ORDER BY CASE id{} END",
        T::TABLE,
        placeholders,
        ranks
    );

    let mut query = sqlx::query_as::<_, T>(&sql);
    for id in ids {
        query = query.bind(*id);
    }
    for id in ids {
        query = query.bind(*id);
    }

    Ok(query.fetch_all(pool).await?)
}

/// Re-upsert every row of a searchable type / 重建索引
///
/// Rows that are not indexable are deleted from the index instead. Returns the
/// number of documents written; individual failures are logged.
pub async fn reindex<T: Searchable>(pool: &SqlitePool, client: &dyn IndexClient) -> AppResult<usize> {
    let sql = format!("SELECT * FROM {} ORDER BY id", T::TABLE);
    let rows = sqlx::query_as::<_, T>(&sql).fetch_all(pool).await?;

    let mut indexed = 0;
    for row in &rows {
        if !Searchable::is_indexable(row) {
            if let Err(e) = client.delete(T::INDEX, row.id()).await {
                tracing::warn!("Reindex purge of {}/{} failed: {}", T::INDEX, row.id(), e);
            }
            continue;
        }
        match client.upsert(T::INDEX, row.id(), &row.to_document()).await {
            Ok(()) => indexed += 1,
            Err(e) => tracing::warn!("Reindex of {}/{} failed: {}", T::INDEX, row.id(), e),
        }
    }

    tracing::info!("Reindexed {}/{} {}", indexed, rows.len(), T::INDEX);
    Ok(indexed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::search::client::RankedIds;
    use crate::search::memory::MemoryIndex;
    use crate::search::testing::FixedIndex;

    async fn seed_chirps(pool: &SqlitePool, contents: &[&str]) {
        sqlx::query(
            "INSERT INTO users (username, email, active, created_at) VALUES ('a', 'a@example.com', 1, '')",
        )
        .execute(pool)
        .await
        .unwrap();
        for content in contents {
            sqlx::query("INSERT INTO chirps (user_id, content, created_at) VALUES (1, ?, '')")
                .bind(*content)
                .execute(pool)
                .await
                .unwrap();
        }
    }

    #[test]
    fn test_projection_uses_declared_fields() {
        let blog = Blog {
            id: 4,
            user_id: 1,
            title: "Field notes".to_string(),
            description: None,
            slug: "field-notes".to_string(),
            newsletter: false,
            created_at: String::new(),
        };
        let doc = blog.to_document();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc["title"], Value::from("Field notes"));
        assert_eq!(doc["description"], Value::Null);
        assert_eq!(blog.index_name(), "blogs");
        assert_eq!(blog.document_id(), 4);

        let entity = Entity::Blog(blog);
        assert!(entity.searchable().is_some());
    }

    #[test]
    fn test_comment_is_not_searchable() {
        let entity = Entity::Comment(crate::models::Comment {
            id: 1,
            post_id: 1,
            user_id: 1,
            content: "nope".to_string(),
            created_at: String::new(),
        });
        assert!(entity.searchable().is_none());
    }

    #[tokio::test]
    async fn test_rank_order_is_preserved() {
        let pool = db::connect_memory().await.unwrap();
        seed_chirps(&pool, &["one", "two", "three"]).await;
        let index = FixedIndex::new(vec![3, 1, 2], 3);

        let page = search::<Chirp>(&pool, &index, "anything", 1, 10).await.unwrap();
        let ids: Vec<i64> = page.items.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn test_stale_ids_are_dropped() {
        let pool = db::connect_memory().await.unwrap();
        seed_chirps(&pool, &["one", "two"]).await;
        let index = FixedIndex::new(vec![2, 99, 1], 3);

        let page = search::<Chirp>(&pool, &index, "anything", 1, 10).await.unwrap();
        let ids: Vec<i64> = page.items.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn test_zero_total_skips_database() {
        let pool = db::connect_memory().await.unwrap();
        pool.close().await;

        let index = FixedIndex::new(vec![], 0);
        let page = search::<Post>(&pool, &index, "nothing", 1, 10).await.unwrap();
        assert_eq!(page, SearchPage { items: vec![], total: 0 });
        assert_eq!(index.query_count(), 1);

        // Same closed pool fails as soon as rows must be resolved
        let index = FixedIndex::new(vec![1], 1);
        assert!(search::<Post>(&pool, &index, "something", 1, 10).await.is_err());
    }

    #[tokio::test]
    async fn test_reindex_rebuilds_memory_index() {
        let pool = db::connect_memory().await.unwrap();
        seed_chirps(&pool, &["kettle", "teapot"]).await;
        let index = MemoryIndex::new();

        let count = reindex::<Chirp>(&pool, &index).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            index.query("chirps", "teapot", 1, 10).await.unwrap(),
            RankedIds { ids: vec![2], total: 1 }
        );
    }

    #[tokio::test]
    async fn test_reindex_purges_drafts() {
        use crate::store::fixtures;

        let pool = fixtures::pool().await;
        let owner = fixtures::user(&pool, "alice").await;
        let blog = fixtures::blog(&pool, &owner, "notes").await;
        let live = fixtures::post(&pool, &blog, &owner, "rust live").await;
        let draft = fixtures::post(&pool, &blog, &owner, "rust draft").await;

        let index = MemoryIndex::new();
        assert_eq!(reindex::<Post>(&pool, &index).await.unwrap(), 2);

        sqlx::query("UPDATE posts SET published = 0 WHERE id = ?")
            .bind(draft.id)
            .execute(&pool)
            .await
            .unwrap();
        assert_eq!(reindex::<Post>(&pool, &index).await.unwrap(), 1);

        let page = search::<Post>(&pool, &index, "rust", 1, 10).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, live.id);
    }
}

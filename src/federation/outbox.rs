//! Paged outbox of an author's published posts / 作者发件箱分页

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::AppResult;
use crate::models::User;
use crate::store::posts;
use crate::utils::PageWindow;

use super::activity::{ActivityObject, CreateActivity, Urls, ACTIVITY_STREAMS};

/// One outbox page before rendering / 发件箱页
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxPage {
    pub page: i64,
    pub items: Vec<ActivityObject>,
    /// Published posts of the author / 已发布文章总数
    pub total: i64,
    pub has_next: bool,
    pub has_prev: bool,
    pub next_num: Option<i64>,
    pub prev_num: Option<i64>,
}

/// Build page `page` of `user`'s outbox; pages past the end are empty / 构建发件箱
pub async fn build_outbox(
    pool: &SqlitePool,
    user: &User,
    urls: &Urls,
    page: i64,
    per_page: i64,
) -> AppResult<OutboxPage> {
    let window = PageWindow::new(page, per_page);
    let listing = posts::list_published_by_user(pool, user.id, window).await?;

    let items = listing
        .items
        .iter()
        .map(|post| ActivityObject::from_post(post, &user.username, urls))
        .collect();

    Ok(OutboxPage {
        page: window.page,
        items,
        total: listing.total,
        has_next: window.has_next(listing.total),
        has_prev: window.has_prev(),
        next_num: window.next_num(listing.total),
        prev_num: window.prev_num(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedCollectionPage {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub part_of: String,
    pub total_items: i64,
    pub ordered_items: Vec<CreateActivity>,
    /// Always present, `null` on the last page / 最后一页为null
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub prev: Option<String>,
}

impl OutboxPage {
    pub fn to_collection(&self, username: &str, urls: &Urls) -> OrderedCollectionPage {
        OrderedCollectionPage {
            context: ACTIVITY_STREAMS.to_string(),
            id: urls.outbox_page(username, self.page),
            kind: "OrderedCollectionPage".to_string(),
            part_of: urls.outbox(username),
            total_items: self.total,
            ordered_items: self
                .items
                .iter()
                .map(|item| item.to_create(username, urls))
                .collect(),
            next: self.next_num.map(|n| urls.outbox_page(username, n)),
            prev: self.prev_num.map(|n| urls.outbox_page(username, n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures;

    async fn seeded(count: usize) -> (SqlitePool, User) {
        let pool = fixtures::pool().await;
        let user = fixtures::user(&pool, "alice").await;
        let blog = fixtures::blog(&pool, &user, "notes").await;
        for n in 0..count {
            fixtures::post(&pool, &blog, &user, &format!("post {}", n)).await;
        }
        (pool, user)
    }

    #[tokio::test]
    async fn test_twenty_five_posts_in_pages_of_ten() {
        let (pool, user) = seeded(25).await;
        let urls = Urls::new("https://blog.example");

        let first = build_outbox(&pool, &user, &urls, 1, 10).await.unwrap();
        assert_eq!(first.items.len(), 10);
        assert!(first.has_next);
        assert!(!first.has_prev);
        assert_eq!(first.total, 25);

        let last = build_outbox(&pool, &user, &urls, 3, 10).await.unwrap();
        assert_eq!(last.items.len(), 5);
        assert!(!last.has_next);
        assert!(last.has_prev);
        assert_eq!(last.prev_num, Some(2));

        let beyond = build_outbox(&pool, &user, &urls, 4, 10).await.unwrap();
        assert!(beyond.items.is_empty());
    }

    #[tokio::test]
    async fn test_newest_first() {
        let (pool, user) = seeded(3).await;
        let urls = Urls::new("https://blog.example");

        let page = build_outbox(&pool, &user, &urls, 1, 10).await.unwrap();
        let ids: Vec<i64> = page.items.iter().map(|i| i.post_id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(ids, sorted);
    }

    #[tokio::test]
    async fn test_empty_outbox() {
        let (pool, user) = seeded(0).await;
        let urls = Urls::new("https://blog.example");

        let page = build_outbox(&pool, &user, &urls, 0, 10).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
        assert!(!page.has_next && !page.has_prev);

        let json = serde_json::to_value(page.to_collection("alice", &urls)).unwrap();
        assert_eq!(json["totalItems"], 0);
        assert!(json["next"].is_null());
        assert!(json.get("prev").is_none());
        assert_eq!(json["orderedItems"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_collection_links() {
        let (pool, user) = seeded(12).await;
        let urls = Urls::new("https://blog.example");

        let page = build_outbox(&pool, &user, &urls, 2, 5).await.unwrap();
        let json = serde_json::to_value(page.to_collection("alice", &urls)).unwrap();
        assert_eq!(json["type"], "OrderedCollectionPage");
        assert_eq!(json["id"], "https://blog.example/actors/alice/outbox?page=2");
        assert_eq!(json["partOf"], "https://blog.example/actors/alice/outbox");
        assert_eq!(json["next"], "https://blog.example/actors/alice/outbox?page=3");
        assert_eq!(json["prev"], "https://blog.example/actors/alice/outbox?page=1");
        assert_eq!(json["orderedItems"][0]["type"], "Create");
        assert_eq!(json["orderedItems"][0]["object"]["type"], "Note");
    }
}

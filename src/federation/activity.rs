//! ActivityStreams documents / ActivityStreams 文档

use serde::{Deserialize, Serialize};

use crate::models::{Post, User};

pub const ACTIVITY_STREAMS: &str = "https://www.w3.org/ns/activitystreams";
pub const PUBLIC_AUDIENCE: &str = "https://www.w3.org/ns/activitystreams#Public";
pub const ACTIVITY_JSON: &str = "application/activity+json";
pub const JRD_JSON: &str = "application/jrd+json";

/// Absolute URLs of federation resources under one public base / 联邦资源URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Urls {
    base: String,
}

impl Urls {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn actor(&self, username: &str) -> String {
        format!("{}/actors/{}", self.base, username)
    }

    pub fn inbox(&self, username: &str) -> String {
        format!("{}/inbox", self.actor(username))
    }

    pub fn outbox(&self, username: &str) -> String {
        format!("{}/outbox", self.actor(username))
    }

    pub fn outbox_page(&self, username: &str, page: i64) -> String {
        format!("{}?page={}", self.outbox(username), page)
    }

    pub fn followers(&self, username: &str) -> String {
        format!("{}/followers", self.actor(username))
    }

    pub fn activity(&self, username: &str, post_id: i64) -> String {
        format!("{}/posts/{}/activity", self.actor(username), post_id)
    }

    /// Human-readable blog page / 博客页面
    pub fn blog(&self, blog_id: i64) -> String {
        format!("{}/blog/{}", self.base, blog_id)
    }

    pub fn blog_feed(&self, blog_id: i64) -> String {
        format!("{}/rss.xml", self.blog(blog_id))
    }

    /// Human-readable post page / 文章页面
    pub fn post(&self, post_id: i64) -> String {
        format!("{}/post/{}", self.base, post_id)
    }

    pub fn webfinger(&self, resource: &str) -> String {
        format!("{}/.well-known/webfinger?resource={}", self.base, resource)
    }
}

/// Federation view of a post; never persisted / 文章的联邦投影
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityObject {
    pub post_id: i64,
    pub published: String,
    pub actor: String,
    pub content: String,
    pub url: String,
}

impl ActivityObject {
    pub fn from_post(post: &Post, username: &str, urls: &Urls) -> Self {
        Self {
            post_id: post.id,
            published: post.created_at.clone(),
            actor: urls.actor(username),
            content: post.content.clone(),
            url: urls.post(post.id),
        }
    }

    /// Wrap as a `Create` activity with a `Note` object / 生成Create活动
    pub fn to_create(&self, username: &str, urls: &Urls) -> CreateActivity {
        CreateActivity {
            context: ACTIVITY_STREAMS.to_string(),
            id: urls.activity(username, self.post_id),
            kind: "Create".to_string(),
            actor: self.actor.clone(),
            published: self.published.clone(),
            to: vec![PUBLIC_AUDIENCE.to_string()],
            object: Note {
                id: self.url.clone(),
                kind: "Note".to_string(),
                attributed_to: self.actor.clone(),
                content: self.content.clone(),
                published: self.published.clone(),
                url: self.url.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub attributed_to: String,
    pub content: String,
    pub published: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateActivity {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub actor: String,
    pub published: String,
    pub to: Vec<String>,
    pub object: Note,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKey {
    pub id: String,
    pub owner: String,
    pub public_key_pem: String,
}

/// Actor document / 角色文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub preferred_username: String,
    pub name: String,
    pub inbox: String,
    pub outbox: String,
    pub followers: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<PublicKey>,
}

impl Person {
    pub fn for_user(user: &User, urls: &Urls) -> Self {
        let id = urls.actor(&user.username);
        let public_key = user
            .public_key_pem
            .as_ref()
            .filter(|pem| !pem.trim().is_empty())
            .map(|pem| PublicKey {
                id: format!("{}#main-key", id),
                owner: id.clone(),
                public_key_pem: pem.clone(),
            });

        Self {
            context: ACTIVITY_STREAMS.to_string(),
            kind: "Person".to_string(),
            preferred_username: user.username.clone(),
            name: user
                .display_name
                .clone()
                .unwrap_or_else(|| user.username.clone()),
            inbox: urls.inbox(&user.username),
            outbox: urls.outbox(&user.username),
            followers: urls.followers(&user.username),
            public_key,
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(pem: Option<&str>) -> User {
        User {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            display_name: None,
            public_key_pem: pem.map(str::to_string),
            active: true,
            created_at: String::new(),
        }
    }

    #[test]
    fn test_urls() {
        let urls = Urls::new("https://blog.example/");
        assert_eq!(urls.actor("alice"), "https://blog.example/actors/alice");
        assert_eq!(urls.outbox_page("alice", 2), "https://blog.example/actors/alice/outbox?page=2");
        assert_eq!(urls.activity("alice", 7), "https://blog.example/actors/alice/posts/7/activity");
        assert_eq!(urls.post(7), "https://blog.example/post/7");
    }

    #[test]
    fn test_create_activity_shape() {
        let urls = Urls::new("https://blog.example");
        let post = Post {
            id: 7,
            blog_id: 1,
            user_id: 1,
            title: "t".to_string(),
            content: "<p>hi</p>".to_string(),
            published: true,
            publish_in_newsletter: false,
            created_at: "2024-01-01T00:00:00.000000Z".to_string(),
            updated_at: String::new(),
        };

        let activity = ActivityObject::from_post(&post, "alice", &urls).to_create("alice", &urls);
        let value = serde_json::to_value(&activity).unwrap();
        assert_eq!(
            value,
            json!({
                "@context": ACTIVITY_STREAMS,
                "id": "https://blog.example/actors/alice/posts/7/activity",
                "type": "Create",
                "actor": "https://blog.example/actors/alice",
                "published": "2024-01-01T00:00:00.000000Z",
                "to": [PUBLIC_AUDIENCE],
                "object": {
                    "id": "https://blog.example/post/7",
                    "type": "Note",
                    "attributedTo": "https://blog.example/actors/alice",
                    "content": "<p>hi</p>",
                    "published": "2024-01-01T00:00:00.000000Z",
                    "url": "https://blog.example/post/7"
                }
            })
        );
    }

    #[test]
    fn test_person_public_key_only_with_pem() {
        let urls = Urls::new("https://blog.example");

        let without = serde_json::to_value(Person::for_user(&user(None), &urls)).unwrap();
        assert!(without.get("publicKey").is_none());
        assert_eq!(without["preferredUsername"], "alice");
        assert_eq!(without["name"], "alice");
        assert_eq!(without["outbox"], "https://blog.example/actors/alice/outbox");

        let with = serde_json::to_value(Person::for_user(&user(Some("PEM")), &urls)).unwrap();
        assert_eq!(with["publicKey"]["owner"], "https://blog.example/actors/alice");
        assert_eq!(with["publicKey"]["publicKeyPem"], "PEM");
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    #[serde(skip_serializing)]
    pub public_key_pem: Option<String>,
    pub active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Blog {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub slug: String,
    pub newsletter: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub blog_id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub published: bool,
    pub publish_in_newsletter: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Page {
    pub id: i64,
    pub blog_id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub published: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: String,
}

/// Short status update / 短动态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Chirp {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Webmention {
    pub id: i64,
    pub blog_id: i64,
    pub user_id: Option<i64>,
    pub source: String,
    pub target: String,
    pub content: Option<String>,
    pub verified: bool,
    pub created_at: String,
}

/// Persisted entity kinds / 实体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Blog,
    Post,
    Page,
    Comment,
    Chirp,
    Webmention,
}

/// Any persisted row tracked by a unit of work / 工作单元跟踪的实体
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    User(User),
    Blog(Blog),
    Post(Post),
    Page(Page),
    Comment(Comment),
    Chirp(Chirp),
    Webmention(Webmention),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::User(_) => EntityKind::User,
            Entity::Blog(_) => EntityKind::Blog,
            Entity::Post(_) => EntityKind::Post,
            Entity::Page(_) => EntityKind::Page,
            Entity::Comment(_) => EntityKind::Comment,
            Entity::Chirp(_) => EntityKind::Chirp,
            Entity::Webmention(_) => EntityKind::Webmention,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Entity::User(e) => e.id,
            Entity::Blog(e) => e.id,
            Entity::Post(e) => e.id,
            Entity::Page(e) => e.id,
            Entity::Comment(e) => e.id,
            Entity::Chirp(e) => e.id,
            Entity::Webmention(e) => e.id,
        }
    }

    /// Identity within one unit of work / 工作单元内的唯一键
    pub fn key(&self) -> (EntityKind, i64) {
        (self.kind(), self.id())
    }
}

macro_rules! entity_from {
    ($($ty:ident),* $(,)?) => {
        $(
            impl From<$ty> for Entity {
                fn from(value: $ty) -> Self {
                    Entity::$ty(value)
                }
            }
        )*
    };
}

entity_from!(User, Blog, Post, Page, Comment, Chirp, Webmention);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub public_key_pem: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBlogRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Derived from the title when absent / 为空时由标题生成
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub newsletter: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBlogRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub newsletter: Option<bool>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    #[serde(default = "default_true")]
    pub published: bool,
    #[serde(default)]
    pub publish_in_newsletter: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub published: Option<bool>,
    pub publish_in_newsletter: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePageRequest {
    pub title: String,
    pub content: String,
    #[serde(default = "default_true")]
    pub published: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePageRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub published: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChirpRequest {
    pub content: String,
}

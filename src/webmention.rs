//! Webmention verification / Webmention 验证
//!
//! A mention moves `received -> fetching -> verified | rejected`. Cheap checks
//! (URL shape, target blog) run before the fetch; only a verified mention is
//! written to the database.

use reqwest::Client;
use serde::Serialize;
use sqlx::SqlitePool;
use std::time::Duration;
use url::Url;

use crate::config::WebmentionConfig;
use crate::error::AppResult;
use crate::models::Webmention;
use crate::store::{blogs, webmentions};
use crate::uow::UnitOfWork;
use crate::utils::truncate_chars;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionState {
    Received,
    Fetching,
    Verified,
    Rejected,
}

/// Why a mention was rejected / 拒绝原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Source or target is not an http(s) URL
    InvalidUrl,
    SameUrl,
    /// Target host carries no blog subdomain
    UnresolvedTarget,
    UnknownBlog(String),
    FetchFailed(String),
    Status(u16),
    /// Source body exceeds the byte limit
    TooLarge,
    TargetMissing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MentionOutcome {
    Verified(Webmention),
    Rejected(RejectReason),
}

impl MentionOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, MentionOutcome::Verified(_))
    }

    pub fn state(&self) -> MentionState {
        match self {
            MentionOutcome::Verified(_) => MentionState::Verified,
            MentionOutcome::Rejected(_) => MentionState::Rejected,
        }
    }
}

fn parse_http_url(raw: &str) -> Option<Url> {
    Url::parse(raw.trim())
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
}

/// Blog slug from the target's subdomain / 从子域名解析博客slug
///
/// `a.b.example.com` yields `a.b`; hosts with two labels or fewer resolve to nothing.
pub fn resolve_slug(target: &Url) -> Option<String> {
    let host = target.host_str()?;
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return None;
    }
    Some(labels[..labels.len() - 2].join("."))
}

/// Largest source body read during verification / 来源页面最大读取字节数
pub const MAX_SOURCE_BYTES: usize = 1024 * 1024;

pub struct WebmentionVerifier {
    client: Client,
    max_content_chars: usize,
    max_source_bytes: usize,
}

impl WebmentionVerifier {
    pub fn new(timeout: Duration, max_content_chars: usize) -> AppResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            max_content_chars,
            max_source_bytes: MAX_SOURCE_BYTES,
        })
    }

    pub fn with_max_source_bytes(mut self, max_source_bytes: usize) -> Self {
        self.max_source_bytes = max_source_bytes;
        self
    }

    pub fn from_config(config: &WebmentionConfig) -> AppResult<Self> {
        Self::new(
            Duration::from_secs(config.timeout_secs),
            config.max_content_chars,
        )
    }

    /// Fetch the source and check it links to the target / 抓取并校验来源
    async fn fetch(&self, source: &Url, target: &str) -> Result<String, RejectReason> {
        let mut response = self
            .client
            .get(source.clone())
            .send()
            .await
            .map_err(|e| RejectReason::FetchFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RejectReason::Status(status.as_u16()));
        }

        if response
            .content_length()
            .is_some_and(|len| len > self.max_source_bytes as u64)
        {
            return Err(RejectReason::TooLarge);
        }

        // Content-Length may be absent; the stream is capped too
        let mut buf = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| RejectReason::FetchFailed(e.to_string()))?
        {
            if buf.len() + chunk.len() > self.max_source_bytes {
                return Err(RejectReason::TooLarge);
            }
            buf.extend_from_slice(&chunk);
        }
        let body = String::from_utf8_lossy(&buf).into_owned();

        if !body.contains(target) {
            return Err(RejectReason::TargetMissing);
        }
        Ok(body)
    }

    /// Verify a mention and persist it on success / 处理一条Webmention
    ///
    /// Rejections are an outcome, not an error; `Err` means storage failed.
    pub async fn process(&self, pool: &SqlitePool, source: &str, target: &str) -> AppResult<MentionOutcome> {
        let (source, target) = (source.trim(), target.trim());
        tracing::debug!("Webmention {:?}: {} -> {}", MentionState::Received, source, target);

        let (source_url, target_url) = match (parse_http_url(source), parse_http_url(target)) {
            (Some(s), Some(t)) => (s, t),
            _ => return Ok(self.reject(source, target, RejectReason::InvalidUrl)),
        };
        if source_url == target_url {
            return Ok(self.reject(source, target, RejectReason::SameUrl));
        }

        let Some(slug) = resolve_slug(&target_url) else {
            return Ok(self.reject(source, target, RejectReason::UnresolvedTarget));
        };
        let Some(blog) = blogs::find_by_slug(pool, &slug).await? else {
            return Ok(self.reject(source, target, RejectReason::UnknownBlog(slug)));
        };

        tracing::debug!("Webmention {:?}: {}", MentionState::Fetching, source);
        let body = match self.fetch(&source_url, target).await {
            Ok(body) => body,
            Err(reason) => return Ok(self.reject(source, target, reason)),
        };
        let content = truncate_chars(&body, self.max_content_chars);

        let mut uow = UnitOfWork::begin(pool).await?;
        let mention = match webmentions::find_verified(uow.conn(), source, target).await? {
            Some(existing) => webmentions::backfill_content(&mut uow, existing, content).await?,
            None => webmentions::insert_verified(&mut uow, &blog, source, target, Some(content)).await?,
        };
        uow.commit().await?;

        tracing::info!("Webmention verified: {} -> {}", source, target);
        Ok(MentionOutcome::Verified(mention))
    }

    fn reject(&self, source: &str, target: &str, reason: RejectReason) -> MentionOutcome {
        tracing::info!("Webmention rejected: {} -> {} ({:?})", source, target, reason);
        MentionOutcome::Rejected(reason)
    }
}

//! Elasticsearch-compatible REST backend / Elasticsearch 兼容后端

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use crate::config::SearchConfig;
use crate::error::{AppError, AppResult};

use super::client::{Document, IndexClient, RankedIds};

/// Elasticsearch's default `index.max_result_window` / 默认最大结果窗口
pub const MAX_RESULT_WINDOW: i64 = 10_000;

pub struct ElasticIndex {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ElasticIndex {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> AppResult<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("invalid search url {}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::Config(format!(
                "search url must be http(s): {}",
                base_url
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    pub fn from_config(config: &SearchConfig) -> AppResult<Self> {
        Self::new(
            &config.url,
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn doc_url(&self, collection: &str, id: i64) -> String {
        format!("{}/{}/_doc/{}", self.base_url, collection, id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("ApiKey {}", key)),
            None => request,
        }
    }
}

/// Read ranked ids and the total out of a `_search` response / 解析搜索响应
pub fn parse_search_response(body: &Value) -> AppResult<RankedIds> {
    let hits = body
        .get("hits")
        .ok_or_else(|| AppError::Index("search response has no hits".to_string()))?;

    // ES 7+ wraps the total as {"value": n}, older versions return a bare number
    let total = match hits.get("total") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(obj) => obj.get("value").and_then(Value::as_u64).unwrap_or(0),
        None => 0,
    };

    let ids = hits
        .get("hits")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|hit| match hit.get("_id") {
                    Some(Value::String(s)) => s.parse::<i64>().ok(),
                    Some(Value::Number(n)) => n.as_i64(),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(RankedIds { ids, total })
}

#[async_trait]
impl IndexClient for ElasticIndex {
    fn name(&self) -> &'static str {
        "elasticsearch"
    }

    async fn upsert(&self, collection: &str, id: i64, document: &Document) -> AppResult<()> {
        let response = self
            .authorize(self.client.put(self.doc_url(collection, id)))
            .json(document)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Index(format!(
                "upsert {}/{} failed with status {}",
                collection, id, status
            )));
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: i64) -> AppResult<()> {
        let response = self
            .authorize(self.client.delete(self.doc_url(collection, id)))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(AppError::Index(format!(
            "delete {}/{} failed with status {}",
            collection, id, status
        )))
    }

    async fn query(
        &self,
        collection: &str,
        expression: &str,
        page: i64,
        per_page: i64,
    ) -> AppResult<RankedIds> {
        let page = page.max(1);
        let size = per_page.max(0);
        let from = (page - 1).saturating_mul(size);
        if from.saturating_add(size) > MAX_RESULT_WINDOW {
            tracing::debug!("Search page {} of {} is past the result window", page, collection);
            return Ok(RankedIds::empty());
        }
        let body = json!({
            "query": {
                "multi_match": {
                    "query": expression,
                    "fields": ["*"]
                }
            },
            "from": from,
            "size": size
        });

        let url = format!("{}/{}/_search", self.base_url, collection);
        let response = self.authorize(self.client.post(url)).json(&body).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            // Collection not created yet
            return Ok(RankedIds::empty());
        }
        if !status.is_success() {
            return Err(AppError::Index(format!(
                "search {} failed with status {}",
                collection, status
            )));
        }

        let body: Value = response.json().await?;
        parse_search_response(&body)
    }
}

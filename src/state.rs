use axum::http::{header, HeaderMap};
use sqlx::SqlitePool;

use blogcms_backend::config::AppConfig;
use blogcms_backend::error::AppResult;
use blogcms_backend::federation::Urls;
use blogcms_backend::search::IndexSync;
use blogcms_backend::uow::UnitOfWork;
use blogcms_backend::webmention::WebmentionVerifier;

/// Shared application state / 共享应用状态
pub struct AppState {
    pub db: SqlitePool,
    pub index: IndexSync,
    pub verifier: WebmentionVerifier,
    /// Snapshot taken at startup / 启动时的配置快照
    pub config: AppConfig,
}

impl AppState {
    /// Start a write transaction wired to the index sync / 开启写事务
    pub async fn begin(&self) -> AppResult<UnitOfWork> {
        let mut uow = UnitOfWork::begin(&self.db).await?;
        self.index.attach(&mut uow);
        Ok(uow)
    }

    /// Public URLs, from config or else from the request's Host header / 公网URL
    pub fn urls(&self, headers: &HeaderMap) -> Urls {
        if !self.config.federation.base_url.is_empty() {
            return Urls::new(&self.config.federation.base_url);
        }

        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("localhost");
        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("http");
        Urls::new(&format!("{}://{}", scheme, host))
    }
}

//! Application configuration module / 应用配置模块
//!
//! Manages application configuration loaded from config.json
//! Creates default config file on first run / 首次运行时创建默认配置文件
//! Environment variables override file values after loading / 环境变量覆盖文件配置
//! The loaded value is handed to the application state once at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration / 服务器配置
    pub server: ServerConfig,
    /// Database configuration / 数据库配置
    pub database: DatabaseConfig,
    /// Search index configuration / 搜索索引配置
    pub search: SearchConfig,
    /// Federation (ActivityPub) configuration / 联邦配置
    pub federation: FederationConfig,
    /// Webmention verification configuration / Webmention配置
    pub webmention: WebmentionConfig,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address / 服务器监听地址
    pub host: String,
    /// Server port / 服务器端口
    pub port: u16,
}

/// Database configuration / 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Data directory path / 数据目录路径
    pub data_dir: String,
    /// Main database file path (relative to data_dir) / 主数据库文件路径
    pub db_file: String,
    /// Explicit database URL, wins over data_dir/db_file / 显式数据库URL
    pub url: Option<String>,
}

/// Which index backend serves full-text search / 搜索后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    Disabled,
    Elasticsearch,
    Memory,
}

/// How committed changes reach the index / 索引同步方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Background worker behind a bounded queue / 后台队列
    Queued,
    /// Applied inside the post-commit hook / 提交后立即同步
    Inline,
}

/// Search configuration / 搜索配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub backend: SearchBackend,
    /// Search service base URL / 搜索服务地址
    pub url: String,
    /// API key sent as `Authorization: ApiKey ...` / API密钥
    pub api_key: Option<String>,
    /// Request timeout in seconds / 请求超时（秒）
    pub timeout_secs: u64,
    pub sync_mode: SyncMode,
    /// Bounded queue capacity for queued sync / 队列容量
    pub queue_capacity: usize,
    /// Results per search page / 每页搜索结果数
    pub per_page: usize,
}

/// Federation configuration / 联邦配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FederationConfig {
    /// Outbox page size / 发件箱分页大小
    pub posts_per_page: i64,
    /// Public base URL; empty means derive from the Host header / 公网地址
    pub base_url: String,
}

/// Webmention configuration / Webmention配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebmentionConfig {
    /// Source fetch timeout in seconds / 抓取超时（秒）
    pub timeout_secs: u64,
    /// Max characters of the source body kept as content / 保存内容的最大字符数
    pub max_content_chars: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8180,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            db_file: "blogcms.db".to_string(),
            url: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: SearchBackend::Disabled,
            url: "http://localhost:9200".to_string(),
            api_key: None,
            timeout_secs: 10,
            sync_mode: SyncMode::Queued,
            queue_capacity: 1024,
            per_page: 10,
        }
    }
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            posts_per_page: 10,
            base_url: String::new(),
        }
    }
}

impl Default for WebmentionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            max_content_chars: 2000,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl AppConfig {
    /// Get the full database URL / 获取完整的数据库URL
    pub fn get_database_url(&self) -> String {
        if let Some(url) = &self.database.url {
            return url.clone();
        }
        let db_path = Path::new(&self.database.data_dir).join(&self.database.db_file);
        format!("sqlite:{}?mode=rwc", db_path.to_string_lossy())
    }

    /// Get the full data directory path / 获取完整的数据目录路径
    pub fn get_data_dir(&self) -> PathBuf {
        PathBuf::from(&self.database.data_dir)
    }

    /// Get the server bind address / 获取服务器绑定地址
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Apply process environment overrides / 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source / 从变量源应用覆盖
    pub fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(enabled) = var("ELASTICSEARCH_ENABLED") {
            if parse_bool(&enabled) {
                self.search.backend = SearchBackend::Elasticsearch;
            } else if self.search.backend != SearchBackend::Memory {
                self.search.backend = SearchBackend::Disabled;
            }
        }
        if let Some(backend) = var("SEARCH_BACKEND") {
            match backend.trim().to_lowercase().as_str() {
                "disabled" => self.search.backend = SearchBackend::Disabled,
                "elasticsearch" => self.search.backend = SearchBackend::Elasticsearch,
                "memory" => self.search.backend = SearchBackend::Memory,
                other => tracing::warn!("Ignoring unknown SEARCH_BACKEND: {}", other),
            }
        }
        if let Some(url) = var("ELASTICSEARCH_URL") {
            self.search.url = url;
        }
        if let Some(key) = var("ELASTICSEARCH_API_KEY") {
            self.search.api_key = if key.is_empty() { None } else { Some(key) };
        }
        if let Some(per_page) = var("POSTS_PER_PAGE") {
            match per_page.trim().parse::<i64>() {
                Ok(n) if n > 0 => {
                    self.federation.posts_per_page = n;
                    self.search.per_page = n as usize;
                }
                _ => tracing::warn!("Ignoring invalid POSTS_PER_PAGE: {}", per_page),
            }
        }
        if let Some(base) = var("PUBLIC_BASE_URL") {
            self.federation.base_url = base;
        }
    }
}

/// Get the config file path / 获取配置文件路径
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from a specific file, creating defaults if missing / 从指定文件加载配置
pub fn load_config_from(config_path: &Path) -> AppResult<AppConfig> {
    if config_path.exists() {
        let content = std::fs::read_to_string(config_path)
            .map_err(|e| AppError::Config(format!("Failed to read config file: {}", e)))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config file: {}", e)))?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    } else {
        let config = AppConfig::default();
        save_config_to(&config, config_path)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        Ok(config)
    }
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config() -> AppResult<AppConfig> {
    let mut config = load_config_from(&get_config_path())?;
    config.apply_env_overrides();
    Ok(config)
}

/// Save configuration to a specific file / 保存配置到指定文件
pub fn save_config_to(config: &AppConfig, config_path: &Path) -> AppResult<()> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))?;

    std::fs::write(config_path, content)
        .map_err(|e| AppError::Config(format!("Failed to write config file: {}", e)))?;

    Ok(())
}

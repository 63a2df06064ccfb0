//! WebFinger discovery / WebFinger 发现

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

use super::activity::{Urls, ACTIVITY_JSON};

/// Split `acct:user@domain` into (user, domain) / 解析acct资源
pub fn parse_acct(resource: &str) -> AppResult<(String, String)> {
    let rest = resource
        .strip_prefix("acct:")
        .ok_or_else(|| AppError::bad_request("Invalid resource format"))?;

    match rest.split_once('@') {
        Some((user, domain)) if !user.is_empty() && !domain.is_empty() => {
            Ok((user.to_string(), domain.to_string()))
        }
        _ => Err(AppError::bad_request("Invalid resource format")),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JrdLink {
    pub rel: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub href: String,
}

/// JSON Resource Descriptor / JRD文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jrd {
    pub subject: String,
    pub aliases: Vec<String>,
    pub links: Vec<JrdLink>,
}

impl Jrd {
    pub fn for_account(resource: &str, username: &str, domain: &str, urls: &Urls) -> Self {
        Self {
            subject: resource.to_string(),
            aliases: vec![urls.webfinger(&format!("acct:{}@{}", username, domain))],
            links: vec![JrdLink {
                rel: "self".to_string(),
                kind: ACTIVITY_JSON.to_string(),
                href: urls.actor(username),
            }],
        }
    }
}

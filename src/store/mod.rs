//! Primary storage access / 数据存储
//!
//! Writes take a [`UnitOfWork`](crate::uow::UnitOfWork) and register every row
//! they touch so the commit hooks see it. Reads take any sqlite executor: a
//! pool outside a unit of work, `uow.conn()` inside one.

pub mod blogs;
pub mod chirps;
pub mod comments;
pub mod pages;
pub mod posts;
pub mod users;
pub mod webmentions;

use serde::Serialize;

/// One page of rows plus the unpaged total / 分页列表
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Reject blank required text / 校验必填文本
pub(crate) fn require_text(field: &str, value: &str) -> crate::error::AppResult<()> {
    if value.trim().is_empty() {
        return Err(crate::error::AppError::bad_request(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}

pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod federation;
pub mod import;
pub mod models;
pub mod sanitize;
pub mod search;
pub mod store;
pub mod uow;
pub mod utils;
pub mod webmention;

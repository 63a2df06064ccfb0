//! Federation documents: actor, outbox and WebFinger / 联邦文档

pub mod activity;
pub mod outbox;
pub mod webfinger;

pub use activity::{ActivityObject, CreateActivity, Person, Urls, ACTIVITY_JSON, JRD_JSON};
pub use outbox::{build_outbox, OrderedCollectionPage, OutboxPage};
pub use webfinger::{parse_acct, Jrd};

//! # Log Processors
//!
//! The two reactions to a poll: republishing the log when it changed, and
//! texting subscribers about new or edited penalties for their cars.

/// Publishes changed logs to the cache.
pub mod cache_processor;
/// Texts subscribers about new and edited entries.
pub mod notification_processor;

pub use cache_processor::{CacheProcessor, LogCache};
pub use notification_processor::{format_message, NoticeKind, NotificationProcessor};

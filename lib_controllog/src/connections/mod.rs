//! # Connections Module
//!
//! Persistent connections to the cache and the configuration database.

/// Redis cache sink for published control logs.
pub mod cache_redis;
/// PostgreSQL event configuration loader.
pub mod db_postgres;

pub use cache_redis::RedisLogCache;
pub use db_postgres::PostgresEventLoader;

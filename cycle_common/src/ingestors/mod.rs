//! Upstream ingestors feeding the pipeline.

pub mod redis_sub;

pub use redis_sub::{RedisSubConfig, RedisSubIngestor};

//! # Cycle Common
//!
//! Core library for the production-cycle dashboard gateway. It contains the
//! ingest→persist→aggregate→broadcast pipeline and the pieces it is built
//! from:
//!
//! - **`decoder`** — turns raw subscribe-channel payloads into validated
//!   cycle events, including the normalization shim for legacy controller
//!   firmware that emits bare-key pseudo-JSON.
//! - **`store`** — the persistence gateway: a `CycleStore` trait with a
//!   PostgreSQL implementation for production and an in-memory one for
//!   tests and local development.
//! - **`core`** — shared dashboard state, the statistics aggregator, the
//!   NG trend builder, the bounded recent-record cache, the broadcast
//!   dispatcher and the ingestion pipeline that wires them together.
//! - **`ingestors`** — the Redis Pub/Sub ingestor that feeds the pipeline,
//!   with an explicit reconnect state machine and exponential backoff.

// Declare the modules to re-export
pub mod core;
pub mod decoder;
pub mod ingestors;
pub mod model;
pub mod store;

// Re-export the types most callers need
pub use crate::core::cache::RecentCache;
pub use crate::core::dispatcher::Dispatcher;
pub use crate::core::pipeline::IngestPipeline;
pub use crate::core::state::DashboardState;
pub use crate::model::*;
pub use crate::store::{CycleStore, StoreError};

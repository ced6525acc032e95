//! Core pipeline components: shared dashboard state, derived-value
//! recomputation, the recent-record cache, the broadcast dispatcher and the
//! ingestion pipeline.

pub mod cache;
pub mod dispatcher;
pub mod pipeline;
pub mod state;
pub mod stats;
pub mod trend;

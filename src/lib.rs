// src/lib.rs
// Public library surface for the service binary, the demo CLI and integration tests.

pub mod api;
pub mod config;
pub mod metrics;
pub mod research;
pub mod source_priority;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::ResearchConfig;
pub use crate::research::{
    get_summary, Aggregator, ResearchError, ResearchRequest, ResearchResult,
};
pub use crate::source_priority::SourcePriorityTable;

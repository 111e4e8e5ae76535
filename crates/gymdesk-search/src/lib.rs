//! GymDesk Incremental Search
//!
//! Debounced client search with per-result statistics:
//! - Results cache keyed by client id
//! - Search backend abstraction and its gateway implementation
//! - Search engine with commit-ordered staleness and liveness guards

pub mod backend;
pub mod cache;
pub mod engine;

pub use backend::SearchBackend;
pub use cache::{ResultsCache, SearchEntry};
pub use engine::{SearchConfig, SearchEngine, SearchSnapshot};

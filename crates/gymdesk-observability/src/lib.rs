//! GymDesk Observability
//!
//! This crate provides observability features:
//! - Structured logging setup (tracing-subscriber)
//! - Metrics collection (Prometheus) for session, gateway and search activity

pub mod logging;
pub mod metrics;

pub use logging::{LoggingConfig, init_logging};
pub use metrics::Metrics;

//! GymDesk Gateway
//!
//! HTTP access to the gym backend:
//! - Shared HTTP client configuration
//! - Gateway client with bearer and 401 interception
//! - Token issuance for the session manager
//! - Client, payment, attendance and report endpoints

pub mod attendance;
pub mod client;
pub mod clients;
pub mod gateway;
pub mod notify;
pub mod payments;
pub mod reports;
pub mod total_count;

pub use client::{HttpClientConfig, create_client};
pub use gateway::{Gateway, GatewayConfig, Query, TOKEN_PATH};
pub use notify::{Notice, NoticeLevel, Notifier, RecordingNotifier, TracingNotifier};
pub use total_count::{parse_total_count, total_from_headers};

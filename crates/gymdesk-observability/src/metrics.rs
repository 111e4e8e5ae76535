//! Metrics collection with Prometheus
//!
//! This module provides Prometheus metrics for GymDesk:
//! - Login attempts by outcome
//! - Session teardowns by reason
//! - Gateway requests by method and status
//! - Search dispatches and discarded stale results

use prometheus::{CounterVec, Encoder, IntCounter, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector for GymDesk
#[derive(Clone)]
pub struct Metrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    // Session metrics
    /// Login attempts (outcome=success|invalid_credentials|malformed_token|expired|superseded|error)
    pub logins_total: CounterVec,
    /// Session teardowns (reason=manual|expired|unauthorized|invalid_credential)
    pub logouts_total: CounterVec,

    // Gateway metrics
    /// Requests sent through the gateway (status="network" on transport failure)
    pub requests_total: CounterVec,

    // Search metrics
    /// Search queries committed to the backend
    pub search_dispatches_total: IntCounter,
    /// Search or stats results dropped because a newer query superseded them
    pub search_stale_discarded_total: IntCounter,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let logins_total = CounterVec::new(
            Opts::new("gymdesk_logins_total", "Total number of login attempts"),
            &["outcome"],
        )?;

        let logouts_total = CounterVec::new(
            Opts::new("gymdesk_logouts_total", "Total number of session teardowns"),
            &["reason"],
        )?;

        let requests_total = CounterVec::new(
            Opts::new(
                "gymdesk_requests_total",
                "Total number of requests sent through the gateway",
            ),
            &["method", "status"],
        )?;

        let search_dispatches_total = IntCounter::new(
            "gymdesk_search_dispatches_total",
            "Total number of search queries dispatched",
        )?;

        let search_stale_discarded_total = IntCounter::new(
            "gymdesk_search_stale_discarded_total",
            "Total number of superseded search results discarded",
        )?;

        registry.register(Box::new(logins_total.clone()))?;
        registry.register(Box::new(logouts_total.clone()))?;
        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(search_dispatches_total.clone()))?;
        registry.register(Box::new(search_stale_discarded_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            logins_total,
            logouts_total,
            requests_total,
            search_dispatches_total,
            search_stale_discarded_total,
        })
    }

    /// Get the Prometheus registry for exporting metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Record a login attempt
    pub fn record_login(&self, outcome: &str) {
        self.logins_total.with_label_values(&[outcome]).inc();
    }

    /// Record a session teardown
    pub fn record_logout(&self, reason: &str) {
        self.logouts_total.with_label_values(&[reason]).inc();
    }

    /// Record a gateway request with its HTTP status
    pub fn record_request(&self, method: &str, status: u16) {
        let status = status.to_string();
        self.requests_total
            .with_label_values(&[method, status.as_str()])
            .inc();
    }

    /// Record a gateway request that failed before a response arrived
    pub fn record_network_failure(&self, method: &str) {
        self.requests_total
            .with_label_values(&[method, "network"])
            .inc();
    }

    /// Record a committed search query
    pub fn record_search_dispatch(&self) {
        self.search_dispatches_total.inc();
    }

    /// Record a discarded stale search result
    pub fn record_search_stale(&self) {
        self.search_stale_discarded_total.inc();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_search_dispatch();
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_render_text_format() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("GET", 200);
        let text = metrics.render().unwrap();
        assert!(text.contains("gymdesk_requests_total{method=\"GET\",status=\"200\"} 1"));
    }

    #[test]
    fn test_record_login_and_logout() {
        let metrics = Metrics::new().unwrap();
        metrics.record_login("success");
        metrics.record_login("success");
        metrics.record_login("invalid_credentials");
        metrics.record_logout("unauthorized");

        assert_eq!(metrics.logins_total.with_label_values(&["success"]).get(), 2.0);
        assert_eq!(
            metrics
                .logins_total
                .with_label_values(&["invalid_credentials"])
                .get(),
            1.0
        );
        assert_eq!(
            metrics.logouts_total.with_label_values(&["unauthorized"]).get(),
            1.0
        );
    }

    #[test]
    fn test_record_requests() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("GET", 200);
        metrics.record_request("GET", 401);
        metrics.record_network_failure("POST");

        assert_eq!(
            metrics.requests_total.with_label_values(&["GET", "401"]).get(),
            1.0
        );
        assert_eq!(
            metrics
                .requests_total
                .with_label_values(&["POST", "network"])
                .get(),
            1.0
        );
    }

    #[test]
    fn test_record_search() {
        let metrics = Metrics::new().unwrap();
        metrics.record_search_dispatch();
        metrics.record_search_stale();
        metrics.record_search_stale();

        assert_eq!(metrics.search_dispatches_total.get(), 1);
        assert_eq!(metrics.search_stale_discarded_total.get(), 2);
    }

    #[test]
    fn test_metrics_default() {
        let metrics = Metrics::default();
        assert_eq!(metrics.search_dispatches_total.get(), 0);
    }
}

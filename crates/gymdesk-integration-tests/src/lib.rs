//! End-to-end fixtures for GymDesk
//!
//! Wires a file-backed session, the gateway and the view router against a
//! mocked gym backend, the same way the CLI does at startup.

use chrono::{DateTime, Duration, Utc};
use gymdesk_gateway::{Gateway, GatewayConfig, RecordingNotifier};
use gymdesk_observability::Metrics;
use gymdesk_session::codec::{mint_unsigned, numeric_date_of};
use gymdesk_session::{
    FileCredentialStore, NavigationGuard, SessionManager, SystemClock, View, ViewRouter,
};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::MockServer;

/// Unsigned token for `subject` expiring at `expires_at`
pub fn token_expiring_at(subject: &str, expires_at: DateTime<Utc>) -> String {
    mint_unsigned(&json!({
        "sub": subject,
        "name": "Front Desk",
        "email": "desk@gym.test",
        "role": "staff",
        "exp": numeric_date_of(expires_at)
    }))
}

/// Unsigned token valid for the next eight hours
pub fn valid_token(subject: &str) -> String {
    token_expiring_at(subject, Utc::now() + Duration::hours(8))
}

pub fn client_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "full_name": name,
        "email": null,
        "phone": "555-0100",
        "is_active": true,
        "join_date": "2024-03-01T10:00:00"
    })
}

pub fn payment_json(id: &str, client_id: &str, month: u8) -> Value {
    json!({
        "id": id,
        "client_id": client_id,
        "amount": 45.0,
        "method": "cash",
        "period_month": month,
        "period_year": 2025,
        "created_at": "2025-03-02T09:15:00"
    })
}

/// A fully wired client with its credential file in a temporary directory
pub struct Desk {
    pub server: MockServer,
    pub session: Arc<SessionManager>,
    pub router: Arc<ViewRouter>,
    pub guard: NavigationGuard,
    pub gateway: Arc<Gateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub metrics: Arc<Metrics>,
    credentials: PathBuf,
    _dir: TempDir,
}

impl Desk {
    /// Start a mock backend and a client with an empty credential file
    pub async fn start() -> Self {
        Self::start_with(None).await
    }

    /// Start with `token` already persisted, as after a previous run
    pub async fn start_with(token: Option<&str>) -> Self {
        Self::seeded(|| token.map(str::to_string)).await
    }

    /// Start with a persisted token that expires `ttl` after startup
    pub async fn start_expiring_in(subject: &str, ttl: Duration) -> Self {
        Self::seeded(|| Some(token_expiring_at(subject, Utc::now() + ttl))).await
    }

    async fn seeded(seed: impl FnOnce() -> Option<String>) -> Self {
        let server = MockServer::start().await;
        let dir = TempDir::new().expect("temp dir");
        let credentials = dir.path().join("credentials.json");
        if let Some(token) = seed() {
            std::fs::write(
                &credentials,
                json!({ "access_token": token }).to_string(),
            )
            .expect("seed credential file");
        }

        let metrics = Arc::new(Metrics::new().expect("metrics registry"));
        let store = FileCredentialStore::new(&credentials).expect("credential store");
        let session = SessionManager::new(
            Arc::new(store),
            Arc::new(SystemClock),
            Some(metrics.clone()),
        );
        let router = Arc::new(ViewRouter::new(View::Home));
        let guard = NavigationGuard::new(session.clone());
        let notifier = Arc::new(RecordingNotifier::new());
        let gateway = Gateway::new(
            GatewayConfig::new(server.uri()),
            session.clone(),
            router.clone(),
        )
        .expect("gateway")
        .with_notifier(notifier.clone())
        .with_metrics(metrics.clone());

        Self {
            server,
            session,
            router,
            guard,
            gateway: Arc::new(gateway),
            notifier,
            metrics,
            credentials,
            _dir: dir,
        }
    }

    /// Token currently persisted in the credential file, if any
    pub fn stored_token(&self) -> Option<String> {
        let contents = std::fs::read_to_string(&self.credentials).ok()?;
        let json: Value = serde_json::from_str(&contents).ok()?;
        json.get("access_token")?.as_str().map(str::to_string)
    }
}

//! Wiring of the session, gateway and search layers for one CLI run

use crate::config::AppConfig;
use anyhow::{Context, bail};
use gymdesk_gateway::{Gateway, Notice, Notifier};
use gymdesk_observability::Metrics;
use gymdesk_search::{SearchEngine, SearchSnapshot};
use gymdesk_session::{
    Claims, FileCredentialStore, GuardDecision, NavigationGuard, Navigator, SessionManager,
    SystemClock, View, ViewRouter,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Prints notices to stderr
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        eprintln!("{}: {}", notice.title, notice.text);
    }
}

pub struct App {
    pub config: AppConfig,
    pub metrics: Arc<Metrics>,
    pub session: Arc<SessionManager>,
    pub router: Arc<ViewRouter>,
    pub guard: NavigationGuard,
    pub gateway: Arc<Gateway>,
}

impl App {
    /// Build all layers; the session is rehydrated from the credential file
    pub fn bootstrap(config: AppConfig) -> anyhow::Result<Self> {
        let metrics = Arc::new(Metrics::new().context("Failed to create metrics registry")?);

        let store = FileCredentialStore::new(config.credentials_path())?;
        debug!("Using credential file {}", store.path().display());

        let session = SessionManager::new(
            Arc::new(store),
            Arc::new(SystemClock),
            Some(metrics.clone()),
        );
        let router = Arc::new(ViewRouter::new(View::Home));
        let guard = NavigationGuard::new(session.clone());

        let gateway = Gateway::new(config.gateway_config(), session.clone(), router.clone())?
            .with_notifier(Arc::new(ConsoleNotifier))
            .with_metrics(metrics.clone());

        Ok(Self {
            config,
            metrics,
            session,
            router,
            guard,
            gateway: Arc::new(gateway),
        })
    }

    /// Enter a guarded view, failing when no valid session exists
    pub fn enter(&self, view: View) -> anyhow::Result<Claims> {
        match self.guard.check() {
            GuardDecision::Allow(claims) => {
                self.router.redirect(view);
                Ok(claims)
            }
            GuardDecision::RedirectToLogin => {
                self.router.redirect(View::Login);
                bail!("Not signed in. Run `gymdesk login` first.")
            }
        }
    }

    /// Navigate to the view at `path`, returning the view actually entered
    pub fn open(&self, path: &str) -> anyhow::Result<View> {
        let Some(view) = View::from_path(path) else {
            bail!("Unknown view '{}'", path);
        };
        Ok(self.guard.enter(view, self.router.as_ref()))
    }

    pub fn search_engine(&self) -> SearchEngine {
        SearchEngine::spawn_with_metrics(
            self.gateway.clone(),
            self.config.search_config(),
            Some(self.metrics.clone()),
        )
    }

    /// Wait until the last committed query has results and its stats settle
    pub async fn settle(&self, engine: &SearchEngine) -> anyhow::Result<SearchSnapshot> {
        let search = self.config.search_config();
        let request_timeout = Duration::from_secs(self.config.api.timeout_secs);
        let mut rx = engine.subscribe();

        // Let a pending debounce commit
        tokio::time::sleep(search.debounce + Duration::from_millis(20)).await;

        match tokio::time::timeout(request_timeout, rx.wait_for(|s| !s.loading)).await {
            Ok(Ok(_)) => {}
            Ok(Err(_)) => bail!("Search engine stopped"),
            Err(_) => bail!("Search timed out"),
        }

        let top_k = search.top_k;
        let enriched = tokio::time::timeout(
            request_timeout,
            rx.wait_for(|s| {
                s.entries
                    .entries()
                    .iter()
                    .take(top_k)
                    .all(|entry| entry.stats.is_some())
            }),
        )
        .await;
        match enriched {
            Ok(Ok(_)) => {}
            Ok(Err(_)) => bail!("Search engine stopped"),
            Err(_) => warn!(
                timeout_secs = request_timeout.as_secs(),
                "Client stats did not arrive in time, showing partial results"
            ),
        }

        Ok(engine.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.credentials.path = dir
            .path()
            .join("credentials.json")
            .to_string_lossy()
            .to_string();
        config
    }

    #[tokio::test]
    async fn test_bootstrap_without_credentials_is_anonymous() {
        let temp_dir = TempDir::new().unwrap();
        let app = App::bootstrap(config_in(&temp_dir)).unwrap();

        assert!(!app.session.is_authenticated());
        assert!(app.enter(View::Clients).is_err());
        assert_eq!(app.router.current(), View::Login);
    }

    #[tokio::test]
    async fn test_open_resolves_paths_through_the_guard() {
        let temp_dir = TempDir::new().unwrap();
        let app = App::bootstrap(config_in(&temp_dir)).unwrap();

        assert_eq!(app.open("/login").unwrap(), View::Login);
        assert_eq!(app.open("/payments/").unwrap(), View::Login);
        assert_eq!(app.router.current(), View::Login);
        assert!(app.open("/nowhere").is_err());
    }

    #[tokio::test]
    async fn test_bootstrap_clears_corrupt_credential() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);
        std::fs::write(
            config.credentials_path(),
            br#"{"access_token": "not-a-token"}"#,
        )
        .unwrap();

        let app = App::bootstrap(config).unwrap();
        assert!(!app.session.is_authenticated());
        assert!(!app.config.credentials_path().exists());
    }

    #[tokio::test]
    async fn test_settle_returns_partial_results_when_stats_are_slow() {
        use chrono::{Duration as ChronoDuration, Utc};
        use gymdesk_session::codec::{mint_unsigned, numeric_date_of};
        use serde_json::json;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clients/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "c1",
                "full_name": "Ana Lopez",
                "is_active": true,
                "join_date": "2024-03-01T10:00:00"
            }])))
            .mount(&mock_server)
            .await;
        for stats_path in ["/payments/", "/attendance/"] {
            Mock::given(method("GET"))
                .and(path(stats_path))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!([]))
                        .set_delay(Duration::from_secs(5)),
                )
                .mount(&mock_server)
                .await;
        }

        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(&temp_dir);
        config.api.base_url = mock_server.uri();
        config.api.timeout_secs = 1;
        config.search.debounce_ms = 10;
        let token = mint_unsigned(&json!({
            "sub": "staff-1",
            "exp": numeric_date_of(Utc::now() + ChronoDuration::hours(1))
        }));
        std::fs::write(
            config.credentials_path(),
            json!({ "access_token": token }).to_string(),
        )
        .unwrap();

        let app = App::bootstrap(config).unwrap();
        let engine = app.search_engine();
        engine.input("ana").unwrap();

        let snapshot = app.settle(&engine).await.unwrap();
        assert_eq!(snapshot.query, "ana");
        assert_eq!(snapshot.entries.len(), 1);
        assert!(snapshot.entries.get("c1").unwrap().stats.is_none());
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_bad_base_url() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(&temp_dir);
        config.api.base_url = "::nope::".to_string();

        assert!(App::bootstrap(config).is_err());
    }
}

//! Gateway client
//!
//! Every backend call except token issuance goes through [`Gateway::request`],
//! which attaches the current bearer credential and reacts to a 401 by
//! notifying the user, ending the session and redirecting to the login view.
//! A 401 for a credential that has since been replaced is only returned to
//! the caller.

use crate::client::{HttpClientConfig, create_client, transport_error};
use crate::notify::{Notice, Notifier, TracingNotifier};
use crate::total_count::total_from_headers;
use async_trait::async_trait;
use gymdesk_core::types::{Page, Pagination};
use gymdesk_core::{Error, Result};
use gymdesk_observability::Metrics;
use gymdesk_session::{
    Claims, LogoutReason, Navigator, SessionManager, TokenGrant, TokenIssuer, View,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Path of the token issuance endpoint
pub const TOKEN_PATH: &str = "auth/token";

/// Query string parameters
pub type Query = [(&'static str, String)];

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Backend base URL (default: http://127.0.0.1:8000)
    pub base_url: String,

    pub client: HttpClientConfig,

    /// Notice shown when the backend rejects the session
    pub session_expired_title: String,
    pub session_expired_text: String,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_client(mut self, client: HttpClientConfig) -> Self {
        self.client = client;
        self
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            client: HttpClientConfig::default(),
            session_expired_title: "Session expired".to_string(),
            session_expired_text: "Please sign in again.".to_string(),
        }
    }
}

pub struct Gateway {
    config: GatewayConfig,
    base_url: Url,
    client: Client,
    session: Arc<SessionManager>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    metrics: Option<Arc<Metrics>>,
}

impl Gateway {
    pub fn new(
        config: GatewayConfig,
        session: Arc<SessionManager>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let base_url = parse_base_url(&config.base_url)?;
        let client = create_client(&config.client)?;
        Ok(Self {
            config,
            base_url,
            client,
            session,
            navigator,
            notifier: Arc::new(TracingNotifier),
            metrics: None,
        })
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Log in through the session manager and move to the home view
    pub async fn login(&self, username: &str, password: &str) -> Result<Claims> {
        let claims = self.session.login(self, username, password).await?;
        self.navigator.redirect(View::Home);
        Ok(claims)
    }

    /// Log out and move to the login view
    pub fn logout(&self) {
        self.session.logout();
        self.navigator.redirect(View::Login);
    }

    /// Resolve an endpoint path relative to the base URL
    pub fn endpoint(&self, path: &str, query: &Query) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid endpoint path '{}': {}", path, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Send an authenticated request and return the successful response
    #[instrument(skip(self, query, body))]
    pub async fn request<B>(
        &self,
        method: Method,
        path: &str,
        query: &Query,
        body: Option<&B>,
    ) -> Result<Response>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.endpoint(path, query)?;
        debug!(url = %url, "Sending request");

        let mut builder = self.client.request(method.clone(), url);
        let credential = self.session.credential();
        if let Some(token) = &credential {
            debug!(token_len = token.len(), "Attaching bearer credential");
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_network_failure(method.as_str());
                }
                warn!("Request to {} failed: {}", path, e);
                return Err(transport_error(e));
            }
        };

        let status = response.status();
        self.record_request(&method, status);
        debug!(status = status.as_u16(), "Received response");

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized(credential.as_deref());
            return Err(Error::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::Backend {
            status: status.as_u16(),
            message: error_message(status, &body),
        })
    }

    pub async fn get_json<T>(&self, path: &str, query: &Query) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.request::<()>(Method::GET, path, query, None).await?;
        decode_json(response).await
    }

    /// GET a list endpoint, pairing the items with `X-Total-Count`
    pub async fn get_page<T>(&self, path: &str, query: &Query) -> Result<Page<T>>
    where
        T: DeserializeOwned,
    {
        let response = self.request::<()>(Method::GET, path, query, None).await?;
        let headers = response.headers().clone();
        let items: Vec<T> = decode_json(response).await?;
        let total = total_from_headers(&headers, items.len());
        Ok(Page { items, total })
    }

    pub async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        query: &Query,
        body: Option<&B>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self.request(method, path, query, body).await?;
        decode_json(response).await
    }

    /// DELETE a resource, ignoring any response body
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.request::<()>(Method::DELETE, path, &[], None).await?;
        Ok(())
    }

    /// React to a 401 for a request sent with `credential`
    ///
    /// Nothing happens if the session has moved on to another credential
    /// since the request left.
    fn handle_unauthorized(&self, credential: Option<&str>) {
        let ended = self
            .session
            .force_logout_if(credential, LogoutReason::Unauthorized, || {
                warn!("Backend rejected the credential, ending session");
                self.notifier.notify(Notice::warning(
                    self.config.session_expired_title.clone(),
                    self.config.session_expired_text.clone(),
                ));
            });
        if ended {
            self.navigator.redirect(View::Login);
        } else {
            debug!("Ignoring 401 for a credential that is no longer current");
        }
    }

    fn record_request(&self, method: &Method, status: StatusCode) {
        if let Some(metrics) = &self.metrics {
            metrics.record_request(method.as_str(), status.as_u16());
        }
    }
}

#[async_trait]
impl TokenIssuer for Gateway {
    /// Exchange credentials at `POST /auth/token`
    ///
    /// Sent without a bearer credential, and a 401 here does not end any
    /// existing session.
    async fn issue_token(&self, username: &str, password: &str) -> Result<TokenGrant> {
        let url = self.endpoint(TOKEN_PATH, &[])?;
        let form = serde_urlencoded::to_string(&[("username", username), ("password", password)])
            .map_err(|e| Error::ValidationFailure(format!("Failed to encode credentials: {}", e)))?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await
            .map_err(|e| {
                if let Some(metrics) = &self.metrics {
                    metrics.record_network_failure("POST");
                }
                transport_error(e)
            })?;

        let status = response.status();
        self.record_request(&Method::POST, status);
        if !status.is_success() {
            debug!(status = status.as_u16(), "Token issuance rejected");
            return Err(Error::InvalidCredentials);
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::MalformedToken(format!("Unexpected token response: {}", e)))
    }
}

/// `limit`/`offset` query parameters
pub(crate) fn page_query(page: Pagination) -> Vec<(&'static str, String)> {
    vec![
        ("limit", page.limit.to_string()),
        ("offset", page.offset.to_string()),
    ]
}

/// Reject identifiers that would escape their path segment
pub(crate) fn path_segment(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(Error::ValidationFailure(format!("Invalid identifier '{}'", id)));
    }
    Ok(id)
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await.map_err(transport_error)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", raw, e)))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Human-readable message from an error response body
///
/// Understands `{"detail": "..."}` and validation error lists
/// (`{"detail": [{"msg": "..."}]}`), otherwise returns the raw body.
fn error_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        match json.get("detail") {
            Some(Value::String(detail)) => return detail.clone(),
            Some(Value::Array(items)) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .collect();
                if !messages.is_empty() {
                    return messages.join("; ");
                }
            }
            _ => {}
        }
    }

    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

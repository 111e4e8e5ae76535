//! Session state machine
//!
//! The [`SessionManager`] is the only writer of the credential store and of
//! the session state. Consumers observe it through a `watch` channel (current
//! state) and a `broadcast` channel (transition events).
//!
//! Every transition bumps an epoch counter. Work that spans a suspension
//! point (a login round-trip, an armed expiry timer) remembers the epoch it
//! started under and is discarded if the epoch moved on in the meantime, so
//! a logout always wins over a login response that arrives after it.

use crate::clock::{Clock, SystemClock};
use crate::codec::{self, Claims};
use crate::scheduler::ExpiryScheduler;
use crate::store::CredentialStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gymdesk_core::{Error, Result};
use gymdesk_observability::Metrics;
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 64;

/// The client's current belief about authentication
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Anonymous,
    Authenticated { credential: String, claims: Claims },
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }

    pub fn credential(&self) -> Option<&str> {
        match self {
            SessionState::Authenticated { credential, .. } => Some(credential),
            SessionState::Anonymous => None,
        }
    }

    pub fn claims(&self) -> Option<&Claims> {
        match self {
            SessionState::Authenticated { claims, .. } => Some(claims),
            SessionState::Anonymous => None,
        }
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The user asked to log out
    Manual,
    /// The token's expiry instant passed
    Expired,
    /// The backend answered 401
    Unauthorized,
    /// The stored credential could not be decoded
    InvalidCredential,
}

impl LogoutReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Expired => "expired",
            Self::Unauthorized => "unauthorized",
            Self::InvalidCredential => "invalid_credential",
        }
    }
}

/// Session transitions, in the order they happened
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A stored credential was accepted at startup
    Restored { subject: String },
    LoggedIn { subject: String },
    LoggedOut { reason: LogoutReason },
}

/// Response of the token issuance endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Exchanges user credentials for a bearer token
///
/// Implementations map any non-2xx response to [`Error::InvalidCredentials`].
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue_token(&self, username: &str, password: &str) -> Result<TokenGrant>;
}

pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    scheduler: ExpiryScheduler,
    state: watch::Sender<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    /// Transition lock and epoch counter
    epoch: Mutex<u64>,
    metrics: Option<Arc<Metrics>>,
    this: Weak<SessionManager>,
}

impl SessionManager {
    /// Create a manager and rehydrate the session from `store`
    ///
    /// An undecodable or already expired credential is cleared and the
    /// session starts anonymous. Must be called from within a Tokio runtime
    /// when the stored token carries an expiry.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        metrics: Option<Arc<Metrics>>,
    ) -> Arc<Self> {
        let manager = Arc::new_cyclic(|this| {
            let (state, _) = watch::channel(SessionState::Anonymous);
            let (events, _) = broadcast::channel(EVENT_CAPACITY);
            Self {
                store,
                scheduler: ExpiryScheduler::new(clock.clone()),
                clock,
                state,
                events,
                epoch: Mutex::new(0),
                metrics,
                this: this.clone(),
            }
        });
        manager.rehydrate();
        manager
    }

    /// Manager on the system clock without metrics
    pub fn with_store(store: Arc<dyn CredentialStore>) -> Arc<Self> {
        Self::new(store, Arc::new(SystemClock), None)
    }

    fn rehydrate(&self) {
        let token = match self.store.load() {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No stored credential, starting anonymous");
                return;
            }
            Err(e) => {
                warn!("Failed to read stored credential, starting anonymous: {}", e);
                return;
            }
        };

        let mut epoch = self.lock_epoch();
        let claims = match codec::decode(&token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!("Discarding undecodable stored credential: {}", e);
                self.clear_store();
                return;
            }
        };

        if claims.is_expired_at(self.clock.now()) {
            info!(subject = %claims.subject, "Stored credential already expired, starting anonymous");
            self.clear_store();
            return;
        }

        let subject = claims.subject.clone();
        self.enter_authenticated(&mut epoch, token, claims);
        info!(subject = %subject, "Session restored from stored credential");
        let _ = self.events.send(SessionEvent::Restored { subject });
    }

    /// Exchange credentials for a token and authenticate
    ///
    /// On any failure the session is left untouched, except that a token
    /// which is already expired on arrival ends the current session as an
    /// expiry would. Returns [`Error::Superseded`] if another transition
    /// (such as a logout) happened while the token request was in flight.
    pub async fn login<I>(&self, issuer: &I, username: &str, password: &str) -> Result<Claims>
    where
        I: TokenIssuer + ?Sized,
    {
        if username.trim().is_empty() || password.is_empty() {
            return Err(Error::ValidationFailure(
                "username and password are required".to_string(),
            ));
        }

        let ticket = self.epoch();
        debug!(username = %username.trim(), "Requesting token");

        let grant = match issuer.issue_token(username.trim(), password).await {
            Ok(grant) => grant,
            Err(e) => {
                let outcome = match e {
                    Error::InvalidCredentials => "invalid_credentials",
                    _ => "error",
                };
                self.record_login(outcome);
                warn!("Login failed: {}", e);
                return Err(e);
            }
        };

        let claims = match codec::decode(&grant.access_token) {
            Ok(claims) => claims,
            Err(e) => {
                self.record_login("malformed_token");
                warn!("Issued token could not be decoded: {}", e);
                return Err(e);
            }
        };

        let mut epoch = self.lock_epoch();
        if *epoch != ticket {
            self.record_login("superseded");
            info!("Discarding login response superseded by a newer session transition");
            return Err(Error::Superseded);
        }

        if claims.is_expired_at(self.clock.now()) {
            self.record_login("expired");
            warn!(subject = %claims.subject, "Issued token is already expired");
            self.end_session(&mut epoch, LogoutReason::Expired);
            return Err(Error::SessionExpired);
        }

        if let Err(e) = self.store.save(&grant.access_token) {
            self.record_login("error");
            warn!("Failed to persist credential, login aborted: {}", e);
            return Err(e);
        }

        let subject = claims.subject.clone();
        self.enter_authenticated(&mut epoch, grant.access_token, claims.clone());
        drop(epoch);

        self.record_login("success");
        info!(subject = %subject, role = ?claims.role, "Logged in");
        let _ = self.events.send(SessionEvent::LoggedIn { subject });
        Ok(claims)
    }

    /// End the session at the user's request (idempotent)
    pub fn logout(&self) {
        self.force_logout(LogoutReason::Manual);
    }

    /// End the session for `reason` (idempotent)
    ///
    /// Always bumps the epoch, so a pending login is invalidated even when
    /// the session is already anonymous.
    pub fn force_logout(&self, reason: LogoutReason) {
        let mut epoch = self.lock_epoch();
        self.end_session(&mut epoch, reason);
    }

    /// End the session for `reason` only while it still holds `credential`
    ///
    /// `None` matches an anonymous session. `on_teardown` runs under the
    /// transition lock just before the session ends. Returns whether the
    /// session was ended; a rejection of a credential that has since been
    /// replaced leaves the newer session untouched.
    pub fn force_logout_if<F>(
        &self,
        credential: Option<&str>,
        reason: LogoutReason,
        on_teardown: F,
    ) -> bool
    where
        F: FnOnce(),
    {
        let mut epoch = self.lock_epoch();
        if self.state.borrow().credential() != credential {
            debug!(
                reason = reason.as_str(),
                "Ignoring rejection of a credential that is no longer current"
            );
            return false;
        }
        on_teardown();
        self.end_session(&mut epoch, reason);
        true
    }

    /// Current session snapshot
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Current bearer credential, if authenticated
    pub fn credential(&self) -> Option<String> {
        self.state.borrow().credential().map(str::to_string)
    }

    pub fn claims(&self) -> Option<Claims> {
        self.state.borrow().claims().cloned()
    }

    /// Watch the session state
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Receive transition events from now on
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Deadline of the armed expiry timer, if any
    pub fn expiry_deadline(&self) -> Option<DateTime<Utc>> {
        self.scheduler.deadline()
    }

    pub fn scheduler(&self) -> &ExpiryScheduler {
        &self.scheduler
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn epoch(&self) -> u64 {
        *self.lock_epoch()
    }

    fn lock_epoch(&self) -> MutexGuard<'_, u64> {
        self.epoch.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn enter_authenticated(&self, epoch: &mut MutexGuard<'_, u64>, credential: String, claims: Claims) {
        **epoch += 1;
        let armed_epoch = **epoch;

        self.scheduler.disarm();
        let expires_at = claims.expires_at;
        self.state
            .send_replace(SessionState::Authenticated { credential, claims });

        if let Some(deadline) = expires_at {
            let this = self.this.clone();
            let armed = self.scheduler.arm(deadline, move || {
                if let Some(manager) = this.upgrade() {
                    manager.expire(armed_epoch);
                }
            });
            if let Err(e) = armed {
                warn!("Session expiry timer not armed: {}", e);
            }
        }
    }

    /// Expiry timer callback; ignored if the session changed since arming
    fn expire(&self, armed_epoch: u64) {
        let mut epoch = self.lock_epoch();
        if *epoch != armed_epoch {
            debug!(
                armed_epoch,
                current_epoch = *epoch,
                "Ignoring expiry timer from a previous session"
            );
            return;
        }
        info!("Session token expired");
        self.end_session(&mut epoch, LogoutReason::Expired);
    }

    fn end_session(&self, epoch: &mut MutexGuard<'_, u64>, reason: LogoutReason) {
        **epoch += 1;
        self.scheduler.disarm();
        self.clear_store();

        let previous = self.state.send_replace(SessionState::Anonymous);
        if previous.is_authenticated() {
            info!(reason = reason.as_str(), "Logged out");
            if let Some(metrics) = &self.metrics {
                metrics.record_logout(reason.as_str());
            }
            let _ = self.events.send(SessionEvent::LoggedOut { reason });
        } else {
            debug!(reason = reason.as_str(), "Logout while already anonymous");
        }
    }

    fn clear_store(&self) {
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear stored credential: {}", e);
        }
    }

    fn record_login(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_login(outcome);
        }
    }
}

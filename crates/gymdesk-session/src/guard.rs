//! Protected view guard
//!
//! A synchronous check run before entering a guarded view. It re-reads the
//! stored credential instead of trusting the in-memory state, so an expiry
//! is caught even when the scheduled timer has not fired yet (for example
//! right after the machine resumes from sleep).

use crate::codec::{self, Claims};
use crate::manager::{LogoutReason, SessionManager};
use crate::navigation::{Navigator, View};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum GuardDecision {
    Allow(Claims),
    RedirectToLogin,
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow(_))
    }
}

#[derive(Clone)]
pub struct NavigationGuard {
    session: Arc<SessionManager>,
}

impl NavigationGuard {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// Decide whether a guarded view may render
    ///
    /// An undecodable or expired credential ends the session through the
    /// session manager, which clears the store.
    pub fn check(&self) -> GuardDecision {
        let token = match self.session.store().load() {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No credential, redirecting to login");
                return GuardDecision::RedirectToLogin;
            }
            Err(e) => {
                warn!("Credential store unreadable, redirecting to login: {}", e);
                return GuardDecision::RedirectToLogin;
            }
        };

        let claims = match codec::decode(&token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!("Stored credential is invalid: {}", e);
                self.session.force_logout(LogoutReason::InvalidCredential);
                return GuardDecision::RedirectToLogin;
            }
        };

        if claims.is_expired_at(self.session.clock().now()) {
            info!(subject = %claims.subject, "Credential expired before timer fired");
            self.session.force_logout(LogoutReason::Expired);
            return GuardDecision::RedirectToLogin;
        }

        GuardDecision::Allow(claims)
    }

    /// Enter `view`, redirecting to login when the guard refuses
    ///
    /// Returns the view that was actually entered.
    pub fn enter(&self, view: View, navigator: &dyn Navigator) -> View {
        if !view.is_guarded() {
            navigator.redirect(view);
            return view;
        }

        match self.check() {
            GuardDecision::Allow(_) => {
                navigator.redirect(view);
                view
            }
            GuardDecision::RedirectToLogin => {
                navigator.redirect(View::Login);
                View::Login
            }
        }
    }
}

//! Views and view routing

use std::fmt;
use tokio::sync::watch;
use tracing::debug;

/// A navigable view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Login,
    Home,
    Dashboard,
    Clients,
    Payments,
    Attendance,
    Reports,
    Settings,
}

impl View {
    pub const ALL: [View; 8] = [
        View::Login,
        View::Home,
        View::Dashboard,
        View::Clients,
        View::Payments,
        View::Attendance,
        View::Reports,
        View::Settings,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            View::Login => "/login",
            View::Home => "/",
            View::Dashboard => "/dashboard",
            View::Clients => "/clients",
            View::Payments => "/payments",
            View::Attendance => "/attendance",
            View::Reports => "/reports",
            View::Settings => "/settings",
        }
    }

    /// Resolve a path, ignoring a trailing slash and any query string
    pub fn from_path(path: &str) -> Option<View> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        View::ALL.into_iter().find(|view| view.path() == path)
    }

    /// Whether the view requires an authenticated session
    pub fn is_guarded(&self) -> bool {
        !matches!(self, View::Login)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Something that can move the user to another view
pub trait Navigator: Send + Sync {
    fn redirect(&self, view: View);
}

/// Tracks the current view and lets consumers watch it
pub struct ViewRouter {
    current: watch::Sender<View>,
}

impl ViewRouter {
    pub fn new(initial: View) -> Self {
        let (current, _) = watch::channel(initial);
        Self { current }
    }

    pub fn current(&self) -> View {
        *self.current.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<View> {
        self.current.subscribe()
    }
}

impl Default for ViewRouter {
    fn default() -> Self {
        Self::new(View::Home)
    }
}

impl Navigator for ViewRouter {
    fn redirect(&self, view: View) {
        let previous = self.current.send_replace(view);
        if previous != view {
            debug!(from = %previous, to = %view, "Navigated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_resolve_back_to_views() {
        for view in View::ALL {
            assert_eq!(View::from_path(view.path()), Some(view));
        }
        assert_eq!(View::from_path("/clients/"), Some(View::Clients));
        assert_eq!(View::from_path("/reports?bucket=week"), Some(View::Reports));
        assert_eq!(View::from_path("/nowhere"), None);
    }

    #[test]
    fn test_only_login_is_anonymous() {
        let anonymous: Vec<View> = View::ALL.into_iter().filter(|v| !v.is_guarded()).collect();
        assert_eq!(anonymous, vec![View::Login]);
    }

    #[test]
    fn test_router_redirect_notifies_watchers() {
        let router = ViewRouter::default();
        let mut rx = router.subscribe();
        assert_eq!(router.current(), View::Home);

        router.redirect(View::Login);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), View::Login);
        assert_eq!(router.current(), View::Login);
    }
}

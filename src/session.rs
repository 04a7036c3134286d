//! Application-session context: who is logged in and where the client is.
//!
//! Every component that needs the local identity or makes an auth-gated call
//! receives a cloned [`AppSession`]. All mutations go through
//! [`AppSession::apply`].

use std::sync::Arc;

use log::{info, warn};
use tokio::sync::watch;

use crate::api::Backend;
use crate::error::ApiError;
use crate::models::User;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Feed,
    Chat(String),
    Profile(String),
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    LoggedIn(User),
    LoggedOut,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<User>,
    pub route: Route,
}

#[derive(Clone)]
pub struct AppSession {
    state: Arc<watch::Sender<SessionState>>,
}

impl Default for AppSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AppSession {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState {
            user: None,
            route: Route::Login,
        });
        AppSession {
            state: Arc::new(state),
        }
    }

    pub fn apply(&self, event: SessionEvent) {
        self.state.send_modify(|state| match event {
            SessionEvent::LoggedIn(user) => {
                info!("session started for {}", user.id);
                state.user = Some(user);
                state.route = Route::Feed;
            }
            SessionEvent::LoggedOut => {
                info!("session closed");
                state.user = None;
                state.route = Route::Login;
            }
            SessionEvent::Expired => {
                warn!("session expired, returning to login");
                state.user = None;
                state.route = Route::Login;
            }
        });
    }

    /// Shared handling for every auth-gated call: an unauthorized response
    /// ends the session. The result is passed through unchanged.
    pub fn guard<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(ApiError::Unauthorized) = &result {
            self.apply(SessionEvent::Expired);
        }
        result
    }

    pub fn navigate(&self, route: Route) {
        self.state.send_if_modified(|state| {
            if state.route == route {
                return false;
            }
            info!("navigating to {:?}", route);
            state.route = route;
            true
        });
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.state.borrow().user.as_ref().map(|u| u.id.clone())
    }

    pub fn route(&self) -> Route {
        self.state.borrow().route.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Resumes an existing server-side session.
    pub async fn restore<B: Backend + ?Sized>(&self, backend: &B) -> Result<User, ApiError> {
        let user = self.guard(backend.current_user().await)?;
        self.apply(SessionEvent::LoggedIn(user.clone()));
        Ok(user)
    }

    pub async fn logout<B: Backend + ?Sized>(&self, backend: &B) -> Result<(), ApiError> {
        self.guard(backend.logout().await)?;
        self.apply(SessionEvent::LoggedOut);
        Ok(())
    }
}

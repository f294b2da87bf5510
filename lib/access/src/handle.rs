//! Safe accessor for consumers that may run before the store mounts.
//!
//! The strict way to consume the session is to hold the
//! `Arc<SessionManager>` directly; that is only possible once the store has
//! been constructed and wired in. [`SessionHandle`] is the safe variant for
//! code that may run earlier (e.g., during server-side rendering before the
//! provider mounts): a detached handle answers reads with inert defaults
//! and raises [`AuthError::Unavailable`] for verbs instead of crashing.

use crate::error::AuthError;
use crate::manager::SessionManager;
use crate::session::Session;
use crate::user::User;
use atelier_core::Result;
use std::sync::Arc;

/// A session accessor that tolerates an unmounted store.
#[derive(Clone, Default)]
pub struct SessionHandle {
    manager: Option<Arc<SessionManager>>,
}

impl SessionHandle {
    /// Creates a handle bound to a mounted session store.
    #[must_use]
    pub fn attached(manager: Arc<SessionManager>) -> Self {
        Self {
            manager: Some(manager),
        }
    }

    /// Creates a handle with no store behind it.
    #[must_use]
    pub fn detached() -> Self {
        Self { manager: None }
    }

    /// Returns true if a store is mounted behind this handle.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.manager.is_some()
    }

    /// Returns the current session, or an inert anonymous one if detached.
    pub async fn snapshot(&self) -> Session {
        match &self.manager {
            Some(manager) => manager.snapshot().await,
            None => {
                let mut session = Session::new();
                session.resolve_anonymous();
                session.set_loading(false);
                session
            }
        }
    }

    /// Returns true if a user is signed in; false when detached.
    pub async fn is_authenticated(&self) -> bool {
        match &self.manager {
            Some(manager) => manager.is_authenticated().await,
            None => false,
        }
    }

    /// Returns the signed-in user, if any; `None` when detached.
    pub async fn user(&self) -> Option<User> {
        match &self.manager {
            Some(manager) => manager.user().await,
            None => None,
        }
    }

    /// Signs in; raises [`AuthError::Unavailable`] when detached.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        self.mounted()?.sign_in(email, password).await
    }

    /// Signs up; raises [`AuthError::Unavailable`] when detached.
    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<(), AuthError> {
        self.mounted()?.sign_up(email, password, name).await
    }

    /// Signs out; raises [`AuthError::Unavailable`] when detached.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.mounted()?.sign_out().await
    }

    fn mounted(&self) -> Result<&Arc<SessionManager>, AuthError> {
        self.manager
            .as_ref()
            .ok_or_else(|| AuthError::Unavailable.into())
    }
}

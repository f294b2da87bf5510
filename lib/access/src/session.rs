//! The in-memory authentication session.
//!
//! A session is transient: created when the application mounts, refreshed on
//! every successful auth operation, cleared on sign-out, and gone when the
//! process ends. It is owned exclusively by the
//! [`SessionManager`](crate::manager::SessionManager); consumers receive
//! clones and can only read them.

use crate::error::AuthError;
use crate::user::User;
use atelier_core::SessionId;
use chrono::{DateTime, Utc};

/// Authentication state of the running application.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Initial state: the current user has not been determined yet.
    #[default]
    Unknown,
    /// No user is signed in.
    Anonymous,
    /// A user is signed in.
    Authenticated(User),
}

impl SessionState {
    /// Returns true if a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Returns true if the state has not been determined yet.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Returns the signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Unknown | Self::Anonymous => None,
        }
    }
}

/// The current session record.
///
/// Invariant: `Authenticated` always carries a fully-parsed [`User`];
/// `Unknown` and `Anonymous` imply `is_authenticated() == false`.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Identifier for this in-memory session instance.
    id: SessionId,
    /// Current authentication state.
    state: SessionState,
    /// True while an auth operation is in flight. Consumers use this to
    /// disable duplicate submissions; it is a hint, not a lock.
    loading: bool,
    /// The most recent classified failure, if any.
    last_error: Option<AuthError>,
    /// When this session instance was created.
    started_at: DateTime<Utc>,
    /// When the state was last refreshed.
    refreshed_at: DateTime<Utc>,
}

impl Session {
    /// Creates the initial session: state unknown, loading.
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            state: SessionState::Unknown,
            loading: true,
            last_error: None,
            started_at: now,
            refreshed_at: now,
        }
    }

    /// Returns the session instance identifier.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the current authentication state.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Returns the signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.state.user()
    }

    /// Returns true if a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    /// Returns true while an auth operation is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Returns the most recent classified failure, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&AuthError> {
        self.last_error.as_ref()
    }

    /// Returns when this session instance was created.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns when the state was last refreshed.
    #[must_use]
    pub fn refreshed_at(&self) -> DateTime<Utc> {
        self.refreshed_at
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub(crate) fn record_error(&mut self, error: AuthError) {
        self.last_error = Some(error);
    }

    pub(crate) fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Replaces the state with an authenticated user.
    pub(crate) fn resolve_authenticated(&mut self, user: User) {
        self.state = SessionState::Authenticated(user);
        self.refreshed_at = Utc::now();
    }

    /// Replaces the state with anonymous.
    pub(crate) fn resolve_anonymous(&mut self) {
        self.state = SessionState::Anonymous;
        self.refreshed_at = Utc::now();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

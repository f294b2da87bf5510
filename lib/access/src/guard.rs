//! Route guarding over session state.
//!
//! A [`RouteGuard`] decides whether protected content may render for the
//! current session. It is purely derived: it holds the route's role
//! constraint and nothing else, and every decision comes from the session
//! snapshot it is handed.

use crate::role::Role;
use crate::session::Session;

/// What the UI should do with a protected route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// The session state is still unknown; show a loading view.
    Pending,
    /// Render the protected content.
    Allow,
    /// No user is signed in; redirect to sign-in.
    RedirectToSignIn,
    /// A user is signed in but their role is not allowed; render an
    /// access-denied view.
    Deny {
        /// The signed-in user's role.
        role: Role,
    },
}

/// Role constraint for a protected route.
#[derive(Debug, Clone, Default)]
pub struct RouteGuard {
    /// Roles allowed through, or `None` for any authenticated user.
    allowed_roles: Option<Vec<Role>>,
}

impl RouteGuard {
    /// A guard that admits any authenticated user.
    #[must_use]
    pub fn authenticated() -> Self {
        Self {
            allowed_roles: None,
        }
    }

    /// A guard that admits only the given roles.
    #[must_use]
    pub fn allowing(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed_roles: Some(roles.into_iter().collect()),
        }
    }

    /// A guard that admits only admins.
    #[must_use]
    pub fn admin_only() -> Self {
        Self::allowing([Role::Admin])
    }

    /// Decides what to do with the route for the given session.
    #[must_use]
    pub fn evaluate(&self, session: &Session) -> GuardDecision {
        if session.state().is_unknown() {
            return GuardDecision::Pending;
        }

        let Some(user) = session.user() else {
            return GuardDecision::RedirectToSignIn;
        };

        match &self.allowed_roles {
            None => GuardDecision::Allow,
            Some(allowed) if allowed.contains(&user.role()) => GuardDecision::Allow,
            Some(_) => GuardDecision::Deny { role: user.role() },
        }
    }
}

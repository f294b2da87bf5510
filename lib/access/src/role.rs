//! Role resolution for authenticated identities.
//!
//! The identity provider knows who a user is; it does not know what they
//! are to the platform. The [`RoleResolver`] maps an authenticated identity
//! to an application role and membership attributes. Its contract is total:
//! given a non-empty identifier it always returns a profile, defaulting
//! deterministically rather than failing, so the session manager can never
//! produce a user without a role.

use crate::config::RoleRules;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Application role governing which protected views a user may access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Learner taking courses.
    Student,
    /// Teaches courses and runs live classes.
    Mentor,
    /// Platform administrator.
    Admin,
}

impl Role {
    /// Returns true if this role has admin privileges.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Membership tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Membership {
    /// Free tier.
    Free,
    /// Individual paid tier.
    Pro,
    /// Organization tier.
    Team,
}

/// Subscription standing for paid memberships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subscription {
    /// No subscription.
    None,
    /// Paid and in good standing.
    Active,
    /// Payment failed; grace period.
    PastDue,
    /// Canceled by the user.
    Canceled,
}

/// The resolved role and membership attributes for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleProfile {
    /// The application role.
    pub role: Role,
    /// The membership tier.
    pub membership: Membership,
    /// The subscription standing.
    pub subscription: Subscription,
}

impl RoleProfile {
    /// The deterministic default profile: a free-tier student.
    #[must_use]
    pub fn default_profile() -> Self {
        Self {
            role: Role::Student,
            membership: Membership::Free,
            subscription: Subscription::None,
        }
    }
}

/// Trait for mapping an authenticated identity to its role profile.
///
/// Implementations must be total: they always return a profile and never
/// fail. Unknown identities get [`RoleProfile::default_profile`].
#[async_trait]
pub trait RoleResolver: Send + Sync {
    /// Resolves the role profile for an identifier/subject pair.
    async fn resolve(&self, identifier: &str, subject: &str) -> RoleProfile;
}

/// Lookup-table resolver driven by configured identifier lists.
///
/// Identifiers on the admin list resolve to `Admin`, identifiers on the
/// mentor list to `Mentor`, everyone else to the default student profile.
/// Matching is case-insensitive on the identifier.
#[derive(Debug, Clone, Default)]
pub struct StaticRoleResolver {
    admins: Vec<String>,
    mentors: Vec<String>,
}

impl StaticRoleResolver {
    /// Creates a resolver from explicit identifier lists.
    #[must_use]
    pub fn new(admins: Vec<String>, mentors: Vec<String>) -> Self {
        Self {
            admins: admins.into_iter().map(|s| s.to_lowercase()).collect(),
            mentors: mentors.into_iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    /// Creates a resolver from configured role rules.
    #[must_use]
    pub fn from_rules(rules: &RoleRules) -> Self {
        Self::new(rules.admins.clone(), rules.mentors.clone())
    }
}

#[async_trait]
impl RoleResolver for StaticRoleResolver {
    async fn resolve(&self, identifier: &str, _subject: &str) -> RoleProfile {
        let identifier = identifier.to_lowercase();

        if self.admins.iter().any(|a| *a == identifier) {
            return RoleProfile {
                role: Role::Admin,
                membership: Membership::Team,
                subscription: Subscription::Active,
            };
        }

        if self.mentors.iter().any(|m| *m == identifier) {
            return RoleProfile {
                role: Role::Mentor,
                membership: Membership::Pro,
                subscription: Subscription::Active,
            };
        }

        RoleProfile::default_profile()
    }
}

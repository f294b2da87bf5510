//! Configuration for the access layer.
//!
//! Covers the two locally-owned policies: password composition and the
//! role lookup lists for the static resolver. Everything else about
//! authentication lives behind the identity provider boundary.
//!
//! Fields with defaults can be omitted when loading from configuration.

use serde::{Deserialize, Serialize};

/// Password composition policy.
///
/// Enforced locally before a password is ever sent to the provider, and
/// used to synthesize provider-acceptable passwords for the passwordless
/// phone flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    /// Minimum password length.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    /// Require at least one uppercase letter.
    #[serde(default = "default_true")]
    pub require_uppercase: bool,
    /// Require at least one lowercase letter.
    #[serde(default = "default_true")]
    pub require_lowercase: bool,
    /// Require at least one digit.
    #[serde(default = "default_true")]
    pub require_digit: bool,
    /// Require at least one symbol.
    #[serde(default = "default_true")]
    pub require_symbol: bool,
}

fn default_min_length() -> usize {
    8
}

fn default_true() -> bool {
    true
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_symbol: true,
        }
    }
}

impl PasswordPolicy {
    /// Returns true if the password satisfies the policy.
    #[must_use]
    pub fn check(&self, password: &str) -> bool {
        if password.chars().count() < self.min_length {
            return false;
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            return false;
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            return false;
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            return false;
        }
        if self.require_symbol && !password.chars().any(|c| !c.is_ascii_alphanumeric()) {
            return false;
        }
        true
    }

    /// Renders the composition requirement as a user-facing sentence.
    #[must_use]
    pub fn requirement(&self) -> String {
        let mut parts = Vec::new();
        if self.require_uppercase {
            parts.push("an uppercase letter");
        }
        if self.require_lowercase {
            parts.push("a lowercase letter");
        }
        if self.require_digit {
            parts.push("a number");
        }
        if self.require_symbol {
            parts.push("a symbol");
        }

        if parts.is_empty() {
            format!("at least {} characters", self.min_length)
        } else {
            format!(
                "at least {} characters including {}",
                self.min_length,
                parts.join(", ")
            )
        }
    }
}

/// Identifier lists that drive the static role resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRules {
    /// Identifiers granted the admin role.
    #[serde(default)]
    pub admins: Vec<String>,
    /// Identifiers granted the mentor role.
    #[serde(default)]
    pub mentors: Vec<String>,
}

/// Top-level configuration for the access layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Password composition policy.
    #[serde(default)]
    pub password: PasswordPolicy,
    /// Role lookup rules.
    #[serde(default)]
    pub roles: RoleRules,
}

impl AccessConfig {
    /// Returns a builder for constructing the configuration in code.
    #[must_use]
    pub fn builder() -> AccessConfigBuilder {
        AccessConfigBuilder::default()
    }
}

/// Builder for [`AccessConfig`].
#[derive(Debug, Default)]
pub struct AccessConfigBuilder {
    password: Option<PasswordPolicy>,
    admins: Vec<String>,
    mentors: Vec<String>,
}

impl AccessConfigBuilder {
    /// Sets the password policy.
    #[must_use]
    pub fn password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.password = Some(policy);
        self
    }

    /// Adds an admin identifier.
    #[must_use]
    pub fn admin(mut self, identifier: impl Into<String>) -> Self {
        self.admins.push(identifier.into());
        self
    }

    /// Adds a mentor identifier.
    #[must_use]
    pub fn mentor(mut self, identifier: impl Into<String>) -> Self {
        self.mentors.push(identifier.into());
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> AccessConfig {
        AccessConfig {
            password: self.password.unwrap_or_default(),
            roles: RoleRules {
                admins: self.admins,
                mentors: self.mentors,
            },
        }
    }
}

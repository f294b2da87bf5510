//! User domain type and the provider-payload parse step.
//!
//! The provider's current-user payload is loosely typed: string attributes
//! behind optional keys. [`User::from_provider`] is the explicit
//! parse/validate step that turns that payload plus a resolved role profile
//! into a fully-typed [`User`], or fails closed — a payload that does not
//! parse yields no user, and the session is treated as anonymous.
//!
//! A `User` is never mutated in place; every session refresh replaces it
//! wholesale.

use crate::error::AuthError;
use crate::provider::ProviderUser;
use crate::role::{Membership, Role, RoleProfile, Subscription};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated account identifier: an email address or an E.164 phone number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Identifier {
    /// An email address.
    Email(String),
    /// An E.164 phone number (e.g., "+15551234567").
    Phone(String),
}

impl Identifier {
    /// Parses an email address, raising `InvalidFormat` when malformed.
    ///
    /// Validation is deliberately shallow (the provider is the authority);
    /// it catches the inputs a form would reject before a network call.
    pub fn parse_email(input: &str) -> Result<Self, AuthError> {
        let input = input.trim();
        let invalid = || AuthError::InvalidFormat {
            detail: "expected an email address like name@example.com".to_string(),
        };

        let (local, domain) = input.split_once('@').ok_or_else(invalid)?;
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(invalid());
        }
        let (host, tld) = domain.rsplit_once('.').ok_or_else(invalid)?;
        if host.is_empty() || tld.is_empty() {
            return Err(invalid());
        }

        Ok(Self::Email(input.to_string()))
    }

    /// Parses an E.164 phone number, raising `InvalidFormat` when malformed.
    pub fn parse_phone(input: &str) -> Result<Self, AuthError> {
        let input = input.trim();
        let invalid = || AuthError::InvalidFormat {
            detail: "expected an international phone number like +15551234567".to_string(),
        };

        let digits = input.strip_prefix('+').ok_or_else(invalid)?;
        if !(8..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        Ok(Self::Phone(input.to_string()))
    }

    /// Returns the identifier as the string submitted to the provider.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Email(s) | Self::Phone(s) => s,
        }
    }

    /// Returns true if this is an email identifier.
    #[must_use]
    pub fn is_email(&self) -> bool {
        matches!(self, Self::Email(_))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the user authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProviderKind {
    /// Email and password.
    Email,
    /// Federated Google sign-in.
    Google,
    /// SMS-code-driven phone sign-in.
    Phone,
}

/// Why a provider payload failed to parse into a [`User`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileParseError {
    /// The payload had no subject.
    MissingSubject,
    /// The payload had neither a usable email nor phone number.
    MissingIdentifier,
}

impl fmt::Display for ProfileParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSubject => write!(f, "provider payload has no subject"),
            Self::MissingIdentifier => {
                write!(f, "provider payload has no email or phone identifier")
            }
        }
    }
}

impl std::error::Error for ProfileParseError {}

/// A fully-typed authenticated user.
///
/// Reconstructed fresh from the provider's current-user payload plus the
/// role resolver on every session refresh. Invariant: a `User` always has a
/// non-empty subject and identifier and a role from the closed set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The provider's unique identifier for the user.
    subject: String,
    /// The validated account identifier.
    identifier: Identifier,
    /// Display name, if the provider reported one.
    display_name: Option<String>,
    /// Application role.
    role: Role,
    /// Membership tier.
    membership: Membership,
    /// Subscription standing.
    subscription: Subscription,
    /// Whether the provider has verified the email address.
    email_verified: bool,
    /// How the user authenticated.
    signed_in_with: AuthProviderKind,
    /// When this record was derived from the provider payload.
    derived_at: DateTime<Utc>,
}

impl User {
    /// Parses a provider payload and resolved role profile into a user.
    ///
    /// Fails closed: a payload missing its subject or any usable
    /// identifier produces an error, never a partial user.
    pub fn from_provider(
        payload: &ProviderUser,
        profile: RoleProfile,
    ) -> Result<Self, ProfileParseError> {
        if payload.subject.trim().is_empty() {
            return Err(ProfileParseError::MissingSubject);
        }

        let email = payload
            .attribute("email")
            .and_then(|e| Identifier::parse_email(e).ok());
        let phone = payload
            .attribute("phone_number")
            .and_then(|p| Identifier::parse_phone(p).ok());

        let identifier = email
            .clone()
            .or(phone)
            .ok_or(ProfileParseError::MissingIdentifier)?;

        let signed_in_with = if payload
            .attribute("identities")
            .is_some_and(|ids| ids.contains("Google"))
        {
            AuthProviderKind::Google
        } else if identifier.is_email() {
            AuthProviderKind::Email
        } else {
            AuthProviderKind::Phone
        };

        let email_verified = payload.attribute("email_verified") == Some("true");

        Ok(Self {
            subject: payload.subject.clone(),
            identifier,
            display_name: payload.attribute("name").map(str::to_string),
            role: profile.role,
            membership: profile.membership,
            subscription: profile.subscription,
            email_verified,
            signed_in_with,
            derived_at: Utc::now(),
        })
    }

    /// Returns the provider subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the validated account identifier.
    #[must_use]
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Returns the email address, if the user is email-identified.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        match &self.identifier {
            Identifier::Email(e) => Some(e),
            Identifier::Phone(_) => None,
        }
    }

    /// Returns the phone number, if the user is phone-identified.
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        match &self.identifier {
            Identifier::Phone(p) => Some(p),
            Identifier::Email(_) => None,
        }
    }

    /// Returns the display name, if the provider reported one.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Returns the application role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the membership tier.
    #[must_use]
    pub fn membership(&self) -> Membership {
        self.membership
    }

    /// Returns the subscription standing.
    #[must_use]
    pub fn subscription(&self) -> Subscription {
        self.subscription
    }

    /// Returns true if the provider has verified the email address.
    #[must_use]
    pub fn email_verified(&self) -> bool {
        self.email_verified
    }

    /// Returns how the user authenticated.
    #[must_use]
    pub fn signed_in_with(&self) -> AuthProviderKind {
        self.signed_in_with
    }

    /// Returns when this record was derived.
    #[must_use]
    pub fn derived_at(&self) -> DateTime<Utc> {
        self.derived_at
    }
}

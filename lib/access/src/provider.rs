//! Identity provider boundary.
//!
//! The platform delegates all credential verification, token issuance, and
//! persistence to an external identity service. This module defines the
//! trait that service is consumed through, along with the loosely-typed
//! payloads it produces. Provider-specific error names never escape this
//! seam: callers classify every [`ProviderError`] into an
//! [`AuthError`](crate::error::AuthError) exactly once at the boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Raw error surfaced by the identity provider.
///
/// Providers report failures as an error name plus a human-readable message
/// (e.g., `NotAuthorizedException: Incorrect username or password`). This
/// type carries both verbatim; it is classified at the boundary and never
/// shown to users directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    /// The provider's error name (e.g., "NotAuthorizedException").
    pub code: String,
    /// The provider's raw message.
    pub message: String,
}

impl ProviderError {
    /// Creates a provider error from a code and message.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ProviderError {}

/// The provider's view of the currently signed-in user.
///
/// This is a loosely-typed payload: everything beyond the subject and
/// username arrives as string attributes. It is validated into a fully-typed
/// [`User`](crate::user::User) by an explicit parse step; a payload that
/// fails that parse is treated as no user at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUser {
    /// The provider's unique identifier for the user (subject claim).
    pub subject: String,
    /// The provider-side username (email, phone, or a federated alias).
    pub username: String,
    /// Raw user attributes (email, phone_number, name, email_verified, ...).
    pub attributes: HashMap<String, String>,
}

impl ProviderUser {
    /// Creates a provider user with no attributes.
    #[must_use]
    pub fn new(subject: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            username: username.into(),
            attributes: HashMap::new(),
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Returns an attribute value, if present.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// The channel a one-time confirmation code was delivered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMedium {
    /// Code sent by email.
    Email,
    /// Code sent by SMS.
    Sms,
}

/// Where a one-time confirmation code was sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDelivery {
    /// The delivery channel.
    pub medium: DeliveryMedium,
    /// The (usually masked) destination, e.g. "j***@e***.com".
    pub destination: String,
}

impl CodeDelivery {
    /// Creates a code delivery record.
    #[must_use]
    pub fn new(medium: DeliveryMedium, destination: impl Into<String>) -> Self {
        Self {
            medium,
            destination: destination.into(),
        }
    }
}

/// Result of a provider sign-in call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    /// The provider established a session for the user.
    SignedIn,
    /// The provider requires a one-time SMS code to complete sign-in.
    SmsCodeRequired(CodeDelivery),
}

/// Result of a provider sign-up call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The account was created and is immediately usable.
    Complete,
    /// The account was created but must be confirmed with a one-time code.
    ConfirmationPending(CodeDelivery),
}

/// Data for redirecting the user to a social identity provider.
///
/// The redirect does not itself resolve the session; the session is
/// established by the generic state refresh after the redirect completes.
#[derive(Debug, Clone)]
pub struct SocialRedirect {
    /// The URL to redirect the user to for authentication.
    pub authorization_url: String,
    /// State parameter for CSRF protection.
    pub state: String,
}

/// Social identity providers supported for federated sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialProvider {
    /// Sign in with Google.
    Google,
}

/// A new-account request submitted to the provider.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    /// The account identifier (email address or E.164 phone number).
    pub identifier: String,
    /// The account password.
    pub password: String,
    /// The user's display name.
    pub display_name: String,
}

/// Trait for the external identity service.
///
/// All operations are asynchronous I/O against the provider. Implementations
/// must be shareable across tasks; the session manager holds one behind an
/// `Arc`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verifies credentials and establishes a provider-side session.
    async fn sign_in(&self, identifier: &str, password: &str)
    -> Result<SignInOutcome, ProviderError>;

    /// Starts a passwordless, SMS-code-driven sign-in for a phone number.
    async fn sign_in_with_phone(&self, phone: &str) -> Result<SignInOutcome, ProviderError>;

    /// Creates a new account.
    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome, ProviderError>;

    /// Begins a redirect-based social sign-in flow.
    async fn begin_social_sign_in(
        &self,
        provider: SocialProvider,
    ) -> Result<SocialRedirect, ProviderError>;

    /// Submits a one-time code to confirm a pending account.
    async fn confirm_sign_up(&self, identifier: &str, code: &str) -> Result<(), ProviderError>;

    /// Requests a fresh confirmation code for a pending account.
    async fn resend_confirmation_code(&self, identifier: &str) -> Result<(), ProviderError>;

    /// Requests a password-reset code for an account.
    async fn forgot_password(&self, identifier: &str) -> Result<(), ProviderError>;

    /// Submits a reset code and new password.
    async fn reset_password(
        &self,
        identifier: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), ProviderError>;

    /// Revokes the provider-side session.
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Returns the provider's current user, if a session exists.
    async fn current_user(&self) -> Result<Option<ProviderUser>, ProviderError>;
}

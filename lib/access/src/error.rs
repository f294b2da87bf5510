//! Error taxonomy for authentication operations.
//!
//! The identity provider reports failures as stringly-typed error names.
//! [`AuthError`] is the closed set those names are classified into, and the
//! `From<ProviderError>` impl is the single place that inspection happens.
//! Downstream code matches on variants, never on provider strings, and the
//! `Display` impl renders the user-facing message for each kind.

use crate::provider::ProviderError;
use std::fmt;

/// Fallback composition requirement used when the provider rejects a
/// password without saying why.
const DEFAULT_PASSWORD_REQUIREMENT: &str =
    "at least 8 characters including an uppercase letter, a lowercase letter, a number, and a symbol";

/// Classified authentication error.
///
/// Every operation on the session manager either refreshes the session or
/// raises exactly one of these. Nothing is retried automatically, and no
/// failure is fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The identifier/password pair was rejected.
    InvalidCredentials,
    /// The account exists but has not been confirmed yet.
    UnconfirmedAccount,
    /// No account exists for the submitted identifier.
    AccountNotFound,
    /// An account already exists for the submitted identifier (on sign-up).
    AccountExists,
    /// The password does not satisfy the composition requirement.
    WeakPassword {
        /// The requirement the password failed.
        requirement: String,
    },
    /// The submitted email or phone number is malformed.
    InvalidFormat {
        /// What the expected format is.
        detail: String,
    },
    /// The provider is rate-limiting this client.
    RateLimited,
    /// The account requires a password reset before it can sign in.
    PasswordResetRequired,
    /// The one-time confirmation or reset code was wrong or expired.
    InvalidCode,
    /// Sign-up succeeded but the account must be confirmed with a code
    /// before it is usable. Actionable, not a success.
    ConfirmationPending {
        /// Masked destination the code was sent to, if the provider said.
        destination: Option<String>,
    },
    /// Sign-in requires a one-time SMS code to complete.
    SmsCodeRequired {
        /// Masked destination the code was sent to, if the provider said.
        destination: Option<String>,
    },
    /// The provider reports a user is already signed in. The session
    /// manager treats this as success when the identity matches.
    AlreadyAuthenticated,
    /// The session store has not been mounted yet (detached handle).
    Unavailable,
    /// Unclassified provider failure; carries the raw code and message.
    Provider {
        /// The provider's error name.
        code: String,
        /// The provider's raw message.
        message: String,
    },
}

impl AuthError {
    /// Returns true if this error means the caller should be routed to the
    /// confirmation-code entry step.
    #[must_use]
    pub fn needs_confirmation(&self) -> bool {
        matches!(
            self,
            Self::UnconfirmedAccount | Self::ConfirmationPending { .. } | Self::SmsCodeRequired { .. }
        )
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => {
                write!(f, "incorrect credentials; check your email and password")
            }
            Self::UnconfirmedAccount => {
                write!(
                    f,
                    "your account is not confirmed yet; enter the code we sent to your email or phone"
                )
            }
            Self::AccountNotFound => {
                write!(f, "no account exists for that address; please sign up first")
            }
            Self::AccountExists => {
                write!(f, "an account already exists for that address; please sign in instead")
            }
            Self::WeakPassword { requirement } => {
                write!(f, "password does not meet the requirement: {requirement}")
            }
            Self::InvalidFormat { detail } => {
                write!(f, "invalid format: {detail}")
            }
            Self::RateLimited => {
                write!(f, "too many attempts; please wait a moment and try again")
            }
            Self::PasswordResetRequired => {
                write!(f, "a password reset is required before you can sign in")
            }
            Self::InvalidCode => {
                write!(f, "the verification code is invalid or has expired; request a new one")
            }
            Self::ConfirmationPending { destination } => match destination {
                Some(dest) => write!(f, "please confirm your account with the code we sent to {dest}"),
                None => write!(f, "please confirm your account with the code we sent you"),
            },
            Self::SmsCodeRequired { destination } => match destination {
                Some(dest) => write!(f, "enter the code we sent by SMS to {dest}"),
                None => write!(f, "enter the code we sent you by SMS"),
            },
            Self::AlreadyAuthenticated => {
                write!(f, "you are already signed in")
            }
            Self::Unavailable => {
                write!(f, "authentication is not available yet")
            }
            Self::Provider { message, .. } => {
                if message.is_empty() {
                    write!(f, "something went wrong; please try again")
                } else {
                    write!(f, "{message}")
                }
            }
        }
    }
}

impl std::error::Error for AuthError {}

impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        match err.code.as_str() {
            "NotAuthorizedException" => Self::InvalidCredentials,
            "UserNotConfirmedException" => Self::UnconfirmedAccount,
            "UserNotFoundException" => Self::AccountNotFound,
            "UsernameExistsException" => Self::AccountExists,
            "InvalidPasswordException" => {
                let requirement = if err.message.is_empty() {
                    DEFAULT_PASSWORD_REQUIREMENT.to_string()
                } else {
                    err.message
                };
                Self::WeakPassword { requirement }
            }
            "InvalidParameterException" => Self::InvalidFormat {
                detail: err.message,
            },
            "TooManyRequestsException" | "LimitExceededException"
            | "TooManyFailedAttemptsException" => Self::RateLimited,
            "PasswordResetRequiredException" => Self::PasswordResetRequired,
            "CodeMismatchException" | "ExpiredCodeException" => Self::InvalidCode,
            "UserAlreadyAuthenticatedException" => Self::AlreadyAuthenticated,
            _ => Self::Provider {
                code: err.code,
                message: err.message,
            },
        }
    }
}

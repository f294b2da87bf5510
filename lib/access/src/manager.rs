//! The session state manager.
//!
//! [`SessionManager`] is the single source of truth for "who is signed in"
//! and the verb surface for changing that. It is an explicit, injectable
//! store: constructed at application start, shared by `Arc`, torn down when
//! the process ends. All credential verification is delegated to the
//! [`IdentityProvider`]; this type owns the session record, the classified
//! error surface, and the role-derivation step.
//!
//! Every operation sets the session's `loading` flag on entry and clears it
//! on exit, including error paths. The flag is a hint for consumers to
//! disable duplicate submissions; distinct operations are not mutually
//! excluded against each other.

use crate::config::{AccessConfig, PasswordPolicy};
use crate::error::AuthError;
use crate::provider::{
    IdentityProvider, ProviderUser, SignInOutcome, SignUpOutcome, SignUpRequest, SocialProvider,
    SocialRedirect,
};
use crate::role::RoleResolver;
use crate::session::Session;
use crate::user::{Identifier, User};
use atelier_core::Result;
use rand::Rng;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// Owns the session record and exposes the asynchronous auth operations.
///
/// Operations either refresh the session or raise exactly one classified
/// [`AuthError`]; nothing is retried automatically, and no failure is fatal
/// to the process.
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    roles: Arc<dyn RoleResolver>,
    policy: PasswordPolicy,
    session: RwLock<Session>,
}

impl SessionManager {
    /// Creates a session manager over the given provider and role resolver.
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        roles: Arc<dyn RoleResolver>,
        config: AccessConfig,
    ) -> Self {
        Self {
            provider,
            roles,
            policy: config.password,
            session: RwLock::new(Session::new()),
        }
    }

    /// Returns a read-only clone of the current session.
    pub async fn snapshot(&self) -> Session {
        self.session.read().await.clone()
    }

    /// Returns true if a user is currently signed in.
    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_authenticated()
    }

    /// Returns a clone of the signed-in user, if any.
    pub async fn user(&self) -> Option<User> {
        self.session.read().await.user().cloned()
    }

    /// Determines the initial session state after application mount.
    ///
    /// Asks the provider for its current user (also how a completed social
    /// redirect lands). Resolves `Unknown` to `Authenticated` when a user
    /// exists and parses, otherwise to `Anonymous`. Provider failures and
    /// malformed payloads fail closed to `Anonymous`; nothing is raised.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> Session {
        self.begin().await;
        self.refresh_quietly().await;
        let mut session = self.session.write().await;
        session.set_loading(false);
        session.clone()
    }

    /// Signs in with an email address and password.
    ///
    /// If a different user is already signed in, that session is torn down
    /// first. A provider report of "already authenticated" for the same
    /// identity is treated as success, not an error.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        self.begin().await;
        let result = self.sign_in_inner(email, password).await;
        self.finish(result).await
    }

    async fn sign_in_inner(&self, email: &str, password: &str) -> std::result::Result<User, AuthError> {
        let identifier = Identifier::parse_email(email)?;
        self.teardown_if_other_identity(&identifier).await?;

        match self.provider.sign_in(identifier.as_str(), password).await {
            Ok(SignInOutcome::SignedIn) => {}
            Ok(SignInOutcome::SmsCodeRequired(delivery)) => {
                return Err(AuthError::SmsCodeRequired {
                    destination: Some(delivery.destination),
                });
            }
            Err(err) => match AuthError::from(err) {
                // Same identity already signed in at the provider: idempotent
                // re-entry, refresh and report success.
                AuthError::AlreadyAuthenticated => {
                    debug!("provider reports already authenticated; treating as success");
                }
                other => return Err(other),
            },
        }

        let user = self.refresh_user().await?;
        debug!(subject = user.subject(), "signed in");
        Ok(user)
    }

    /// Creates an email/password account.
    ///
    /// A provider report that confirmation is pending is raised as the
    /// actionable [`AuthError::ConfirmationPending`], never as success; the
    /// session is left unchanged.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<(), AuthError> {
        self.begin().await;
        let result = self.sign_up_inner(email, password, name).await;
        self.finish(result).await
    }

    async fn sign_up_inner(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> std::result::Result<(), AuthError> {
        let identifier = Identifier::parse_email(email)?;
        if !self.policy.check(password) {
            return Err(AuthError::WeakPassword {
                requirement: self.policy.requirement(),
            });
        }

        let request = SignUpRequest {
            identifier: identifier.as_str().to_string(),
            password: password.to_string(),
            display_name: name.to_string(),
        };

        match self.provider.sign_up(request).await.map_err(AuthError::from)? {
            SignUpOutcome::Complete => Ok(()),
            SignUpOutcome::ConfirmationPending(delivery) => Err(AuthError::ConfirmationPending {
                destination: Some(delivery.destination),
            }),
        }
    }

    /// Begins a redirect-based Google sign-in.
    ///
    /// Returns the redirect data; the session itself is established by
    /// [`bootstrap`](Self::bootstrap) after the redirect completes.
    #[instrument(skip(self))]
    pub async fn sign_in_with_google(&self) -> Result<SocialRedirect, AuthError> {
        self.begin().await;
        let result = self
            .provider
            .begin_social_sign_in(SocialProvider::Google)
            .await
            .map_err(AuthError::from);
        self.finish(result).await
    }

    /// Starts a passwordless, SMS-code-driven sign-in for a phone number.
    ///
    /// When the provider demands a one-time code this raises the distinct
    /// [`AuthError::SmsCodeRequired`]; the caller routes the user to code
    /// entry and completes via
    /// [`confirm_phone_sign_up`](Self::confirm_phone_sign_up).
    #[instrument(skip(self))]
    pub async fn sign_in_with_phone(&self, phone: &str) -> Result<User, AuthError> {
        self.begin().await;
        let result = self.sign_in_with_phone_inner(phone).await;
        self.finish(result).await
    }

    async fn sign_in_with_phone_inner(&self, phone: &str) -> std::result::Result<User, AuthError> {
        let identifier = Identifier::parse_phone(phone)?;
        self.teardown_if_other_identity(&identifier).await?;

        match self
            .provider
            .sign_in_with_phone(identifier.as_str())
            .await
            .map_err(AuthError::from)?
        {
            SignInOutcome::SignedIn => self.refresh_user().await,
            SignInOutcome::SmsCodeRequired(delivery) => Err(AuthError::SmsCodeRequired {
                destination: Some(delivery.destination),
            }),
        }
    }

    /// Creates a phone-number account.
    ///
    /// The flow is passwordless from the user's perspective, but the
    /// provider requires a password, so one is synthesized internally that
    /// satisfies the configured policy.
    #[instrument(skip(self))]
    pub async fn sign_up_with_phone(&self, phone: &str, name: &str) -> Result<(), AuthError> {
        self.begin().await;
        let result = self.sign_up_with_phone_inner(phone, name).await;
        self.finish(result).await
    }

    async fn sign_up_with_phone_inner(
        &self,
        phone: &str,
        name: &str,
    ) -> std::result::Result<(), AuthError> {
        let identifier = Identifier::parse_phone(phone)?;

        let request = SignUpRequest {
            identifier: identifier.as_str().to_string(),
            password: synthesize_password(&self.policy),
            display_name: name.to_string(),
        };

        match self.provider.sign_up(request).await.map_err(AuthError::from)? {
            SignUpOutcome::Complete => Ok(()),
            SignUpOutcome::ConfirmationPending(delivery) => Err(AuthError::ConfirmationPending {
                destination: Some(delivery.destination),
            }),
        }
    }

    /// Submits an email confirmation code.
    ///
    /// On success the session is refreshed; when the provider establishes a
    /// session as part of confirmation this acts as an implicit sign-in.
    #[instrument(skip(self, code))]
    pub async fn confirm_sign_up(&self, email: &str, code: &str) -> Result<(), AuthError> {
        self.begin().await;
        let result = self.confirm_inner(Identifier::parse_email(email), code).await;
        self.finish(result).await
    }

    /// Submits an SMS confirmation code for a phone account.
    #[instrument(skip(self, code))]
    pub async fn confirm_phone_sign_up(&self, phone: &str, code: &str) -> Result<(), AuthError> {
        self.begin().await;
        let result = self.confirm_inner(Identifier::parse_phone(phone), code).await;
        self.finish(result).await
    }

    async fn confirm_inner(
        &self,
        identifier: std::result::Result<Identifier, AuthError>,
        code: &str,
    ) -> std::result::Result<(), AuthError> {
        let identifier = identifier?;
        self.provider
            .confirm_sign_up(identifier.as_str(), code)
            .await
            .map_err(AuthError::from)?;
        self.refresh_quietly().await;
        Ok(())
    }

    /// Requests a fresh confirmation code. Fire-and-forget; no state change.
    #[instrument(skip(self))]
    pub async fn resend_confirmation_code(&self, identifier: &str) -> Result<(), AuthError> {
        self.begin().await;
        let result = match parse_identifier(identifier) {
            Ok(id) => self
                .provider
                .resend_confirmation_code(id.as_str())
                .await
                .map_err(AuthError::from),
            Err(err) => Err(err),
        };
        self.finish(result).await
    }

    /// Requests a password-reset code. No state change.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        self.begin().await;
        let result = match Identifier::parse_email(email) {
            Ok(id) => self
                .provider
                .forgot_password(id.as_str())
                .await
                .map_err(AuthError::from),
            Err(err) => Err(err),
        };
        self.finish(result).await
    }

    /// Submits a reset code and new password. No automatic sign-in.
    #[instrument(skip(self, code, new_password))]
    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.begin().await;
        let result = self.reset_password_inner(email, code, new_password).await;
        self.finish(result).await
    }

    async fn reset_password_inner(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> std::result::Result<(), AuthError> {
        let identifier = Identifier::parse_email(email)?;
        if !self.policy.check(new_password) {
            return Err(AuthError::WeakPassword {
                requirement: self.policy.requirement(),
            });
        }
        self.provider
            .reset_password(identifier.as_str(), code, new_password)
            .await
            .map_err(AuthError::from)
    }

    /// Signs out.
    ///
    /// The local session is cleared before the remote revocation, so
    /// sign-out is locally authoritative once attempted: a remote failure is
    /// still raised to the caller, but the user is never restored locally.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.begin().await;
        self.session.write().await.resolve_anonymous();
        let result = self.provider.sign_out().await.map_err(AuthError::from);
        if let Err(err) = &result {
            warn!(%err, "remote sign-out failed; local session already cleared");
        }
        self.finish(result).await
    }

    /// Tears down the current session when a different identity is signing in.
    async fn teardown_if_other_identity(
        &self,
        incoming: &Identifier,
    ) -> std::result::Result<(), AuthError> {
        let existing = {
            let session = self.session.read().await;
            session.user().map(|u| u.identifier().as_str().to_string())
        };

        if let Some(existing) = existing {
            if !existing.eq_ignore_ascii_case(incoming.as_str()) {
                debug!("different identity signing in; tearing down current session");
                self.provider.sign_out().await.map_err(AuthError::from)?;
                self.session.write().await.resolve_anonymous();
            }
        }
        Ok(())
    }

    /// Re-derives the session user from the provider, raising on failure.
    async fn refresh_user(&self) -> std::result::Result<User, AuthError> {
        let payload = self
            .provider
            .current_user()
            .await
            .map_err(AuthError::from)?
            .ok_or_else(|| AuthError::Provider {
                code: "NoCurrentUser".to_string(),
                message: "sign-in completed but the provider has no current user".to_string(),
            })?;

        let user = self.derive_user(&payload).await.map_err(|err| {
            warn!(%err, "current-user payload failed to parse");
            AuthError::Provider {
                code: "MalformedProfile".to_string(),
                message: err.to_string(),
            }
        })?;

        self.session.write().await.resolve_authenticated(user.clone());
        Ok(user)
    }

    /// Re-derives the session state from the provider, failing closed to
    /// anonymous instead of raising.
    async fn refresh_quietly(&self) {
        let resolved = match self.provider.current_user().await {
            Ok(Some(payload)) => match self.derive_user(&payload).await {
                Ok(user) => Some(user),
                Err(err) => {
                    warn!(%err, "current-user payload failed to parse; treating as anonymous");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(%err, "current-user lookup failed; treating as anonymous");
                None
            }
        };

        let mut session = self.session.write().await;
        match resolved {
            Some(user) => session.resolve_authenticated(user),
            None => session.resolve_anonymous(),
        }
    }

    /// Parses a provider payload into a user with its resolved role profile.
    async fn derive_user(
        &self,
        payload: &ProviderUser,
    ) -> std::result::Result<User, crate::user::ProfileParseError> {
        let identifier = payload
            .attribute("email")
            .or_else(|| payload.attribute("phone_number"))
            .unwrap_or(&payload.username);
        let profile = self.roles.resolve(identifier, &payload.subject).await;
        User::from_provider(payload, profile)
    }

    async fn begin(&self) {
        let mut session = self.session.write().await;
        session.set_loading(true);
        session.clear_error();
    }

    async fn finish<T>(&self, result: std::result::Result<T, AuthError>) -> Result<T, AuthError> {
        let mut session = self.session.write().await;
        session.set_loading(false);
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                session.record_error(err.clone());
                Err(err.into())
            }
        }
    }
}

/// Parses an identifier that may be either an email or a phone number.
fn parse_identifier(input: &str) -> std::result::Result<Identifier, AuthError> {
    Identifier::parse_email(input)
        .or_else(|_| Identifier::parse_phone(input))
        .map_err(|_| AuthError::InvalidFormat {
            detail: "expected an email address or an international phone number".to_string(),
        })
}

const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
const DIGIT: &[u8] = b"23456789";
const SYMBOL: &[u8] = b"!@#$%^&*";

/// Synthesizes a random password satisfying the given policy.
///
/// Used for the passwordless phone flow, where the provider requires a
/// password the user will never see or type.
fn synthesize_password(policy: &PasswordPolicy) -> String {
    fn pick(rng: &mut impl Rng, set: &[u8]) -> char {
        set[rng.random_range(0..set.len())] as char
    }

    let mut rng = rand::rng();
    let length = policy.min_length.max(16);
    let mut chars = Vec::with_capacity(length);

    if policy.require_uppercase {
        chars.push(pick(&mut rng, UPPER));
    }
    if policy.require_lowercase {
        chars.push(pick(&mut rng, LOWER));
    }
    if policy.require_digit {
        chars.push(pick(&mut rng, DIGIT));
    }
    if policy.require_symbol {
        chars.push(pick(&mut rng, SYMBOL));
    }
    while chars.len() < length {
        chars.push(pick(&mut rng, LOWER));
    }
    chars.shuffle(&mut rng);

    chars.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{CodeDelivery, DeliveryMedium, ProviderError};
    use crate::role::{Role, StaticRoleResolver};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const CONFIRM_CODE: &str = "123456";
    const RESET_CODE: &str = "654321";

    #[derive(Debug, Clone)]
    struct Account {
        subject: String,
        password: String,
        display_name: Option<String>,
        confirmed: bool,
        pending_code: Option<String>,
        reset_code: Option<String>,
        // When set, current_user returns a payload with no identifier
        // attributes, exercising the fail-closed parse.
        malformed: bool,
    }

    #[derive(Default)]
    struct MockState {
        accounts: HashMap<String, Account>,
        current: Option<String>,
        last_sign_up_password: Option<String>,
        fail_sign_out: bool,
        rate_limit_sign_in: bool,
    }

    /// Programmable in-memory identity provider.
    #[derive(Default)]
    struct MockProvider {
        state: Mutex<MockState>,
    }

    impl MockProvider {
        fn new() -> Self {
            Self::default()
        }

        fn with_account(self, identifier: &str, password: &str, confirmed: bool) -> Self {
            {
                let mut state = self.state.lock().expect("lock");
                let subject = format!("sub_{}", state.accounts.len() + 1);
                state.accounts.insert(
                    identifier.to_string(),
                    Account {
                        subject,
                        password: password.to_string(),
                        display_name: None,
                        confirmed,
                        pending_code: None,
                        reset_code: None,
                        malformed: false,
                    },
                );
            }
            self
        }

        fn with_malformed_account(self, identifier: &str, password: &str) -> Self {
            let this = self.with_account(identifier, password, true);
            this.state
                .lock()
                .expect("lock")
                .accounts
                .get_mut(identifier)
                .expect("account")
                .malformed = true;
            this
        }

        fn with_current(self, identifier: &str) -> Self {
            self.state.lock().expect("lock").current = Some(identifier.to_string());
            self
        }

        fn failing_sign_out(self) -> Self {
            self.state.lock().expect("lock").fail_sign_out = true;
            self
        }

        fn rate_limiting(self) -> Self {
            self.state.lock().expect("lock").rate_limit_sign_in = true;
            self
        }

        fn subject_of(&self, identifier: &str) -> String {
            self.state.lock().expect("lock").accounts[identifier]
                .subject
                .clone()
        }

        fn last_sign_up_password(&self) -> Option<String> {
            self.state.lock().expect("lock").last_sign_up_password.clone()
        }

        fn payload_for(account: &Account, identifier: &str) -> ProviderUser {
            let mut payload = ProviderUser::new(&account.subject, identifier);
            if !account.malformed {
                let key = if identifier.starts_with('+') {
                    "phone_number"
                } else {
                    "email"
                };
                payload = payload.with_attribute(key, identifier).with_attribute(
                    "email_verified",
                    if account.confirmed { "true" } else { "false" },
                );
                if let Some(name) = &account.display_name {
                    payload = payload.with_attribute("name", name.clone());
                }
            }
            payload
        }
    }

    fn not_found() -> ProviderError {
        ProviderError::new("UserNotFoundException", "User does not exist.")
    }

    #[async_trait]
    impl IdentityProvider for MockProvider {
        async fn sign_in(
            &self,
            identifier: &str,
            password: &str,
        ) -> std::result::Result<SignInOutcome, ProviderError> {
            let mut state = self.state.lock().expect("lock");
            if state.rate_limit_sign_in {
                return Err(ProviderError::new(
                    "TooManyRequestsException",
                    "Rate exceeded.",
                ));
            }
            if state.current.is_some() {
                return Err(ProviderError::new(
                    "UserAlreadyAuthenticatedException",
                    "There is already a signed in user.",
                ));
            }
            let account = state.accounts.get(identifier).ok_or_else(not_found)?;
            if !account.confirmed {
                return Err(ProviderError::new(
                    "UserNotConfirmedException",
                    "User is not confirmed.",
                ));
            }
            if account.password != password {
                return Err(ProviderError::new(
                    "NotAuthorizedException",
                    "Incorrect username or password.",
                ));
            }
            state.current = Some(identifier.to_string());
            Ok(SignInOutcome::SignedIn)
        }

        async fn sign_in_with_phone(
            &self,
            phone: &str,
        ) -> std::result::Result<SignInOutcome, ProviderError> {
            let mut state = self.state.lock().expect("lock");
            let account = state.accounts.get_mut(phone).ok_or_else(not_found)?;
            account.pending_code = Some(CONFIRM_CODE.to_string());
            Ok(SignInOutcome::SmsCodeRequired(CodeDelivery::new(
                DeliveryMedium::Sms,
                format!("***{}", &phone[phone.len() - 4..]),
            )))
        }

        async fn sign_up(
            &self,
            request: SignUpRequest,
        ) -> std::result::Result<SignUpOutcome, ProviderError> {
            let mut state = self.state.lock().expect("lock");
            if state.accounts.contains_key(&request.identifier) {
                return Err(ProviderError::new(
                    "UsernameExistsException",
                    "An account with the given email already exists.",
                ));
            }
            state.last_sign_up_password = Some(request.password.clone());
            let subject = format!("sub_{}", state.accounts.len() + 1);
            let medium = if request.identifier.starts_with('+') {
                DeliveryMedium::Sms
            } else {
                DeliveryMedium::Email
            };
            state.accounts.insert(
                request.identifier.clone(),
                Account {
                    subject,
                    password: request.password,
                    display_name: Some(request.display_name),
                    confirmed: false,
                    pending_code: Some(CONFIRM_CODE.to_string()),
                    reset_code: None,
                    malformed: false,
                },
            );
            Ok(SignUpOutcome::ConfirmationPending(CodeDelivery::new(
                medium,
                request.identifier,
            )))
        }

        async fn begin_social_sign_in(
            &self,
            _provider: SocialProvider,
        ) -> std::result::Result<SocialRedirect, ProviderError> {
            Ok(SocialRedirect {
                authorization_url:
                    "https://auth.example.com/oauth2/authorize?identity_provider=Google"
                        .to_string(),
                state: "state_mock".to_string(),
            })
        }

        async fn confirm_sign_up(
            &self,
            identifier: &str,
            code: &str,
        ) -> std::result::Result<(), ProviderError> {
            let mut state = self.state.lock().expect("lock");
            let account = state.accounts.get_mut(identifier).ok_or_else(not_found)?;
            if account.pending_code.as_deref() != Some(code) {
                return Err(ProviderError::new(
                    "CodeMismatchException",
                    "Invalid verification code provided.",
                ));
            }
            account.confirmed = true;
            account.pending_code = None;
            // Confirmation establishes a provider session (implicit sign-in).
            state.current = Some(identifier.to_string());
            Ok(())
        }

        async fn resend_confirmation_code(
            &self,
            identifier: &str,
        ) -> std::result::Result<(), ProviderError> {
            let mut state = self.state.lock().expect("lock");
            let account = state.accounts.get_mut(identifier).ok_or_else(not_found)?;
            account.pending_code = Some(CONFIRM_CODE.to_string());
            Ok(())
        }

        async fn forgot_password(&self, identifier: &str) -> std::result::Result<(), ProviderError> {
            let mut state = self.state.lock().expect("lock");
            let account = state.accounts.get_mut(identifier).ok_or_else(not_found)?;
            account.reset_code = Some(RESET_CODE.to_string());
            Ok(())
        }

        async fn reset_password(
            &self,
            identifier: &str,
            code: &str,
            new_password: &str,
        ) -> std::result::Result<(), ProviderError> {
            let mut state = self.state.lock().expect("lock");
            let account = state.accounts.get_mut(identifier).ok_or_else(not_found)?;
            if account.reset_code.as_deref() != Some(code) {
                return Err(ProviderError::new(
                    "CodeMismatchException",
                    "Invalid verification code provided.",
                ));
            }
            account.password = new_password.to_string();
            account.reset_code = None;
            Ok(())
        }

        async fn sign_out(&self) -> std::result::Result<(), ProviderError> {
            let mut state = self.state.lock().expect("lock");
            if state.fail_sign_out {
                return Err(ProviderError::new(
                    "NetworkError",
                    "Network error during sign out.",
                ));
            }
            state.current = None;
            Ok(())
        }

        async fn current_user(&self) -> std::result::Result<Option<ProviderUser>, ProviderError> {
            let state = self.state.lock().expect("lock");
            Ok(state.current.as_ref().map(|identifier| {
                let account = &state.accounts[identifier];
                Self::payload_for(account, identifier)
            }))
        }
    }

    fn manager(provider: MockProvider) -> SessionManager {
        SessionManager::new(
            Arc::new(provider),
            Arc::new(StaticRoleResolver::new(
                vec!["admin@atelier.dev".to_string()],
                vec![],
            )),
            AccessConfig::default(),
        )
    }

    fn last_error(session: &Session) -> AuthError {
        session.last_error().cloned().expect("expected an error")
    }

    #[tokio::test]
    async fn bootstrap_without_provider_session_is_anonymous() {
        let manager = manager(MockProvider::new());
        let session = manager.bootstrap().await;

        assert!(!session.is_authenticated());
        assert!(!session.state().is_unknown());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn bootstrap_with_provider_session_is_authenticated() {
        let provider = MockProvider::new()
            .with_account("jane@example.com", "Aa1!aaaa", true)
            .with_current("jane@example.com");
        let manager = manager(provider);

        let session = manager.bootstrap().await;
        assert!(session.is_authenticated());
        assert_eq!(session.user().and_then(User::email), Some("jane@example.com"));
    }

    #[tokio::test]
    async fn bootstrap_fails_closed_on_malformed_payload() {
        let provider = MockProvider::new()
            .with_malformed_account("jane@example.com", "Aa1!aaaa")
            .with_current("jane@example.com");
        let manager = manager(provider);

        let session = manager.bootstrap().await;
        assert!(!session.is_authenticated());
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn sign_in_success_transitions_to_authenticated() {
        let provider = MockProvider::new().with_account("jane@example.com", "Aa1!aaaa", true);
        let manager = manager(provider);
        manager.bootstrap().await;

        let user = manager
            .sign_in("jane@example.com", "Aa1!aaaa")
            .await
            .expect("should sign in");

        assert_eq!(user.email(), Some("jane@example.com"));
        let session = manager.snapshot().await;
        assert!(session.is_authenticated());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn sign_in_wrong_password_is_invalid_credentials_kind() {
        let provider = MockProvider::new().with_account("jane@example.com", "Aa1!aaaa", true);
        let manager = manager(provider);
        manager.bootstrap().await;

        let result = manager.sign_in("jane@example.com", "wrong-password").await;
        assert!(result.is_err());

        let session = manager.snapshot().await;
        assert!(!session.is_authenticated());
        assert!(!session.is_loading());
        assert_eq!(last_error(&session), AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn sign_in_unconfirmed_account_kind() {
        let provider = MockProvider::new().with_account("jane@example.com", "Aa1!aaaa", false);
        let manager = manager(provider);
        manager.bootstrap().await;

        let result = manager.sign_in("jane@example.com", "Aa1!aaaa").await;
        assert!(result.is_err());
        assert_eq!(
            last_error(&manager.snapshot().await),
            AuthError::UnconfirmedAccount
        );
    }

    #[tokio::test]
    async fn sign_in_unknown_account_directs_to_sign_up() {
        let manager = manager(MockProvider::new());
        manager.bootstrap().await;

        let result = manager.sign_in("nobody@example.com", "Aa1!aaaa").await;
        assert!(result.is_err());
        assert_eq!(
            last_error(&manager.snapshot().await),
            AuthError::AccountNotFound
        );
    }

    #[tokio::test]
    async fn sign_in_rate_limited_kind() {
        let provider = MockProvider::new()
            .with_account("jane@example.com", "Aa1!aaaa", true)
            .rate_limiting();
        let manager = manager(provider);
        manager.bootstrap().await;

        let result = manager.sign_in("jane@example.com", "Aa1!aaaa").await;
        assert!(result.is_err());
        assert_eq!(last_error(&manager.snapshot().await), AuthError::RateLimited);
    }

    #[tokio::test]
    async fn sign_in_malformed_email_never_reaches_provider() {
        let manager = manager(MockProvider::new());
        manager.bootstrap().await;

        let result = manager.sign_in("not-an-email", "Aa1!aaaa").await;
        assert!(result.is_err());
        assert!(matches!(
            last_error(&manager.snapshot().await),
            AuthError::InvalidFormat { .. }
        ));
    }

    #[tokio::test]
    async fn sign_in_twice_same_identity_is_idempotent() {
        let provider = MockProvider::new().with_account("jane@example.com", "Aa1!aaaa", true);
        let manager = manager(provider);
        manager.bootstrap().await;

        let first = manager
            .sign_in("jane@example.com", "Aa1!aaaa")
            .await
            .expect("first sign-in");
        // Provider now reports "already authenticated"; same identity must
        // be treated as success.
        let second = manager
            .sign_in("jane@example.com", "Aa1!aaaa")
            .await
            .expect("second sign-in should not raise");

        assert_eq!(first.subject(), second.subject());
        assert!(manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn sign_in_switches_identity_with_teardown() {
        let provider = MockProvider::new()
            .with_account("first@example.com", "Aa1!aaaa", true)
            .with_account("second@example.com", "Bb2@bbbb", true);
        let manager = manager(provider);
        manager.bootstrap().await;

        manager
            .sign_in("first@example.com", "Aa1!aaaa")
            .await
            .expect("first sign-in");
        manager
            .sign_in("second@example.com", "Bb2@bbbb")
            .await
            .expect("second sign-in");

        let session = manager.snapshot().await;
        assert_eq!(
            session.user().and_then(User::email),
            Some("second@example.com")
        );
    }

    #[tokio::test]
    async fn sign_up_existing_account_raises_account_exists() {
        let provider = MockProvider::new().with_account("jane@example.com", "Aa1!aaaa", true);
        let manager = manager(provider);
        manager.bootstrap().await;

        let result = manager
            .sign_up("jane@example.com", "Bb2@bbbb", "Jane")
            .await;
        assert!(result.is_err());

        let session = manager.snapshot().await;
        assert_eq!(last_error(&session), AuthError::AccountExists);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn sign_up_confirmation_pending_is_raised_not_success() {
        let manager = manager(MockProvider::new());
        manager.bootstrap().await;

        let result = manager.sign_up("new@x.com", "Aa1!aaaa", "Jane").await;
        assert!(result.is_err());

        let session = manager.snapshot().await;
        assert!(!session.is_authenticated());
        match last_error(&session) {
            AuthError::ConfirmationPending { destination } => {
                assert_eq!(destination.as_deref(), Some("new@x.com"));
            }
            other => panic!("expected ConfirmationPending, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn sign_up_weak_password_rejected_locally() {
        let manager = manager(MockProvider::new());
        manager.bootstrap().await;

        let result = manager.sign_up("new@x.com", "short", "Jane").await;
        assert!(result.is_err());
        match last_error(&manager.snapshot().await) {
            AuthError::WeakPassword { requirement } => {
                assert!(requirement.contains("at least 8 characters"));
            }
            other => panic!("expected WeakPassword, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn confirm_sign_up_acts_as_implicit_sign_in() {
        let manager = manager(MockProvider::new());
        manager.bootstrap().await;

        let _ = manager.sign_up("new@x.com", "Aa1!aaaa", "Jane").await;
        manager
            .confirm_sign_up("new@x.com", CONFIRM_CODE)
            .await
            .expect("should confirm");

        let session = manager.snapshot().await;
        assert!(session.is_authenticated());
        assert_eq!(session.user().and_then(User::email), Some("new@x.com"));
    }

    #[tokio::test]
    async fn confirm_sign_up_wrong_code_is_invalid_code_kind() {
        let manager = manager(MockProvider::new());
        manager.bootstrap().await;

        let _ = manager.sign_up("new@x.com", "Aa1!aaaa", "Jane").await;
        let result = manager.confirm_sign_up("new@x.com", "000000").await;

        assert!(result.is_err());
        assert_eq!(last_error(&manager.snapshot().await), AuthError::InvalidCode);
    }

    #[tokio::test]
    async fn resend_confirmation_code_leaves_session_unchanged() {
        let manager = manager(MockProvider::new());
        manager.bootstrap().await;
        let _ = manager.sign_up("new@x.com", "Aa1!aaaa", "Jane").await;

        let before = manager.snapshot().await.state().clone();
        manager
            .resend_confirmation_code("new@x.com")
            .await
            .expect("should resend");
        assert_eq!(manager.snapshot().await.state(), &before);
    }

    #[tokio::test]
    async fn forgot_reset_sign_in_roundtrip_keeps_identity() {
        let provider = MockProvider::new().with_account("jane@example.com", "Aa1!aaaa", true);
        let original_subject = provider.subject_of("jane@example.com");
        let manager = manager(provider);
        manager.bootstrap().await;

        manager
            .forgot_password("jane@example.com")
            .await
            .expect("should request reset");
        manager
            .reset_password("jane@example.com", RESET_CODE, "Cc3#cccc")
            .await
            .expect("should reset");

        // Old password no longer works.
        assert!(manager.sign_in("jane@example.com", "Aa1!aaaa").await.is_err());

        let user = manager
            .sign_in("jane@example.com", "Cc3#cccc")
            .await
            .expect("should sign in with new password");
        assert_eq!(user.subject(), original_subject);
    }

    #[tokio::test]
    async fn reset_password_requires_no_sign_in() {
        let provider = MockProvider::new().with_account("jane@example.com", "Aa1!aaaa", true);
        let manager = manager(provider);
        manager.bootstrap().await;

        manager
            .forgot_password("jane@example.com")
            .await
            .expect("should request reset");
        manager
            .reset_password("jane@example.com", RESET_CODE, "Cc3#cccc")
            .await
            .expect("should reset");

        assert!(!manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn sign_out_clears_session() {
        let provider = MockProvider::new().with_account("jane@example.com", "Aa1!aaaa", true);
        let manager = manager(provider);
        manager.bootstrap().await;
        manager
            .sign_in("jane@example.com", "Aa1!aaaa")
            .await
            .expect("should sign in");

        manager.sign_out().await.expect("should sign out");
        assert!(!manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn sign_out_is_locally_authoritative_on_remote_failure() {
        let provider = MockProvider::new()
            .with_account("jane@example.com", "Aa1!aaaa", true)
            .with_current("jane@example.com")
            .failing_sign_out();
        let manager = manager(provider);
        manager.bootstrap().await;
        assert!(manager.is_authenticated().await);

        let result = manager.sign_out().await;
        assert!(result.is_err());
        // The remote failure is raised, but the local user is not restored.
        assert!(!manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn google_sign_in_returns_redirect_without_touching_session() {
        let manager = manager(MockProvider::new());
        manager.bootstrap().await;

        let redirect = manager
            .sign_in_with_google()
            .await
            .expect("should initiate redirect");

        assert!(redirect.authorization_url.contains("identity_provider=Google"));
        assert!(!manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn phone_sign_in_signals_sms_code_required() {
        let provider = MockProvider::new().with_account("+15551234567", "unused", true);
        let manager = manager(provider);
        manager.bootstrap().await;

        let result = manager.sign_in_with_phone("+15551234567").await;
        assert!(result.is_err());
        match last_error(&manager.snapshot().await) {
            AuthError::SmsCodeRequired { destination } => {
                assert_eq!(destination.as_deref(), Some("***4567"));
            }
            other => panic!("expected SmsCodeRequired, got {other:?}"),
        }

        manager
            .confirm_phone_sign_up("+15551234567", CONFIRM_CODE)
            .await
            .expect("should confirm");
        let session = manager.snapshot().await;
        assert!(session.is_authenticated());
        assert_eq!(session.user().and_then(User::phone), Some("+15551234567"));
    }

    #[tokio::test]
    async fn phone_sign_up_synthesizes_policy_satisfying_password() {
        let provider = Arc::new(MockProvider::new());
        let manager = SessionManager::new(
            provider.clone(),
            Arc::new(StaticRoleResolver::default()),
            AccessConfig::default(),
        );
        manager.bootstrap().await;

        let result = manager.sign_up_with_phone("+15551234567", "Jane").await;
        assert!(result.is_err());
        assert!(matches!(
            last_error(&manager.snapshot().await),
            AuthError::ConfirmationPending { .. }
        ));

        let synthesized = provider
            .last_sign_up_password()
            .expect("provider should have received a password");
        assert!(PasswordPolicy::default().check(&synthesized));
    }

    #[tokio::test]
    async fn role_resolution_applies_on_refresh() {
        let provider = MockProvider::new().with_account("admin@atelier.dev", "Aa1!aaaa", true);
        let manager = manager(provider);
        manager.bootstrap().await;

        let user = manager
            .sign_in("admin@atelier.dev", "Aa1!aaaa")
            .await
            .expect("should sign in");
        assert_eq!(user.role(), Role::Admin);
    }

    #[tokio::test]
    async fn loading_flag_false_after_success_and_failure() {
        let provider = MockProvider::new().with_account("jane@example.com", "Aa1!aaaa", true);
        let manager = manager(provider);
        manager.bootstrap().await;

        manager
            .sign_in("jane@example.com", "Aa1!aaaa")
            .await
            .expect("should sign in");
        assert!(!manager.snapshot().await.is_loading());

        let _ = manager.sign_in("jane@example.com", "Aa1!aaaa").await;
        let _ = manager.forgot_password("nobody@example.com").await;
        assert!(!manager.snapshot().await.is_loading());
    }

    #[test]
    fn synthesized_password_satisfies_policy() {
        let policy = PasswordPolicy::default();
        for _ in 0..32 {
            let password = synthesize_password(&policy);
            assert!(policy.check(&password), "{password}");
            assert!(password.len() >= 16);
        }
    }

    #[test]
    fn parse_identifier_accepts_both_forms() {
        assert!(parse_identifier("jane@example.com").expect("email").is_email());
        assert!(!parse_identifier("+15551234567").expect("phone").is_email());
        assert!(parse_identifier("neither").is_err());
    }
}

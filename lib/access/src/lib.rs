//! Authentication session management and access control for atelier.
//!
//! This crate is the single source of truth for "who is signed in" on the
//! atelier learning and mentorship platform:
//! - The session state manager (`SessionManager`) and its in-memory
//!   `Session` record
//! - The identity-provider boundary (`IdentityProvider` trait) with a
//!   closed, classified error taxonomy (`AuthError`)
//! - Role resolution (`RoleResolver`, `Role`) mapping identities to
//!   Student/Mentor/Admin
//! - Route guarding (`RouteGuard`) and the safe accessor (`SessionHandle`)
//!
//! # State Model
//!
//! The session starts `Unknown`, resolves to `Anonymous` or
//! `Authenticated` on bootstrap, and moves between those two for the life
//! of the process. All credential verification happens inside the external
//! identity provider; this crate owns classification, role derivation, and
//! the session record.
//!
//! # Example
//!
//! ```
//! use atelier_access::{AccessConfig, GuardDecision, RouteGuard, Session};
//!
//! let config = AccessConfig::builder()
//!     .admin("admin@atelier.dev")
//!     .mentor("mentor@atelier.dev")
//!     .build();
//! assert!(config.password.check("Aa1!aaaa"));
//!
//! // Freshly mounted: state is unknown, protected routes hold.
//! let session = Session::new();
//! let guard = RouteGuard::authenticated();
//! assert_eq!(guard.evaluate(&session), GuardDecision::Pending);
//! ```

pub mod config;
pub mod error;
pub mod guard;
pub mod handle;
pub mod manager;
pub mod provider;
pub mod role;
pub mod session;
pub mod user;

// Re-export main types at crate root
pub use config::{AccessConfig, AccessConfigBuilder, PasswordPolicy, RoleRules};
pub use error::AuthError;
pub use guard::{GuardDecision, RouteGuard};
pub use handle::SessionHandle;
pub use manager::SessionManager;
pub use provider::{
    CodeDelivery, DeliveryMedium, IdentityProvider, ProviderError, ProviderUser, SignInOutcome,
    SignUpOutcome, SignUpRequest, SocialProvider, SocialRedirect,
};
pub use role::{Membership, Role, RoleProfile, RoleResolver, StaticRoleResolver, Subscription};
pub use session::{Session, SessionState};
pub use user::{AuthProviderKind, Identifier, ProfileParseError, User};

//! Error handling foundation for the atelier platform.
//!
//! Only the shared `Result` alias lives here. Domain error types belong to
//! the crate that raises them; layers attach context with rootcause's
//! `.context()` as a failure travels up.

use rootcause::Report;

/// Result alias over rootcause's `Report`.
///
/// The context parameter is the domain error type of the raising crate.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

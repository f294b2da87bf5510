//! Core domain types and utilities for the atelier platform.
//!
//! This crate provides the foundational types and error handling shared by
//! the atelier learning and mentorship platform crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::SessionId;

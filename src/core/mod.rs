//! Core error types shared by every packport module.
//!
//! - [`PackportError`] - enumerated failure modes (validation, transport, archive, config)
//! - [`ErrorContext`] - user-facing wrapper with details and suggestions
//! - [`user_friendly_error`] - maps any `anyhow::Error` to an [`ErrorContext`]

pub mod error;

pub use error::{ErrorContext, PackportError, user_friendly_error};

//! Core types and error handling for the VDPro update core.
//!
//! The [`error`] module defines [`UpdateError`], the typed failure vocabulary
//! shared by the primary application and the updater process, and
//! [`ErrorContext`], which turns any error into a message with an actionable
//! suggestion for display.

pub mod error;

pub use error::{ErrorContext, UpdateError, user_friendly_error};

//! Error handling for VDPro self-update
//!
//! This module provides the strongly-typed [`UpdateError`] enum used across the
//! update core, and [`ErrorContext`] for rendering errors to the user with a
//! suggestion attached.
//!
//! # Error Categories
//!
//! - **Environment**: [`UpdateError::NotPackaged`], [`UpdateError::UpdaterNotFound`]
//! - **Coordination**: [`UpdateError::SessionActive`], [`UpdateError::UpdateInProgress`],
//!   [`UpdateError::InvalidStateTransition`]
//! - **Manifest**: [`UpdateError::ManifestHttp`], [`UpdateError::ManifestInvalid`],
//!   [`UpdateError::InvalidVersion`]
//! - **Download**: [`UpdateError::DownloadHttp`], [`UpdateError::IncompleteDownload`],
//!   [`UpdateError::ChecksumMismatch`]
//! - **Transport**: [`UpdateError::Http`], [`UpdateError::Io`]
//!
//! Check-phase errors never reach the caller of
//! [`ManifestFetcher::check_for_updates`](crate::upgrade::ManifestFetcher::check_for_updates);
//! they are logged and collapsed into "no update available". Download-phase and
//! environment errors are delivered to
//! [`UpdateObserver::on_error`](crate::upgrade::UpdateObserver::on_error) as
//! their display string.
//!
//! # Examples
//!
//! ```rust,no_run
//! use vdpro::core::{UpdateError, user_friendly_error};
//!
//! let err = anyhow::Error::from(UpdateError::UpdaterNotFound {
//!     searched: "/opt/vdpro".to_string(),
//! });
//! user_friendly_error(err).display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Every failure the update core can report.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// Self-update was requested from a development build.
    #[error("Self-update is only available from a packaged build (running from {path})")]
    NotPackaged {
        /// Path of the running executable
        path: String,
    },

    /// The companion updater binary is missing from every searched location.
    #[error("Updater executable not found (searched: {searched})")]
    UpdaterNotFound {
        /// Directories that were searched, comma separated
        searched: String,
    },

    /// A second session was started while one is still active in this process.
    #[error("An update session is already active in this process")]
    SessionActive,

    /// Another process holds the update lock.
    #[error("Another update is already in progress (lock held at {path})")]
    UpdateInProgress {
        /// Path of the lock file
        path: String,
    },

    /// The manifest endpoint answered with a non-success status.
    #[error("Manifest request failed with HTTP status {status}")]
    ManifestHttp {
        /// HTTP status code
        status: u16,
    },

    /// The manifest body could not be used.
    #[error("Invalid version manifest: {reason}")]
    ManifestInvalid {
        /// What was wrong with it
        reason: String,
    },

    /// A version string is not a semantic version.
    #[error("Invalid version string '{version}'")]
    InvalidVersion {
        /// The offending string
        version: String,
    },

    /// The binary download answered with a non-success status.
    #[error("Download failed with HTTP status {status}")]
    DownloadHttp {
        /// HTTP status code
        status: u16,
    },

    /// Fewer (or more) bytes arrived than the server advertised.
    #[error("Incomplete download: received {actual} of {expected} bytes")]
    IncompleteDownload {
        /// Advertised content length
        expected: u64,
        /// Bytes actually written
        actual: u64,
    },

    /// The staged file does not match the digest published in the manifest.
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Digest from the manifest
        expected: String,
        /// Digest of the staged file
        actual: String,
    },

    /// An update session was driven through a transition it does not allow.
    #[error("Invalid update state transition: {from} -> {to}")]
    InvalidStateTransition {
        /// State before the transition
        from: String,
        /// Requested state
        to: String,
    },

    /// Network error from the HTTP client.
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// File system error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An error message plus optional details and a suggestion for the user.
#[derive(Debug)]
pub struct ErrorContext {
    /// Display form of the underlying error
    pub error: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Attach a suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a suggestion where one is known.
///
/// Typed [`UpdateError`]s anywhere in the chain get a tailored suggestion;
/// bare I/O errors get a generic one; anything else is shown with its full
/// context chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(update_error) = error.chain().find_map(|c| c.downcast_ref::<UpdateError>()) {
        let ctx = create_error_context(update_error);
        let full = error.to_string();
        return if full == update_error.to_string() {
            ctx
        } else {
            ctx.with_details(format!("{error:#}"))
        };
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(format!("{error:#}"))
                    .with_suggestion(
                        "Check that you can write to the directory containing the application",
                    );
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(format!("{error:#}"))
                    .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    ErrorContext::new(format!("{error:#}"))
}

fn create_error_context(error: &UpdateError) -> ErrorContext {
    let ctx = ErrorContext::new(error.to_string());
    match error {
        UpdateError::NotPackaged { .. } => ctx
            .with_suggestion("Download the latest release manually, or rebuild from source")
            .with_details("Development builds cannot replace themselves"),
        UpdateError::UpdaterNotFound { .. } => ctx.with_suggestion(
            "Reinstall the application; the updater must be shipped next to the main executable",
        ),
        UpdateError::SessionActive | UpdateError::UpdateInProgress { .. } => ctx
            .with_suggestion("Wait for the running update to finish before starting another one"),
        UpdateError::ManifestHttp { .. }
        | UpdateError::ManifestInvalid { .. }
        | UpdateError::Http(_) => {
            ctx.with_suggestion("Check your internet connection and try again later")
        }
        UpdateError::DownloadHttp { .. }
        | UpdateError::IncompleteDownload { .. }
        | UpdateError::ChecksumMismatch { .. } => {
            ctx.with_suggestion("Retry the update; the download starts from scratch each time")
        }
        UpdateError::Io(io) if io.kind() == std::io::ErrorKind::PermissionDenied => ctx
            .with_suggestion("Check that you can write to the directory containing the application"),
        _ => ctx,
    }
}

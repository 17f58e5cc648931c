//! Error handling for packport
//!
//! This module provides the error types and user-friendly error reporting used across
//! the export/import pipeline. The error system follows two rules:
//! 1. **Strongly-typed errors** for the failure modes callers need to tell apart
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Error Categories
//!
//! - **Validation**: [`PackportError::PackageNotFound`], [`PackportError::SpaceNotFound`],
//!   [`PackportError::NoActiveVersion`], [`PackportError::PackageAlreadyExists`],
//!   [`PackportError::ValidationError`]
//! - **Transport**: [`PackportError::TransportError`], [`PackportError::NetworkError`]
//! - **Archive**: [`PackportError::ArchiveError`], [`PackportError::ArchiveEntryMissing`]
//! - **Configuration**: [`PackportError::ProfileNotFound`], [`PackportError::ConfigError`]
//! - **Files**: [`PackportError::FileNotFound`], [`PackportError::IoError`]
//!
//! Validation errors abort a command before any output is written. Transport errors are
//! never retried; they bubble up to the CLI which reports them and exits with code 1.
//!
//! # Examples
//!
//! ```rust,no_run
//! use packport::core::{PackportError, user_friendly_error};
//!
//! let error = PackportError::SpaceNotFound { id: "missing-id".to_string() };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for packport operations.
///
/// Each variant maps to one failure mode of the export/import pipeline. Variants that
/// wrap foreign errors (`IoError`, `YamlError`, ...) exist so `?` works on the
/// collaborators the pipeline talks to.
#[derive(Error, Debug)]
pub enum PackportError {
    /// A requested package key is not present in the source environment.
    #[error("Package with key '{key}' not found")]
    PackageNotFound {
        /// The package key that could not be found
        key: String,
    },

    /// A package has no activated version to export.
    #[error("Package '{key}' has no activated version")]
    NoActiveVersion {
        /// The package key without an active version
        key: String,
    },

    /// An explicit space id does not exist in the target environment.
    ///
    /// The message text is part of the observable contract of `config import`.
    #[error("Provided space ID does not exist.")]
    SpaceNotFound {
        /// The space id that was requested
        id: String,
    },

    /// A package with the same key already exists and overwrite was not requested.
    #[error("Package with key '{key}' already exists in the target environment")]
    PackageAlreadyExists {
        /// The conflicting package key
        key: String,
    },

    /// A dependency edge points at a package that is not part of the catalog.
    #[error("Package '{parent}' depends on '{key}@{version}', which is not in the catalog")]
    DependencyNotInCatalog {
        /// Key of the package declaring the dependency
        parent: String,
        /// Key of the missing dependency
        key: String,
        /// Version required by the parent
        version: String,
    },

    /// Generic input validation failure.
    #[error("Validation failed: {reason}")]
    ValidationError {
        /// Why validation failed
        reason: String,
    },

    /// The backend answered with a non-2xx status.
    ///
    /// `message` is the parsed error body when one was returned, otherwise
    /// `status code N`.
    #[error("{operation} failed: {message}")]
    TransportError {
        /// The backend operation that failed
        operation: String,
        /// HTTP status, when a response was received
        status: Option<u16>,
        /// Upstream error message
        message: String,
    },

    /// The request never produced a response (DNS, TLS, connection reset).
    #[error("Network error: {operation}")]
    NetworkError {
        /// The network operation that failed
        operation: String,
        /// Reason for the network failure
        reason: String,
    },

    /// The archive is structurally invalid.
    #[error("Invalid archive: {reason}")]
    ArchiveError {
        /// What is wrong with the archive
        reason: String,
    },

    /// A required entry is missing from an archive.
    #[error("Archive entry '{name}' not found")]
    ArchiveEntryMissing {
        /// Name of the missing entry
        name: String,
    },

    /// No profile with the given name is configured.
    #[error("Profile '{name}' not found")]
    ProfileNotFound {
        /// Name of the profile that was requested
        name: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// An input file does not exist or is not a regular file.
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path that was expected to exist
        path: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML (de)serialization error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Zip container error
    #[error("Zip error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl PackportError {
    /// Whether this error is a validation failure (as opposed to transport or I/O).
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::PackageNotFound { .. }
                | Self::NoActiveVersion { .. }
                | Self::SpaceNotFound { .. }
                | Self::PackageAlreadyExists { .. }
                | Self::DependencyNotInCatalog { .. }
                | Self::ValidationError { .. }
        )
    }

    /// Builds a transport error from an HTTP status and an optional upstream message.
    pub fn transport(operation: impl Into<String>, status: u16, message: Option<String>) -> Self {
        Self::TransportError {
            operation: operation.into(),
            status: Some(status),
            message: message.unwrap_or_else(|| format!("status code {status}")),
        }
    }
}

/// Error context wrapper that provides user-friendly error information.
///
/// Displayed as:
/// 1. **error**: the main message in red
/// 2. **details**: additional context in yellow (optional)
/// 3. **suggestion**: actionable next step in green (optional)
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error message
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context from any displayable error.
    #[must_use]
    pub fn new(error: impl fmt::Display) -> Self {
        Self {
            message: error.to_string(),
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

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
        write!(f, "{}", self.message)?;

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

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions.
///
/// The whole `anyhow` chain is searched for a [`PackportError`], so errors that were
/// wrapped with `.context(...)` on their way up still get tailored suggestions. The
/// outer context messages are kept as details.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(packport_error) = error.chain().find_map(|e| e.downcast_ref::<PackportError>()) {
        let ctx = create_error_context(packport_error);
        let outer = error.to_string();
        if outer != packport_error.to_string() && ctx.details.is_none() {
            return ctx.with_details(outer);
        }
        return ctx;
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(io_error)
                    .with_suggestion("Check file ownership and permissions of the archive and working directory");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(io_error)
                    .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext {
        message,
        suggestion: None,
        details: None,
    }
}

fn create_error_context(error: &PackportError) -> ErrorContext {
    match error {
        PackportError::PackageNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Check the package key spelling; keys are case-sensitive"),

        PackportError::NoActiveVersion { key } => ErrorContext::new(error).with_suggestion(
            format!("Publish a version of '{key}' in the source environment before exporting it"),
        ),

        PackportError::SpaceNotFound { id } => ErrorContext::new(error)
            .with_details(format!("Space '{id}' is referenced by the archive but missing in the target"))
            .with_suggestion("Remove the space id from the manifest or map the package to a space name with --spaceMappings"),

        PackportError::PackageAlreadyExists { .. } => ErrorContext::new(error)
            .with_suggestion("Re-run the import with --overwrite to replace existing packages"),

        PackportError::TransportError { status: Some(401 | 403), .. } => ErrorContext::new(error)
            .with_suggestion("Check the API token of the selected profile ('packport profile list')"),

        PackportError::TransportError { .. } | PackportError::NetworkError { .. } => {
            ErrorContext::new(error)
                .with_suggestion("Check the profile URL and your network connection, then retry")
        }

        PackportError::ArchiveError { .. } | PackportError::ArchiveEntryMissing { .. } => {
            ErrorContext::new(error).with_suggestion(
                "Make sure the file was produced by 'config export' and was not modified",
            )
        }

        PackportError::ProfileNotFound { name } => ErrorContext::new(error).with_suggestion(
            format!("Create it with 'packport profile add {name} --url <URL> --token <TOKEN>'"),
        ),

        PackportError::FileNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Check the path passed with -f/--file"),

        _ => ErrorContext::new(error),
    }
}

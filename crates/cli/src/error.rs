//! CLI error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// One or more definition files contain malformed lines.
    ///
    /// Each offending line has already been reported.
    #[error("{count} malformed line(s) found")]
    Invalid { count: usize },

    /// A definition file named on the command line does not exist.
    #[error("whitelist file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// The queried signature is not covered by the configured whitelist.
    #[error("not whitelisted: {signature}")]
    NotCovered { signature: String },

    /// Configuration is invalid or could not be read.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred in the sandbox layer.
    #[error(transparent)]
    Sandbox(#[from] sandbox::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

//! Sandbox error types.

use thiserror::Error;

/// Sandbox errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A whitelist definition line does not follow the line grammar.
    #[error("malformed signature: {line}")]
    MalformedSignature { line: String },

    /// The call site could not be resolved to any existing member.
    #[error("Scripts not permitted to use {description}")]
    Unclassified { description: String },

    /// The call site was resolved but the whitelist does not permit it.
    ///
    /// `signature` is the canonical whitelist entry that would permit it.
    #[error("Scripts not permitted to use {signature}{}", .info.as_ref().map(|i| format!(" ({i})")).unwrap_or_default())]
    Rejected {
        signature: String,
        info: Option<String>,
    },

    /// A mechanism depending on host-runtime internals is unavailable.
    #[error("unsupported host environment: {0}")]
    UnsupportedHost(String),

    /// The intercepted operation itself failed after being permitted.
    #[error("host error: {0}")]
    Host(String),

    /// An I/O error occurred while reading a whitelist definition.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Builds the rejection for an unresolved call site.
    pub(crate) fn unclassified(description: impl Into<String>) -> Self {
        Self::Unclassified {
            description: format!("unclassified {}", description.into()),
        }
    }

    /// Builds the rejection for a resolved but denied member.
    pub(crate) fn rejected(signature: impl ToString) -> Self {
        Self::Rejected {
            signature: signature.to_string(),
            info: None,
        }
    }

    /// The canonical signature an administrator could approve.
    ///
    /// `None` for anything other than [`Error::Rejected`], in particular for
    /// unclassified call sites, which have no member to approve.
    pub fn signature(&self) -> Option<&str> {
        match self {
            Error::Rejected { signature, .. } => Some(signature),
            _ => None,
        }
    }

    /// Whether this error aborted an operation on access-control grounds.
    pub fn is_access_denial(&self) -> bool {
        matches!(self, Error::Rejected { .. } | Error::Unclassified { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! Error types
//!
//! Translation and parsing failures are synchronous validation errors and are
//! fatal to the call that raised them. Remote failures wrap the underlying
//! HTTP error together with the function name and the verb that failed.

use crate::endpoint::Platform;
use thiserror::Error;

/// Convenience alias used throughout the translation layer
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Verb of a mutating Cloud Functions call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = match self {
            Verb::Create => "create",
            Verb::Update => "update",
            Verb::Delete => "delete",
        };
        f.write_str(verb)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// The endpoint targets a different Cloud Functions generation.
    #[error("trying to build a {expected} CloudFunction from a {found} endpoint")]
    PlatformMismatch { expected: Platform, found: Platform },

    /// New functions may only be deployed with a supported runtime.
    #[error("runtime {0:?} is not supported for new deployments")]
    UnsupportedRuntime(String),

    #[error(
        "invalid pubsub endpoint {function}: \
         expected an eventFilter with 'topic' attribute but found none"
    )]
    MissingPubsubTopic { function: String },

    #[error("malformed function name {0:?}: expected projects/*/locations/*/functions/*")]
    MalformedResourceName(String),

    #[error("invalid memory quantity {0:?}")]
    InvalidQuantity(String),

    #[error("invalid duration {0:?}: expected a whole number of seconds such as \"60s\"")]
    InvalidDuration(String),

    /// A create, update or delete call failed.
    #[error("failed to {verb} function {function}")]
    RemoteOperationFailed {
        verb: Verb,
        function: String,
        /// The server answered 429; callers may retry later.
        rate_limited: bool,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A single-region listing reported its own region as unreachable.
    #[error("Cloud Functions region {0} is unavailable")]
    RegionUnavailable(String),
}

impl Error {
    /// True when the error is a remote failure caused by quota exhaustion
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            Error::RemoteOperationFailed {
                rate_limited: true,
                ..
            }
        )
    }
}

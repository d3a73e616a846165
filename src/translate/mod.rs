//! Endpoint ⇄ CloudFunction translation
//!
//! Both directions are pure functions of their inputs. Conditions that do not
//! stop a translation (a retry policy that cannot be expressed, a deprecated
//! runtime on an existing function) are returned as [`Diagnostic`]s next to
//! the value and logged through `tracing`.
//!
//! # Module Structure
//!
//! - [`trigger`] - Maps endpoint triggers onto `eventTrigger` or sentinel labels
//! - [`to_function`] - Builds a write-ready `CloudFunction` from an endpoint
//! - [`to_endpoint`] - Reconstructs an endpoint from an observed `CloudFunction`
//! - [`update_mask`] - Field paths for partial updates

pub mod to_endpoint;
pub mod to_function;
pub mod trigger;
pub mod update_mask;

pub use to_endpoint::endpoint_from_function;
pub use to_function::function_from_endpoint;
pub use update_mask::{update_mask, update_mask_param};

/// Non-fatal condition observed during a translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Event retry policies cannot be set on v2 functions and were dropped
    RetryDropped { function: String },
    /// The observed function uses a runtime new deployments may not use
    DeprecatedRuntime { function: String, runtime: String },
    /// The observed function uses a runtime this crate does not know
    UnknownRuntime { function: String, runtime: String },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::RetryDropped { function } => {
                write!(f, "Cannot set a retry policy on Cloud Function {}", function)
            }
            Diagnostic::DeprecatedRuntime { function, runtime } => {
                write!(f, "Cloud Function {} has a deprecated runtime {}", function, runtime)
            }
            Diagnostic::UnknownRuntime { function, runtime } => {
                write!(f, "Cloud Function {} has an unrecognized runtime {}", function, runtime)
            }
        }
    }
}

/// A translated value together with the diagnostics raised producing it
#[derive(Debug, Clone, PartialEq)]
pub struct Translated<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Translated<T> {
    pub fn into_inner(self) -> T {
        self.value
    }
}

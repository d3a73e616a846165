//! Translation between function endpoints and Cloud Functions v2 resources
//!
//! - [`endpoint`] - Vendor-neutral endpoint model
//! - [`gcp`] - Cloud Functions v2 resource types and API client
//! - [`translate`] - Endpoint ⇄ CloudFunction translation and update masks
//! - [`proto`] - Presence-aware field projection helpers
//! - [`quantity`] - Memory quantity and duration strings

pub mod config;
pub mod endpoint;
pub mod error;
pub mod gcp;
pub mod proto;
pub mod quantity;
pub mod translate;

pub use endpoint::{Endpoint, Platform, Trigger};
pub use error::{Error, Result};
pub use gcp::cloudfunctionsv2::{CloudFunction, StorageSource};
pub use translate::{
    endpoint_from_function, function_from_endpoint, update_mask, Diagnostic, Translated,
};

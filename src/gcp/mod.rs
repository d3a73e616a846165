//! Cloud Functions API interaction module
//!
//! # Module Structure
//!
//! - [`auth`] - Access tokens and gcloud defaults
//! - [`client`] - Explicitly constructed Cloud Functions v2 client
//! - [`cloudfunctionsv2`] - REST resource types
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use gcfbridge::gcp::auth::Auth;
//! use gcfbridge::gcp::client::{ClientConfig, FunctionsClient};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let auth = Auth::application_default().await?;
//!     let client = FunctionsClient::new(&ClientConfig::default(), auth)?;
//!     let functions = client.list_functions("my-project", "us-central1").await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod cloudfunctionsv2;
pub mod http;

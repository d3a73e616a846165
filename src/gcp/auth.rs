//! GCP Authentication
//!
//! Access tokens come from Application Default Credentials (service account
//! keys, workload identity or gcloud user credentials), or from a static
//! token supplied by the caller. Also reads gcloud defaults for project and
//! region.

use anyhow::{Context, Result};
use gcp_auth::TokenProvider;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default scopes for GCP API access
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Assumed token lifetime; gcp_auth does not always expose the expiry
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// ADC credentials with token caching
#[derive(Clone)]
pub struct GcpCredentials {
    provider: Arc<dyn TokenProvider>,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl GcpCredentials {
    pub async fn new() -> Result<Self> {
        let provider = gcp_auth::provider().await.context(
            "Failed to initialize GCP authentication. Run 'gcloud auth application-default login'",
        )?;

        Ok(Self {
            provider,
            token_cache: Arc::new(RwLock::new(None)),
        })
    }

    /// Get an access token, reusing the cached one while it is valid
    pub async fn get_token(&self) -> Result<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let token = self
            .provider
            .token(DEFAULT_SCOPES)
            .await
            .context("Failed to get access token")?;
        let token_str = token.as_str().to_string();

        let mut cache = self.token_cache.write().await;
        *cache = Some(CachedToken {
            token: token_str.clone(),
            expires_at: Instant::now() + DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER,
        });

        Ok(token_str)
    }
}

/// How the Cloud Functions client authenticates its requests
#[derive(Clone)]
pub enum Auth {
    ApplicationDefault(GcpCredentials),
    /// A pre-minted bearer token, e.g. from `gcloud auth print-access-token`
    StaticToken(String),
    /// Send requests without credentials (emulators, tests)
    Anonymous,
}

impl Auth {
    pub async fn application_default() -> Result<Self> {
        Ok(Auth::ApplicationDefault(GcpCredentials::new().await?))
    }

    /// Bearer token for the next request, if any
    pub async fn token(&self) -> Result<Option<String>> {
        match self {
            Auth::ApplicationDefault(credentials) => credentials.get_token().await.map(Some),
            Auth::StaticToken(token) => Ok(Some(token.clone())),
            Auth::Anonymous => Ok(None),
        }
    }
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print tokens
        match self {
            Auth::ApplicationDefault(_) => f.write_str("ApplicationDefault"),
            Auth::StaticToken(_) => f.write_str("StaticToken(..)"),
            Auth::Anonymous => f.write_str("Anonymous"),
        }
    }
}

/// Get the gcloud configuration directory
pub fn get_gcloud_config_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CLOUDSDK_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|p| p.join("gcloud"))
}

/// Validate a GCP project ID format
/// Project IDs must be 6-30 characters, lowercase letters, digits, and hyphens
/// Must start with a letter and cannot end with a hyphen
fn validate_project_id(project: &str) -> bool {
    if project.len() < 6 || project.len() > 30 {
        return false;
    }
    if !project.starts_with(|c: char| c.is_ascii_lowercase()) || project.ends_with('-') {
        return false;
    }
    project
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Region names look like `us-central1` or `europe-west3`
fn validate_region(region: &str) -> bool {
    !region.is_empty()
        && region.len() <= 40
        && region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Finds `key` under `[section]` in an INI-style gcloud properties file
fn find_property(content: &str, section: &str, key: &str) -> Option<String> {
    let header = format!("[{}]", section);
    let mut in_section = false;
    for line in content.lines() {
        let line = line.trim();
        // Security: Skip comments and empty lines
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') {
            in_section = line == header;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((name, value)) = line.split_once('=') {
            if name.trim() == key {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

/// Reads a gcloud property from the active configuration, then the legacy
/// `properties` file
fn read_gcloud_property(section: &str, key: &str) -> Option<String> {
    let config_dir = get_gcloud_config_dir()?;

    if let Ok(active_config) = std::fs::read_to_string(config_dir.join("active_config")) {
        let config_name = active_config.trim();

        // Security: Validate config name to prevent path traversal
        if config_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            let config_path = config_dir
                .join("configurations")
                .join(format!("config_{}", config_name));
            if let Some(value) = std::fs::read_to_string(config_path)
                .ok()
                .and_then(|content| find_property(&content, section, key))
            {
                return Some(value);
            }
        } else {
            tracing::warn!("Invalid characters in active_config name");
        }
    }

    std::fs::read_to_string(config_dir.join("properties"))
        .ok()
        .and_then(|content| find_property(&content, section, key))
}

/// Read the default project from the environment or gcloud configuration
/// Security: Validates project ID format before returning
pub fn get_default_project() -> Option<String> {
    for var in ["CLOUDSDK_CORE_PROJECT", "GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"] {
        if let Ok(project) = std::env::var(var) {
            if validate_project_id(&project) {
                return Some(project);
            }
            tracing::warn!("Invalid project ID format in {}", var);
        }
    }

    read_gcloud_property("core", "project").filter(|p| validate_project_id(p))
}

/// Read the default Cloud Functions region from the environment or gcloud
/// configuration
pub fn get_default_region() -> Option<String> {
    if let Ok(region) = std::env::var("CLOUDSDK_FUNCTIONS_REGION") {
        if validate_region(&region) {
            return Some(region);
        }
        tracing::warn!("Invalid region format in CLOUDSDK_FUNCTIONS_REGION");
    }

    read_gcloud_property("functions", "region").filter(|r| validate_region(r))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_project_id() {
        assert!(validate_project_id("my-project-123"));
        assert!(!validate_project_id("short"));
        assert!(!validate_project_id("1starts-with-digit"));
        assert!(!validate_project_id("ends-with-hyphen-"));
        assert!(!validate_project_id("Upper-Case-Project"));
    }

    #[test]
    fn test_find_property_respects_sections() {
        let content = "\
[core]
account = me@example.com
project = my-project-123

[functions]
; comment
region = europe-west1
";
        assert_eq!(find_property(content, "core", "project").as_deref(), Some("my-project-123"));
        assert_eq!(find_property(content, "functions", "region").as_deref(), Some("europe-west1"));
        assert_eq!(find_property(content, "functions", "project"), None);
        assert_eq!(find_property(content, "compute", "zone"), None);
    }

    #[test]
    fn test_validate_region() {
        assert!(validate_region("us-central1"));
        assert!(!validate_region("../etc"));
        assert!(!validate_region(""));
    }

    #[tokio::test]
    async fn test_static_and_anonymous_tokens() {
        assert_eq!(
            Auth::StaticToken("abc".to_string()).token().await.unwrap().as_deref(),
            Some("abc")
        );
        assert_eq!(Auth::Anonymous.token().await.unwrap(), None);
        assert_eq!(format!("{:?}", Auth::StaticToken("secret".to_string())), "StaticToken(..)");
    }
}

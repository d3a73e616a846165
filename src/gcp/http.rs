//! HTTP utilities for GCP REST API calls

use crate::error::Error;
use anyhow::{Context, Result};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Truncates long responses and drops non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// A non-success HTTP status returned by a GCP API
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("API request failed: {status}")]
pub struct ApiError {
    pub status: StatusCode,
    /// `error.message` from the response body, when present
    pub message: Option<String>,
}

impl ApiError {
    pub fn is_rate_limited(&self) -> bool {
        self.status == StatusCode::TOO_MANY_REQUESTS
    }
}

/// HTTP client wrapper for GCP API calls
#[derive(Clone, Debug)]
pub struct GcpHttpClient {
    client: Client,
}

impl GcpHttpClient {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    pub async fn get(
        &self,
        url: &str,
        token: Option<&str>,
        query: &[(&str, &str)],
    ) -> Result<Value> {
        self.send(Method::GET, url, token, query, None).await
    }

    pub async fn post(
        &self,
        url: &str,
        token: Option<&str>,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value> {
        self.send(Method::POST, url, token, query, body).await
    }

    pub async fn patch(
        &self,
        url: &str,
        token: Option<&str>,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value> {
        self.send(Method::PATCH, url, token, query, body).await
    }

    pub async fn delete(&self, url: &str, token: Option<&str>) -> Result<Value> {
        self.send(Method::DELETE, url, token, &[], None).await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        token: Option<&str>,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value> {
        tracing::debug!("{} {}", method, url);

        let mut request = self.client.request(method, url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response_body));
            let message = serde_json::from_str::<Value>(&response_body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(String::from));
            return Err(ApiError { status, message }.into());
        }

        if response_body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&response_body).context("Failed to parse response JSON")
    }
}

/// Format an error for display
/// Security: Sanitizes error messages to avoid leaking sensitive API details
pub fn format_gcp_error(error: &anyhow::Error) -> String {
    match error.downcast_ref::<Error>() {
        Some(Error::RemoteOperationFailed {
            rate_limited: true,
            verb,
            function,
            ..
        }) => {
            return format!(
                "Quota exceeded while trying to {} {}. Try again later.",
                verb, function
            );
        }
        Some(Error::RemoteOperationFailed { .. }) | None => {}
        // Local validation errors carry no API details
        Some(local) => return local.to_string(),
    }

    let api_error = error.chain().find_map(|cause| cause.downcast_ref::<ApiError>());
    let status = api_error.map(|e| e.status);

    match status {
        Some(StatusCode::FORBIDDEN) => {
            "Permission denied. Check your GCP IAM permissions.".to_string()
        }
        Some(StatusCode::UNAUTHORIZED) => {
            "Authentication failed. Run 'gcloud auth application-default login'.".to_string()
        }
        Some(StatusCode::NOT_FOUND) => "Function not found.".to_string(),
        Some(StatusCode::TOO_MANY_REQUESTS) => {
            "Rate limit exceeded. Please try again later.".to_string()
        }
        // Validation failures explain which field was rejected
        Some(StatusCode::BAD_REQUEST) => match api_error.and_then(|e| e.message.as_deref()) {
            Some(message) => format!("Invalid request: {}", sanitize_for_log(message)),
            None => "Invalid request. Check your parameters.".to_string(),
        },
        Some(StatusCode::CONFLICT) => {
            "Function conflict. It may already exist or be in use.".to_string()
        }
        Some(s) if s.is_server_error() => {
            "Cloud Functions temporarily unavailable. Please try again.".to_string()
        }
        Some(_) => "Request failed. Check your network connection and try again.".to_string(),
        None => {
            // Truncate long error messages and remove potential sensitive data
            let error_str = error.to_string();
            let sanitized = error_str
                .chars()
                .filter(|c| c.is_ascii_graphic() || *c == ' ')
                .take(80)
                .collect::<String>();

            if sanitized.len() < error_str.len() {
                format!("{}...", sanitized)
            } else {
                sanitized
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Verb;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(sanitized.contains("500 bytes total"));
        assert_eq!(sanitize_for_log("a\nb"), "ab");
    }

    #[test]
    fn test_format_api_errors() {
        let forbidden: anyhow::Error = ApiError {
            status: StatusCode::FORBIDDEN,
            message: None,
        }
        .into();
        assert!(format_gcp_error(&forbidden).contains("Permission denied"));

        let wrapped = anyhow::Error::from(ApiError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: Some("backend error".to_string()),
        })
        .context("Failed to list functions");
        assert!(format_gcp_error(&wrapped).contains("temporarily unavailable"));
    }

    #[test]
    fn test_format_bad_request_shows_api_message() {
        let rejected = anyhow::Error::from(ApiError {
            status: StatusCode::BAD_REQUEST,
            message: Some("Invalid value for field 'timeoutSeconds'\n".to_string()),
        })
        .context("Failed to create function");
        assert_eq!(
            format_gcp_error(&rejected),
            "Invalid request: Invalid value for field 'timeoutSeconds'"
        );

        let bare: anyhow::Error = ApiError {
            status: StatusCode::BAD_REQUEST,
            message: None,
        }
        .into();
        assert_eq!(format_gcp_error(&bare), "Invalid request. Check your parameters.");
    }

    #[test]
    fn test_format_quota_failure() {
        let err: anyhow::Error = Error::RemoteOperationFailed {
            verb: Verb::Update,
            function: "projects/p/locations/r/functions/f".to_string(),
            rate_limited: true,
            source: "429".into(),
        }
        .into();
        assert_eq!(
            format_gcp_error(&err),
            "Quota exceeded while trying to update projects/p/locations/r/functions/f. \
             Try again later."
        );
    }

    #[test]
    fn test_format_local_errors_verbatim() {
        let err: anyhow::Error = Error::MissingPubsubTopic {
            function: "projects/my-project/locations/us-central1/functions/onPublish".to_string(),
        }
        .into();
        assert_eq!(format_gcp_error(&err), err.to_string());
    }

    #[test]
    fn test_format_plain_error_is_truncated() {
        let err = anyhow::anyhow!("{}", "y".repeat(100));
        assert_eq!(format_gcp_error(&err), format!("{}...", "y".repeat(80)));
    }
}

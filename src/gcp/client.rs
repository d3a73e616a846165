//! Cloud Functions v2 client
//!
//! An explicitly constructed handle over the `projects.locations.functions`
//! REST collection. Request bodies are always stripped of output-only fields.

use super::auth::Auth;
use super::cloudfunctionsv2::{
    CloudFunction, GenerateUploadUrlResponse, ListFunctionsPage, ListFunctionsResponse, Operation,
    API_VERSION,
};
use super::http::{ApiError, GcpHttpClient};
use crate::error::{Error, Verb};
use crate::translate::update_mask_param;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

pub const DEFAULT_ORIGIN: &str = "https://cloudfunctions.googleapis.com";

/// Location wildcard that lists functions in every region
pub const ALL_REGIONS: &str = "-";

/// Where and how to reach the Cloud Functions API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub origin: String,
    pub api_version: String,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            api_version: API_VERSION.to_string(),
            user_agent: format!("gcfbridge/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Cloud Functions API handle
#[derive(Clone, Debug)]
pub struct FunctionsClient {
    auth: Auth,
    http: GcpHttpClient,
    base: Url,
}

impl FunctionsClient {
    pub fn new(config: &ClientConfig, auth: Auth) -> Result<Self> {
        let origin = Url::parse(&config.origin)
            .with_context(|| format!("Invalid Cloud Functions origin {:?}", config.origin))?;
        let base = origin
            .join(&format!("{}/", config.api_version.trim_matches('/')))
            .context("Invalid API version")?;

        Ok(Self {
            auth,
            http: GcpHttpClient::new(&config.user_agent)?,
            base,
        })
    }

    /// Absolute URL of a resource path such as `projects/p/locations/r/functions`
    pub fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("Invalid resource path {:?}", path))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let token = self.auth.token().await?;
        let value = self
            .http
            .get(self.url(path)?.as_str(), token.as_deref(), query)
            .await?;
        parse(value)
    }

    /// Creates an upload URL and pre-provisions a storage source
    pub async fn generate_upload_url(
        &self,
        project_id: &str,
        location: &str,
    ) -> Result<GenerateUploadUrlResponse> {
        let path = format!(
            "projects/{}/locations/{}/functions:generateUploadUrl",
            project_id, location
        );
        let token = self.auth.token().await?;
        let result = self
            .http
            .post(self.url(&path)?.as_str(), token.as_deref(), &[], None)
            .await
            .and_then(parse);

        if result.is_err() {
            tracing::info!(
                "There was an issue deploying your functions. Verify that your project has a \
                 Google App Engine instance setup at https://console.cloud.google.com/appengine \
                 and try again."
            );
        }
        result
    }

    /// Creates `function`. The API is a POST to the collection that owns the name.
    pub async fn create_function(&self, function: &CloudFunction) -> Result<Operation> {
        let (parent, id) = function
            .parent_and_id()
            .ok_or_else(|| Error::MalformedResourceName(function.name.clone()))?;
        let body = serde_json::to_value(function.without_output_only())?;

        let result = async {
            let token = self.auth.token().await?;
            let url = self.url(&format!("{}/functions", parent))?;
            let value = self
                .http
                .post(url.as_str(), token.as_deref(), &[("functionId", id)], Some(&body))
                .await?;
            parse::<Operation>(value)
        }
        .await;

        result.map_err(|err| remote_failure(Verb::Create, &function.name, err))
    }

    pub async fn get_function(
        &self,
        project_id: &str,
        location: &str,
        function_id: &str,
    ) -> Result<CloudFunction> {
        let name = crate::endpoint::function_name(project_id, location, function_id);
        self.get(&name, &[]).await
    }

    /// Lists the functions of one region. Fails with
    /// [`Error::RegionUnavailable`] when that region cannot be reached.
    pub async fn list_functions(
        &self,
        project_id: &str,
        region: &str,
    ) -> Result<Vec<CloudFunction>> {
        let response = self.list_functions_internal(project_id, region).await?;
        if response.unreachable.iter().any(|r| r == region) {
            return Err(Error::RegionUnavailable(region.to_string()).into());
        }
        Ok(response.functions)
    }

    /// Lists functions in every region; unreachable regions are reported, not fatal
    pub async fn list_all_functions(&self, project_id: &str) -> Result<ListFunctionsResponse> {
        self.list_functions_internal(project_id, ALL_REGIONS).await
    }

    async fn list_functions_internal(
        &self,
        project_id: &str,
        region: &str,
    ) -> Result<ListFunctionsResponse> {
        let path = format!("projects/{}/locations/{}/functions", project_id, region);
        let mut response = ListFunctionsResponse::default();
        let mut page_token: Option<String> = None;

        loop {
            let page: ListFunctionsPage = match page_token.as_deref() {
                Some(token) => self.get(&path, &[("pageToken", token)]).await?,
                None => self.get(&path, &[]).await?,
            };

            response.functions.extend(page.functions);
            for location in page.unreachable {
                if !response.unreachable.contains(&location) {
                    response.unreachable.push(location);
                }
            }

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(
            "Listed {} functions in {}/{} ({} unreachable)",
            response.functions.len(),
            project_id,
            region,
            response.unreachable.len()
        );
        Ok(response)
    }

    /// Patches `function`. Every field set on it is included in the update
    /// mask, so unset fields keep their current value.
    pub async fn update_function(&self, function: &CloudFunction) -> Result<Operation> {
        let body = function.without_output_only();
        let update_mask = update_mask_param(&body)?;
        let body = serde_json::to_value(&body)?;

        let result = async {
            let token = self.auth.token().await?;
            let url = self.url(&function.name)?;
            let value = self
                .http
                .patch(
                    url.as_str(),
                    token.as_deref(),
                    &[("updateMask", update_mask.as_str())],
                    Some(&body),
                )
                .await?;
            parse::<Operation>(value)
        }
        .await;

        result.map_err(|err| remote_failure(Verb::Update, &function.name, err))
    }

    pub async fn delete_function(&self, name: &str) -> Result<Operation> {
        let result = async {
            let token = self.auth.token().await?;
            let value = self.http.delete(self.url(name)?.as_str(), token.as_deref()).await?;
            parse::<Operation>(value)
        }
        .await;

        result.map_err(|err| remote_failure(Verb::Delete, name, err))
    }
}

fn parse<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).context("Unexpected response from Cloud Functions API")
}

/// Wraps a failed mutation, classifying quota exhaustion separately
fn remote_failure(verb: Verb, function: &str, err: anyhow::Error) -> anyhow::Error {
    let api_error = err.downcast_ref::<ApiError>().cloned();
    let rate_limited = api_error.as_ref().is_some_and(ApiError::is_rate_limited);

    if rate_limited {
        tracing::warn!(
            "functions: got \"Quota Exceeded\" error while trying to {} {}",
            verb,
            function
        );
    } else {
        tracing::warn!("functions: failed to {} function {}", verb, function);
    }

    let source: Box<dyn std::error::Error + Send + Sync> = match api_error {
        Some(api_error) => Box::new(api_error),
        None => err.into(),
    };
    Error::RemoteOperationFailed {
        verb,
        function: function.to_string(),
        rate_limited,
        source,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_are_versioned() {
        let client = FunctionsClient::new(&ClientConfig::default(), Auth::Anonymous).unwrap();
        assert_eq!(
            client.url("projects/p/locations/-/functions").unwrap().as_str(),
            "https://cloudfunctions.googleapis.com/v2alpha/projects/p/locations/-/functions"
        );
        assert_eq!(
            client
                .url("projects/p/locations/r/functions:generateUploadUrl")
                .unwrap()
                .as_str(),
            "https://cloudfunctions.googleapis.com/v2alpha/\
             projects/p/locations/r/functions:generateUploadUrl"
        );
    }

    #[test]
    fn test_origin_with_path_prefix() {
        let config = ClientConfig {
            origin: "http://localhost:8080/emulator/".to_string(),
            api_version: "v2".to_string(),
            ..ClientConfig::default()
        };
        let client = FunctionsClient::new(&config, Auth::Anonymous).unwrap();
        assert_eq!(
            client.url("projects/p").unwrap().as_str(),
            "http://localhost:8080/emulator/v2/projects/p"
        );
    }

    #[test]
    fn test_invalid_origin_is_rejected() {
        let config = ClientConfig {
            origin: "not a url".to_string(),
            ..ClientConfig::default()
        };
        assert!(FunctionsClient::new(&config, Auth::Anonymous).is_err());
    }

    #[test]
    fn test_remote_failure_classification() {
        let quota = remote_failure(
            Verb::Create,
            "projects/p/locations/r/functions/f",
            ApiError {
                status: reqwest::StatusCode::TOO_MANY_REQUESTS,
                message: None,
            }
            .into(),
        );
        let err = quota.downcast_ref::<Error>().unwrap();
        assert!(err.is_rate_limited());

        let generic = remote_failure(Verb::Delete, "f", anyhow::anyhow!("connection reset"));
        let err = generic.downcast_ref::<Error>().unwrap();
        assert!(!err.is_rate_limited());
        assert_eq!(err.to_string(), "failed to delete function f");
    }
}

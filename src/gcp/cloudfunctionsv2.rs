//! Cloud Functions v2 resource types
//!
//! Mirrors the REST representation of `projects.locations.functions`.
//! Several nested types carry output-only fields; they are optional here and
//! cleared by [`CloudFunction::without_output_only`] before any write.

use crate::endpoint::{EventFilter, IngressSettings, VpcEgressSettings};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const API_VERSION: &str = "v2alpha";

/// Lifecycle state reported by the service. Passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FunctionState {
    Active,
    Failed,
    Deploying,
    Deleting,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSource {
    pub bucket: String,
    pub object: String,
    pub generation: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSource {
    pub project_id: String,
    pub repo_name: String,
    // oneof revision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invert_regex: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    // oneof source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_source: Option<StorageSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_source: Option<RepoSource>,
}

/// Settings for building a container out of the customer source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    pub runtime: String,
    pub entry_point: String,
    #[serde(default)]
    pub source: Source,
    /// Build-time variables. Always sent empty; service variables live in
    /// [`ServiceConfig::environment_variables`].
    #[serde(default)]
    pub environment_variables: BTreeMap<String, String>,

    /// Output only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    /// Output only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_pool: Option<String>,
}

/// The Cloud Run service that underlies a function
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Output only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Output only. Every v2 function is served over HTTP and has a URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u32>,
    /// Kubernetes-style quantity, e.g. `"256M"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_memory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_variables: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_instance_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_instance_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_connector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_connector_egress_settings: Option<VpcEgressSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_settings: Option<IngressSettings>,
    /// Identity the function runs as. Defaults to the compute service account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTrigger {
    /// Output only. Name of the underlying Eventarc trigger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    /// Defaults to the function's region when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_region: Option<String>,
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_filters: Option<Vec<EventFilter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubsub_topic: Option<String>,
    /// Must hold run.routes.invoke on the target service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_email: Option<String>,
}

impl EventTrigger {
    pub fn new(event_type: &str) -> Self {
        Self {
            trigger: None,
            trigger_region: None,
            event_type: event_type.to_string(),
            event_filters: None,
            pubsub_topic: None,
            service_account_email: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudFunction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub build_config: BuildConfig,
    #[serde(default)]
    pub service_config: ServiceConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_trigger: Option<EventTrigger>,
    /// Output only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<FunctionState>,
    /// Output only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

impl CloudFunction {
    /// Copy with every output-only field cleared, suitable as a request body
    pub fn without_output_only(&self) -> Self {
        let mut function = self.clone();
        function.state = None;
        function.update_time = None;
        function.build_config.build = None;
        function.build_config.worker_pool = None;
        function.service_config.service = None;
        function.service_config.uri = None;
        if let Some(trigger) = function.event_trigger.as_mut() {
            trigger.trigger = None;
        }
        function
    }

    /// Splits the name into its parent collection and function id
    pub fn parent_and_id(&self) -> Option<(&str, &str)> {
        let (parent, id) = self.name.rsplit_once('/')?;
        let parent = parent.strip_suffix("/functions")?;
        Some((parent, id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetadata {
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub verb: Option<String>,
    #[serde(default)]
    pub status_detail: Option<String>,
    #[serde(default)]
    pub cancel_requested: bool,
    #[serde(default)]
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationError {
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: serde_json::Value,
}

/// Long-running operation returned by mutating calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub metadata: Option<OperationMetadata>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<OperationError>,
    #[serde(default)]
    pub response: Option<CloudFunction>,
}

/// One page of a list call
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListFunctionsPage {
    #[serde(default)]
    pub functions: Vec<CloudFunction>,
    #[serde(default)]
    pub unreachable: Vec<String>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// All pages of a list call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListFunctionsResponse {
    pub functions: Vec<CloudFunction>,
    /// Locations that could not be reached, deduplicated across pages
    pub unreachable: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateUploadUrlResponse {
    pub upload_url: String,
    pub storage_source: StorageSource,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn observed() -> CloudFunction {
        serde_json::from_value(json!({
            "name": "projects/project/locations/region/functions/id",
            "buildConfig": {
                "runtime": "nodejs16",
                "entryPoint": "function",
                "source": {
                    "storageSource": {
                        "bucket": "sample",
                        "object": "source.zip",
                        "generation": 42
                    }
                },
                "environmentVariables": {},
                "build": "projects/123/locations/region/builds/abc",
                "workerPool": "pool"
            },
            "serviceConfig": {
                "service": "projects/project/locations/region/services/id",
                "uri": "https://id-nonce-region-project.run.app",
                "timeoutSeconds": 60
            },
            "eventTrigger": {
                "trigger": "projects/project/locations/region/triggers/t",
                "eventType": "google.cloud.storage.object.v1.finalized"
            },
            "state": "ACTIVE",
            "updateTime": "2022-01-05T10:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_deserialize_observed_function() {
        let function = observed();
        assert_eq!(function.state, Some(FunctionState::Active));
        assert!(function.update_time.is_some());
        assert_eq!(function.service_config.timeout_seconds, Some(60));
        assert_eq!(
            function.build_config.source.storage_source.as_ref().map(|s| s.generation),
            Some(42)
        );
    }

    #[test]
    fn test_unknown_state_is_tolerated() {
        let state: FunctionState = serde_json::from_value(json!("SOMETHING_NEW")).unwrap();
        assert_eq!(state, FunctionState::Unknown);
    }

    #[test]
    fn test_without_output_only() {
        let stripped = observed().without_output_only();
        assert_eq!(stripped.state, None);
        assert_eq!(stripped.update_time, None);
        assert_eq!(stripped.build_config.build, None);
        assert_eq!(stripped.build_config.worker_pool, None);
        assert_eq!(stripped.service_config.service, None);
        assert_eq!(stripped.service_config.uri, None);
        assert_eq!(stripped.event_trigger.as_ref().unwrap().trigger, None);
        assert_eq!(stripped.service_config.timeout_seconds, Some(60));

        let value = serde_json::to_value(&stripped).unwrap();
        assert!(value.get("state").is_none());
        assert!(value["serviceConfig"].get("uri").is_none());
    }

    #[test]
    fn test_parent_and_id() {
        let function = observed();
        assert_eq!(
            function.parent_and_id(),
            Some(("projects/project/locations/region", "id"))
        );
    }
}

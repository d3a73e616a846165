//! Function endpoints
//!
//! The vendor-neutral description of a deployed function: identity, runtime,
//! exactly one trigger and the service settings an orchestrator manages.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cloud Functions generation an endpoint is deployed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Gcfv1,
    Gcfv2,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Gcfv1 => f.write_str("gcfv1"),
            Platform::Gcfv2 => f.write_str("gcfv2"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VpcEgressSettings {
    PrivateRangesOnly,
    AllTraffic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IngressSettings {
    AllowAll,
    AllowInternalOnly,
    AllowInternalAndGclb,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpcSettings {
    pub connector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub egress_settings: Option<VpcEgressSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    pub attribute: String,
    pub value: String,
}

impl EventFilter {
    pub fn new(attribute: &str, value: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTrigger {
    pub event_type: String,
    #[serde(default)]
    pub event_filters: Vec<EventFilter>,
    #[serde(default)]
    pub retry: bool,
    /// Region of the event source, when it differs from the function's
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// What invokes a function. Serialized as a single `<kind>Trigger` key;
/// documents naming no trigger or several are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TriggerKeys", into = "TriggerKeys")]
pub enum Trigger {
    Https {},
    Event(EventTrigger),
    Schedule {},
    TaskQueue {},
    Callable {},
}

/// Body of the triggers that carry no settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct NoSettings {}

/// Wire shape of [`Trigger`]: one optional key per trigger kind
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TriggerKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    https_trigger: Option<NoSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event_trigger: Option<EventTrigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schedule_trigger: Option<NoSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    task_queue_trigger: Option<NoSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    callable_trigger: Option<NoSettings>,
}

impl TryFrom<TriggerKeys> for Trigger {
    type Error = String;

    fn try_from(keys: TriggerKeys) -> Result<Self, Self::Error> {
        let mut triggers = Vec::new();
        if keys.https_trigger.is_some() {
            triggers.push(Trigger::Https {});
        }
        if let Some(event) = keys.event_trigger {
            triggers.push(Trigger::Event(event));
        }
        if keys.schedule_trigger.is_some() {
            triggers.push(Trigger::Schedule {});
        }
        if keys.task_queue_trigger.is_some() {
            triggers.push(Trigger::TaskQueue {});
        }
        if keys.callable_trigger.is_some() {
            triggers.push(Trigger::Callable {});
        }

        match triggers.len() {
            0 => Err("endpoint has no trigger: expected one of httpsTrigger, eventTrigger, \
                      scheduleTrigger, taskQueueTrigger or callableTrigger"
                .to_string()),
            1 => Ok(triggers.remove(0)),
            _ => Err(format!(
                "endpoint has {} triggers ({}); expected exactly one",
                triggers.len(),
                triggers.iter().map(Trigger::kind).collect::<Vec<_>>().join(", ")
            )),
        }
    }
}

impl From<Trigger> for TriggerKeys {
    fn from(trigger: Trigger) -> Self {
        let mut keys = TriggerKeys::default();
        match trigger {
            Trigger::Https {} => keys.https_trigger = Some(NoSettings {}),
            Trigger::Event(event) => keys.event_trigger = Some(event),
            Trigger::Schedule {} => keys.schedule_trigger = Some(NoSettings {}),
            Trigger::TaskQueue {} => keys.task_queue_trigger = Some(NoSettings {}),
            Trigger::Callable {} => keys.callable_trigger = Some(NoSettings {}),
        }
        keys
    }
}

impl Trigger {
    /// Short name used in logs and CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            Trigger::Https {} => "https",
            Trigger::Event(_) => "event",
            Trigger::Schedule {} => "schedule",
            Trigger::TaskQueue {} => "taskQueue",
            Trigger::Callable {} => "callable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub platform: Platform,
    pub project: String,
    pub region: String,
    pub id: String,
    pub runtime: String,
    pub entry_point: String,

    #[serde(flatten)]
    pub trigger: Trigger,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_memory_mb: Option<f64>,
    /// Proto duration such as `"60s"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_instances: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_instances: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc: Option<VpcSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_settings: Option<IngressSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_email: Option<String>,
    /// An empty map is sent as is and clears every remote variable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_variables: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    /// Output only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl Endpoint {
    /// Minimal endpoint with no optional settings
    pub fn new(
        platform: Platform,
        project: &str,
        region: &str,
        id: &str,
        trigger: Trigger,
    ) -> Self {
        Self {
            platform,
            project: project.to_string(),
            region: region.to_string(),
            id: id.to_string(),
            runtime: runtimes::LATEST.to_string(),
            entry_point: id.to_string(),
            trigger,
            available_memory_mb: None,
            timeout: None,
            min_instances: None,
            max_instances: None,
            vpc: None,
            ingress_settings: None,
            service_account_email: None,
            environment_variables: None,
            labels: None,
            uri: None,
        }
    }

    /// Fully qualified function name
    pub fn function_name(&self) -> String {
        function_name(&self.project, &self.region, &self.id)
    }

    /// Looks up the first event filter with `attribute`
    pub fn find_event_filter(&self, attribute: &str) -> Option<&EventFilter> {
        match &self.trigger {
            Trigger::Event(trigger) => {
                trigger.event_filters.iter().find(|f| f.attribute == attribute)
            }
            _ => None,
        }
    }
}

pub fn function_name(project: &str, region: &str, id: &str) -> String {
    format!("projects/{}/locations/{}/functions/{}", project, region, id)
}

/// Runtimes known to Cloud Functions
pub mod runtimes {
    /// Runtimes new deployments may use
    pub const SUPPORTED: &[&str] = &["nodejs10", "nodejs12", "nodejs14", "nodejs16"];

    /// Runtimes that may still be observed on existing functions
    pub const DEPRECATED: &[&str] = &["nodejs6", "nodejs8"];

    pub const LATEST: &str = "nodejs16";

    pub fn is_valid_runtime(runtime: &str) -> bool {
        SUPPORTED.contains(&runtime)
    }

    pub fn is_deprecated_runtime(runtime: &str) -> bool {
        DEPRECATED.contains(&runtime)
    }
}

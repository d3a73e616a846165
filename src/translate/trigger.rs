//! Trigger classification
//!
//! HTTPS functions are the default encoding and event functions map onto the
//! native `eventTrigger` block. Schedule, task queue and callable functions
//! have no native field; they are marked with a reserved label instead.

use super::Diagnostic;
use crate::endpoint::{Endpoint, EventFilter, EventTrigger, Trigger};
use crate::error::{Error, Result};
use crate::gcp::cloudfunctionsv2::{self, CloudFunction};
use crate::proto::copy_if_present;

pub const PUBSUB_PUBLISH_EVENT: &str = "google.cloud.pubsub.topic.v1.messagePublished";

/// Filter attribute carried in the dedicated `pubsubTopic` field
pub const TOPIC_ATTRIBUTE: &str = "topic";

pub const SCHEDULED_LABEL: &str = "deployment-scheduled";
pub const TASK_QUEUE_LABEL: &str = "deployment-taskqueue";
pub const CALLABLE_LABEL: &str = "deployment-callable";

/// Value of every sentinel label
pub const SENTINEL_VALUE: &str = "true";

/// Event functions must see events as CloudEvents rather than the legacy
/// format the functions framework downcasts to by default.
pub const SIGNATURE_TYPE_ENV: &str = "FUNCTION_SIGNATURE_TYPE";
pub const CLOUDEVENT_SIGNATURE: &str = "cloudevent";

/// Where a trigger lives on a CloudFunction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEncoding {
    /// Plain HTTPS function: no event trigger, no sentinel
    Default,
    EventTrigger(cloudfunctionsv2::EventTrigger),
    SentinelLabel(&'static str),
}

/// The sentinel label key for triggers encoded through labels
pub fn sentinel_label(trigger: &Trigger) -> Option<&'static str> {
    match trigger {
        Trigger::Schedule {} => Some(SCHEDULED_LABEL),
        Trigger::TaskQueue {} => Some(TASK_QUEUE_LABEL),
        Trigger::Callable {} => Some(CALLABLE_LABEL),
        Trigger::Https {} | Trigger::Event(_) => None,
    }
}

/// Encodes the trigger of `endpoint`.
///
/// Fails with [`Error::MissingPubsubTopic`] when a pubsub event trigger has
/// no `topic` filter.
pub fn encode_trigger(
    endpoint: &Endpoint,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<TriggerEncoding> {
    let event = match &endpoint.trigger {
        Trigger::Event(event) => event,
        other => {
            return Ok(sentinel_label(other)
                .map(TriggerEncoding::SentinelLabel)
                .unwrap_or(TriggerEncoding::Default))
        }
    };

    let mut encoded = cloudfunctionsv2::EventTrigger::new(&event.event_type);
    let filters: Vec<EventFilter> = if event.event_type == PUBSUB_PUBLISH_EVENT {
        let topic = endpoint
            .find_event_filter(TOPIC_ATTRIBUTE)
            .ok_or_else(|| Error::MissingPubsubTopic {
                function: endpoint.function_name(),
            })?;
        encoded.pubsub_topic = Some(topic.value.clone());
        event
            .event_filters
            .iter()
            .filter(|f| f.attribute != TOPIC_ATTRIBUTE)
            .cloned()
            .collect()
    } else {
        event.event_filters.clone()
    };
    if !filters.is_empty() {
        encoded.event_filters = Some(filters);
    }
    copy_if_present(&mut encoded.trigger_region, &event.region);

    if event.retry {
        let diagnostic = Diagnostic::RetryDropped {
            function: endpoint.function_name(),
        };
        tracing::warn!("{}", diagnostic);
        diagnostics.push(diagnostic);
    }

    Ok(TriggerEncoding::EventTrigger(encoded))
}

/// Reconstructs the trigger of an observed function. Sentinel labels win
/// over `eventTrigger`; with neither the function is HTTPS.
pub fn decode_trigger(function: &CloudFunction) -> Trigger {
    let has_sentinel = |key: &str| {
        function
            .labels
            .as_ref()
            .and_then(|labels| labels.get(key))
            .is_some_and(|value| value == SENTINEL_VALUE)
    };

    if has_sentinel(SCHEDULED_LABEL) {
        return Trigger::Schedule {};
    }
    if has_sentinel(TASK_QUEUE_LABEL) {
        return Trigger::TaskQueue {};
    }
    if has_sentinel(CALLABLE_LABEL) {
        return Trigger::Callable {};
    }

    let Some(event) = &function.event_trigger else {
        return Trigger::Https {};
    };

    let mut event_filters = Vec::new();
    // An empty topic reads as unset
    if let Some(topic) = event.pubsub_topic.as_deref().filter(|topic| !topic.is_empty()) {
        event_filters.push(EventFilter::new(TOPIC_ATTRIBUTE, topic));
    }
    event_filters.extend(event.event_filters.iter().flatten().cloned());

    let mut trigger = EventTrigger {
        event_type: event.event_type.clone(),
        event_filters,
        // Not representable on v2 functions
        retry: false,
        region: None,
    };
    copy_if_present(&mut trigger.region, &event.trigger_region);
    Trigger::Event(trigger)
}

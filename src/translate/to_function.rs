//! Endpoint → CloudFunction

use super::trigger::{
    self, TriggerEncoding, CLOUDEVENT_SIGNATURE, SENTINEL_VALUE, SIGNATURE_TYPE_ENV,
};
use super::{Diagnostic, Translated};
use crate::endpoint::{runtimes, Endpoint, Platform};
use crate::error::{Error, Result};
use crate::gcp::cloudfunctionsv2::{
    BuildConfig, CloudFunction, ServiceConfig, Source, StorageSource,
};
use crate::proto::{copy_if_present, rename_if_present, try_rename_if_present};
use crate::quantity::{format_megabytes, seconds_from_duration};
use std::collections::BTreeMap;

/// Builds the request body for creating or updating the function described by
/// `endpoint`, deployed from the uploaded `source`.
///
/// # Errors
///
/// - [`Error::PlatformMismatch`] unless the endpoint targets gcfv2
/// - [`Error::UnsupportedRuntime`] for runtimes new deployments may not use
/// - [`Error::MissingPubsubTopic`] for pubsub triggers without a topic filter
/// - [`Error::InvalidDuration`] when the timeout is not `"<n>s"`
pub fn function_from_endpoint(
    endpoint: &Endpoint,
    source: StorageSource,
) -> Result<Translated<CloudFunction>> {
    if endpoint.platform != Platform::Gcfv2 {
        return Err(Error::PlatformMismatch {
            expected: Platform::Gcfv2,
            found: endpoint.platform,
        });
    }
    if !runtimes::is_valid_runtime(&endpoint.runtime) {
        return Err(Error::UnsupportedRuntime(endpoint.runtime.clone()));
    }

    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    let mut function = CloudFunction {
        name: endpoint.function_name(),
        description: None,
        build_config: BuildConfig {
            runtime: endpoint.runtime.clone(),
            entry_point: endpoint.entry_point.clone(),
            source: Source {
                storage_source: Some(source),
                repo_source: None,
            },
            // Build environment variables are not used
            environment_variables: BTreeMap::new(),
            build: None,
            worker_pool: None,
        },
        service_config: ServiceConfig::default(),
        event_trigger: None,
        state: None,
        update_time: None,
        labels: None,
    };

    // An explicitly empty map is kept so an update can clear the remote one
    copy_if_present(&mut function.labels, &endpoint.labels);

    let service = &mut function.service_config;
    copy_if_present(&mut service.environment_variables, &endpoint.environment_variables);
    copy_if_present(&mut service.service_account_email, &endpoint.service_account_email);
    copy_if_present(&mut service.ingress_settings, &endpoint.ingress_settings);
    rename_if_present(&mut service.available_memory, &endpoint.available_memory_mb, |mb| {
        format_megabytes(*mb)
    });
    try_rename_if_present(&mut service.timeout_seconds, &endpoint.timeout, |timeout| {
        seconds_from_duration(timeout)
    })?;
    copy_if_present(&mut service.min_instance_count, &endpoint.min_instances);
    copy_if_present(&mut service.max_instance_count, &endpoint.max_instances);
    if let Some(vpc) = &endpoint.vpc {
        service.vpc_connector = Some(vpc.connector.clone());
        copy_if_present(&mut service.vpc_connector_egress_settings, &vpc.egress_settings);
    }

    match trigger::encode_trigger(endpoint, &mut diagnostics)? {
        TriggerEncoding::Default => {}
        TriggerEncoding::EventTrigger(event_trigger) => {
            function.event_trigger = Some(event_trigger);
            // Merged last so user variables survive and cannot override it
            function
                .service_config
                .environment_variables
                .get_or_insert_with(BTreeMap::new)
                .insert(SIGNATURE_TYPE_ENV.to_string(), CLOUDEVENT_SIGNATURE.to_string());
        }
        TriggerEncoding::SentinelLabel(key) => {
            function
                .labels
                .get_or_insert_with(BTreeMap::new)
                .insert(key.to_string(), SENTINEL_VALUE.to_string());
        }
    }

    tracing::debug!(
        "Built CloudFunction {} from {} endpoint",
        function.name,
        endpoint.trigger.kind()
    );

    Ok(Translated {
        value: function,
        diagnostics,
    })
}

//! CloudFunction → Endpoint

use super::trigger::{self, CLOUDEVENT_SIGNATURE, SENTINEL_VALUE, SIGNATURE_TYPE_ENV};
use super::{Diagnostic, Translated};
use crate::endpoint::{runtimes, Endpoint, Platform, Trigger, VpcSettings};
use crate::error::{Error, Result};
use crate::gcp::cloudfunctionsv2::CloudFunction;
use crate::proto::{copy_if_present, rename_if_present, try_rename_if_present};
use crate::quantity::{duration_from_seconds, megabytes};
use std::collections::BTreeMap;

/// Splits `projects/{project}/locations/{region}/functions/{id}`
pub fn split_function_name(name: &str) -> Result<(&str, &str, &str)> {
    let segments: Vec<&str> = name.split('/').collect();
    match segments.as_slice() {
        ["projects", project, "locations", region, "functions", id]
            if !project.is_empty() && !region.is_empty() && !id.is_empty() =>
        {
            Ok((*project, *region, *id))
        }
        _ => Err(Error::MalformedResourceName(name.to_string())),
    }
}

/// Reconstructs the endpoint an observed function was deployed from.
///
/// Output-only fields are kept (`uri`). The sentinel label that encodes the
/// trigger and the injected `FUNCTION_SIGNATURE_TYPE` variable are removed so
/// the result compares equal to the endpoint that produced the function.
/// Legacy runtimes are accepted and reported as a diagnostic.
pub fn endpoint_from_function(function: &CloudFunction) -> Result<Translated<Endpoint>> {
    let (project, region, id) = split_function_name(&function.name)?;
    let mut diagnostics = Vec::new();

    let runtime = &function.build_config.runtime;
    if !runtimes::is_valid_runtime(runtime) {
        tracing::debug!(
            "GCFv2 function has an unsupported runtime: {}",
            serde_json::to_string_pretty(function).unwrap_or_default()
        );
        let name = function.name.clone();
        diagnostics.push(if runtimes::is_deprecated_runtime(runtime) {
            Diagnostic::DeprecatedRuntime {
                function: name,
                runtime: runtime.clone(),
            }
        } else {
            Diagnostic::UnknownRuntime {
                function: name,
                runtime: runtime.clone(),
            }
        });
    }

    let mut endpoint = Endpoint::new(
        Platform::Gcfv2,
        project,
        region,
        id,
        trigger::decode_trigger(function),
    );
    endpoint.runtime = function.build_config.runtime.clone();
    endpoint.entry_point = function.build_config.entry_point.clone();
    endpoint.uri = function.service_config.uri.clone();

    let service = &function.service_config;
    copy_if_present(&mut endpoint.service_account_email, &service.service_account_email);
    copy_if_present(&mut endpoint.ingress_settings, &service.ingress_settings);
    copy_if_present(&mut endpoint.environment_variables, &service.environment_variables);
    try_rename_if_present(&mut endpoint.available_memory_mb, &service.available_memory, |memory| {
        megabytes(memory)
    })?;
    rename_if_present(&mut endpoint.timeout, &service.timeout_seconds, |seconds| {
        duration_from_seconds(*seconds)
    });
    copy_if_present(&mut endpoint.min_instances, &service.min_instance_count);
    copy_if_present(&mut endpoint.max_instances, &service.max_instance_count);
    copy_if_present(&mut endpoint.labels, &function.labels);
    if let Some(connector) = &service.vpc_connector {
        endpoint.vpc = Some(VpcSettings {
            connector: connector.clone(),
            egress_settings: service.vpc_connector_egress_settings,
        });
    }

    if let Some(key) = trigger::sentinel_label(&endpoint.trigger) {
        remove_injected(&mut endpoint.labels, key, SENTINEL_VALUE);
    }
    if matches!(endpoint.trigger, Trigger::Event(_)) {
        remove_injected(
            &mut endpoint.environment_variables,
            SIGNATURE_TYPE_ENV,
            CLOUDEVENT_SIGNATURE,
        );
    }

    Ok(Translated {
        value: endpoint,
        diagnostics,
    })
}

/// Drops an entry the translation injected. A map left holding nothing else
/// reads as absent, the way it was before the injection.
fn remove_injected(map: &mut Option<BTreeMap<String, String>>, key: &str, value: &str) {
    let Some(entries) = map.as_mut() else {
        return;
    };
    if entries.get(key).is_some_and(|v| v == value) {
        entries.remove(key);
        if entries.is_empty() {
            *map = None;
        }
    }
}

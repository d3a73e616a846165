//! Update masks for partial updates

use crate::gcp::cloudfunctionsv2::CloudFunction;
use crate::proto::field_masks_of;

/// Fields whose keys are user defined. A masked map is replaced wholesale,
/// so these are never recursed into.
pub const OPAQUE_FIELDS: &[&str] = &["labels", "serviceConfig.environmentVariables"];

/// Field paths a PATCH of `function` may modify, in declaration order.
/// Output-only fields are stripped first.
pub fn update_mask(function: &CloudFunction) -> serde_json::Result<Vec<String>> {
    field_masks_of(&function.without_output_only(), OPAQUE_FIELDS)
}

/// The `updateMask` query parameter value
pub fn update_mask_param(function: &CloudFunction) -> serde_json::Result<String> {
    Ok(update_mask(function)?.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcp::cloudfunctionsv2::FunctionState;
    use serde_json::json;

    fn function() -> CloudFunction {
        serde_json::from_value(json!({
            "name": "projects/p/locations/r/functions/f",
            "buildConfig": {
                "runtime": "nodejs16",
                "entryPoint": "f",
                "source": {
                    "storageSource": { "bucket": "b", "object": "o.zip", "generation": 1 }
                },
                "environmentVariables": {}
            },
            "serviceConfig": {
                "timeoutSeconds": 60,
                "environmentVariables": { "FOO": "bar", "FUNCTION_SIGNATURE_TYPE": "cloudevent" }
            },
            "labels": { "foo": "bar" }
        }))
        .unwrap()
    }

    #[test]
    fn test_update_mask_treats_maps_as_leaves() {
        assert_eq!(
            update_mask(&function()).unwrap(),
            vec![
                "name",
                "buildConfig.runtime",
                "buildConfig.entryPoint",
                "buildConfig.source.storageSource.bucket",
                "buildConfig.source.storageSource.object",
                "buildConfig.source.storageSource.generation",
                "buildConfig.environmentVariables",
                "serviceConfig.timeoutSeconds",
                "serviceConfig.environmentVariables",
                "labels",
            ]
        );
    }

    #[test]
    fn test_update_mask_skips_output_only_fields() {
        let mut observed = function();
        observed.state = Some(FunctionState::Active);
        observed.service_config.uri = Some("https://f.run.app".to_string());
        observed.build_config.build = Some("builds/1".to_string());

        let mask = update_mask(&observed).unwrap();
        assert!(!mask.iter().any(|path| path == "state"
            || path == "serviceConfig.uri"
            || path == "buildConfig.build"));
        assert_eq!(mask, update_mask(&function()).unwrap());
    }

    #[test]
    fn test_update_mask_param_is_comma_joined() {
        let param = update_mask_param(&function()).unwrap();
        assert!(param.starts_with("name,buildConfig.runtime,"));
        assert!(param.ends_with(",serviceConfig.environmentVariables,labels"));
    }
}

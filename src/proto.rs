//! Field projection helpers
//!
//! Presence-aware copies between optional fields and update-mask enumeration
//! over serialized resources. Absent source fields never clear a target.

use serde::Serialize;
use serde_json::Value;

/// Copies `source` into `target` when it is set
pub fn copy_if_present<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if let Some(value) = source {
        *target = Some(value.clone());
    }
}

/// Sets `target` to `transform(source)` when `source` is set.
///
/// Use `Clone::clone` (or `|v| *v` for `Copy` types) as the transform for a
/// plain rename.
pub fn rename_if_present<S, T>(
    target: &mut Option<T>,
    source: &Option<S>,
    transform: impl FnOnce(&S) -> T,
) {
    if let Some(value) = source {
        *target = Some(transform(value));
    }
}

/// Like [`rename_if_present`] but with a fallible transform.
///
/// On error `target` is left untouched and the error is returned.
pub fn try_rename_if_present<S, T, E>(
    target: &mut Option<T>,
    source: &Option<S>,
    transform: impl FnOnce(&S) -> Result<T, E>,
) -> Result<(), E> {
    if let Some(value) = source {
        *target = Some(transform(value)?);
    }
    Ok(())
}

/// Enumerates every defined field path in `object` as dotted paths.
///
/// Objects are descended into; scalars, arrays, `null` and empty objects are
/// leaves. Paths listed in `opaque` are emitted as a single leaf even when
/// they hold an object, which is how user-keyed maps are masked: the API
/// replaces a masked map wholesale. Order follows the object's key order.
pub fn field_masks(object: &Value, opaque: &[&str]) -> Vec<String> {
    let mut masks = Vec::new();
    if let Value::Object(map) = object {
        for (key, value) in map {
            collect_masks(key.clone(), value, opaque, &mut masks);
        }
    }
    masks
}

fn collect_masks(path: String, cursor: &Value, opaque: &[&str], masks: &mut Vec<String>) {
    if opaque.contains(&path.as_str()) {
        masks.push(path);
        return;
    }
    match cursor {
        Value::Object(map) if !map.is_empty() => {
            for (key, value) in map {
                collect_masks(format!("{}.{}", path, key), value, opaque, masks);
            }
        }
        _ => masks.push(path),
    }
}

/// Serializes `object` and enumerates its field paths with [`field_masks`]
pub fn field_masks_of<T: Serialize>(
    object: &T,
    opaque: &[&str],
) -> serde_json::Result<Vec<String>> {
    let value = serde_json::to_value(object)?;
    Ok(field_masks(&value, opaque))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_copy_if_present_never_clears() {
        let mut target = Some("kept".to_string());
        copy_if_present(&mut target, &None);
        assert_eq!(target.as_deref(), Some("kept"));

        copy_if_present(&mut target, &Some("new".to_string()));
        assert_eq!(target.as_deref(), Some("new"));
    }

    #[test]
    fn test_rename_if_present_applies_transform() {
        let mut timeout: Option<String> = None;
        rename_if_present(&mut timeout, &Some(15u32), |s| format!("{}s", s));
        assert_eq!(timeout.as_deref(), Some("15s"));

        let mut untouched: Option<u32> = Some(1);
        rename_if_present(&mut untouched, &None::<u32>, |v| *v);
        assert_eq!(untouched, Some(1));
    }

    #[test]
    fn test_try_rename_leaves_target_on_error() {
        let mut target = Some(1u32);
        let result = try_rename_if_present(&mut target, &Some("x"), |s| s.parse::<u32>());
        assert!(result.is_err());
        assert_eq!(target, Some(1));
    }

    #[test]
    fn test_field_masks_opaque_map() {
        let object = json!({
            "timeoutSeconds": 60,
            "labels": { "foo": "bar" },
        });
        assert_eq!(field_masks(&object, &["labels"]), vec!["timeoutSeconds", "labels"]);
        assert_eq!(field_masks(&object, &[]), vec!["timeoutSeconds", "labels.foo"]);
    }

    #[test]
    fn test_field_masks_nested_and_leaves() {
        let object = json!({
            "name": "projects/p/locations/r/functions/f",
            "buildConfig": {
                "runtime": "nodejs16",
                "environmentVariables": {},
                "source": { "storageSource": { "bucket": "b", "generation": 42 } }
            },
            "eventTrigger": {
                "eventFilters": [{ "attribute": "a", "value": "b" }],
                "pubsubTopic": null
            }
        });
        assert_eq!(
            field_masks(&object, &[]),
            vec![
                "name",
                "buildConfig.runtime",
                "buildConfig.environmentVariables",
                "buildConfig.source.storageSource.bucket",
                "buildConfig.source.storageSource.generation",
                "eventTrigger.eventFilters",
                "eventTrigger.pubsubTopic",
            ]
        );
    }

    #[test]
    fn test_field_masks_nested_opaque_path() {
        let object = json!({
            "serviceConfig": {
                "environmentVariables": { "A": "1", "B": "2" },
                "minInstanceCount": 1
            }
        });
        assert_eq!(
            field_masks(&object, &["serviceConfig.environmentVariables"]),
            vec!["serviceConfig.environmentVariables", "serviceConfig.minInstanceCount"]
        );
    }

    #[test]
    fn test_field_masks_empty_object() {
        assert!(field_masks(&json!({}), &[]).is_empty());
        assert!(field_masks(&json!("scalar"), &[]).is_empty());
    }
}

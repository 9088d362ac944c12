use crate::config::value::{ConfigMap, ConfigValue};

/// Right-biased deep default fill.
///
/// Every key of `source` that `target` lacks is copied in. When both sides hold
/// an object under the same key the two objects are filled recursively; any
/// other value already present in `target` (arrays included) is kept as is.
pub fn defaults_deep(target: &mut ConfigMap, source: &ConfigMap) {
    for (key, value) in source {
        if let Some(existing) = target.get_mut(key) {
            if let (ConfigValue::Object(existing), ConfigValue::Object(incoming)) =
                (existing, value)
            {
                defaults_deep(existing, incoming);
            }
        } else {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// Fold several sources, highest precedence first, into a fresh map
pub fn defaults_deep_all<'a, I>(sources: I) -> ConfigMap
where
    I: IntoIterator<Item = &'a ConfigMap>,
{
    let mut merged = ConfigMap::new();
    for source in sources {
        defaults_deep(&mut merged, source);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: serde_json::Value) -> ConfigMap {
        ConfigValue::from(value).into_object().unwrap()
    }

    #[test]
    fn test_higher_precedence_wins() {
        let mut target = map(json!({ "mode": "fast" }));
        defaults_deep(&mut target, &map(json!({ "mode": "slow", "level": 2 })));

        assert_eq!(target, map(json!({ "mode": "fast", "level": 2 })));
    }

    #[test]
    fn test_nested_objects_merge_key_by_key() {
        let mut target = map(json!({ "options": { "base": "src" } }));
        defaults_deep(
            &mut target,
            &map(json!({ "options": { "base": "lib", "read": false } })),
        );

        assert_eq!(
            target,
            map(json!({ "options": { "base": "src", "read": false } }))
        );
    }

    #[test]
    fn test_arrays_are_replaced_never_mixed() {
        let mut target = map(json!({ "globs": ["a/**"] }));
        defaults_deep(&mut target, &map(json!({ "globs": ["b/**", "c/**"] })));
        assert_eq!(target, map(json!({ "globs": ["a/**"] })));

        // a string must not be spread into an array slot
        let mut target = map(json!({ "globs": ["a/**"] }));
        defaults_deep(&mut target, &map(json!({ "globs": "abc" })));
        assert_eq!(target, map(json!({ "globs": ["a/**"] })));
    }

    #[test]
    fn test_sources_are_untouched() {
        let high = map(json!({ "a": { "x": 1 } }));
        let low = map(json!({ "a": { "y": 2 }, "b": [1, 2] }));

        let merged = defaults_deep_all([&high, &low]);

        assert_eq!(merged, map(json!({ "a": { "x": 1, "y": 2 }, "b": [1, 2] })));
        assert_eq!(high, map(json!({ "a": { "x": 1 } })));
        assert_eq!(low, map(json!({ "a": { "y": 2 }, "b": [1, 2] })));
    }

    #[test]
    fn test_explicit_null_is_kept() {
        let mut target = map(json!({ "dest": null }));
        defaults_deep(&mut target, &map(json!({ "dest": "dist" })));
        assert_eq!(target, map(json!({ "dest": null })));
    }
}

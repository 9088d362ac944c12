use crate::config::merge::defaults_deep_all;
use crate::config::value::{ConfigMap, ConfigValue};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static INTERPOLATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{([\s\S]+?)\}\}").unwrap());

/// Build the configuration a task actually runs with.
///
/// `static_config` wins over `injected`, which wins over `defaults`. Every
/// string in the merged result has its `{{path}}` placeholders resolved
/// against the merged values and every function is evaluated. None of the
/// inputs is modified.
pub fn realize(
    static_config: &ConfigValue,
    injected: &ConfigValue,
    defaults: &ConfigValue,
) -> ConfigValue {
    let empty = ConfigMap::new();
    let sources = [static_config, injected, defaults].map(|v| v.as_object().unwrap_or(&empty));
    let values = ConfigValue::Object(defaults_deep_all(sources));
    realize_value(&values, &values)
}

fn realize_value(source: &ConfigValue, values: &ConfigValue) -> ConfigValue {
    match source {
        ConfigValue::String(text) => ConfigValue::String(interpolate(text, values)),
        ConfigValue::Function(f) => f.call(values),
        ConfigValue::Array(items) => {
            ConfigValue::Array(items.iter().map(|item| realize_value(item, values)).collect())
        }
        ConfigValue::Object(map) => ConfigValue::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), realize_value(value, values)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Replace `{{path}}` placeholders; a path with no value is substituted as written
pub fn interpolate(text: &str, values: &ConfigValue) -> String {
    INTERPOLATE
        .replace_all(text, |caps: &Captures<'_>| {
            let path = &caps[1];
            match values.get_path(path) {
                Some(ConfigValue::Function(f)) => f.call(values).to_template_string(),
                Some(ConfigValue::Null) | None => path.to_string(),
                Some(value) => value.to_template_string(),
            }
        })
        .into_owned()
}

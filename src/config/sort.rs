use crate::config::error::{ConfigResult, ConfigurationError};
use crate::config::globs::{DEST_SCHEMA, SRC_SCHEMA, globs_of, path_of, resolve_dest, resolve_src};
use crate::config::merge::defaults_deep_all;
use crate::config::schema::{Schema, SchemaType};
use crate::config::task_name::{TASK_PROPERTIES, TaskInfo};
use crate::config::value::{ConfigMap, ConfigValue};
use serde::Serialize;
use std::sync::LazyLock;
use tracing::debug;

/// Property collecting everything a schema does not declare
pub const GATHERING_PROPERTY: &str = "others";

/// Properties consumed at the root of a configuration document
pub const DEFAULT_CONSUMES: [&str; 3] = ["src", "dest", "config"];

/// System-wide schema every task schema is completed with
pub static SCHEMA_DEFAULTS: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new()
        .of_type(SchemaType::Object)
        .property("src", SRC_SCHEMA.clone())
        .property("dest", DEST_SCHEMA.clone())
        .property(
            "config",
            Schema::new()
                .described("Any property inside \"config\" is a configuration property.")
                .of_type(SchemaType::Object),
        )
        .pattern_property(
            r"^\$.*$",
            Schema::new().described(
                "Any property prefixed with $ is a configuration property, reachable with or without the prefix.",
            ),
        )
        .gathering(GATHERING_PROPERTY)
});

/// A node's resolved configuration, immutable once sorted
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TaskConfig(ConfigMap);

impl TaskConfig {
    pub fn new(map: ConfigMap) -> Self {
        Self(map)
    }

    pub fn as_map(&self) -> &ConfigMap {
        &self.0
    }

    pub fn to_value(&self) -> ConfigValue {
        ConfigValue::Object(self.0.clone())
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn src(&self) -> Option<&ConfigValue> {
        self.0.get("src")
    }

    pub fn dest(&self) -> Option<&ConfigValue> {
        self.0.get("dest")
    }

    pub fn src_globs(&self) -> Option<Vec<String>> {
        self.src().and_then(globs_of)
    }

    pub fn dest_path(&self) -> Option<&str> {
        self.dest().and_then(path_of)
    }

    pub fn description(&self) -> Option<&str> {
        self.0.get("description").and_then(ConfigValue::as_str)
    }

    /// A config used as an inheritance source must hold normalized `src`/`dest`
    fn ensure_normalized(&self) -> ConfigResult<()> {
        if self.src().is_some() && self.src_globs().is_none() {
            return Err(ConfigurationError::invariant(
                "parent config src not normalized: globs should be a list of strings",
            ));
        }
        if self.dest().is_some() && self.dest_path().is_none() {
            return Err(ConfigurationError::invariant(
                "parent config dest not normalized: path should be a string",
            ));
        }
        Ok(())
    }
}

impl From<ConfigMap> for TaskConfig {
    fn from(map: ConfigMap) -> Self {
        Self(map)
    }
}

/// Result of sorting one configuration node
#[derive(Debug, Clone, PartialEq)]
pub struct SortedConfig {
    pub task_info: TaskInfo,
    pub task_config: TaskConfig,
    /// Raw configurations of nested tasks, in document order
    pub sub_task_configs: ConfigMap,
}

/// Resolve a node's configuration against its parent's.
///
/// Descriptor properties move into `task_info` first, `src`/`dest` are
/// normalized and joined with the parent's, then the node's own properties and
/// the parent's resolved config fill in everything else. Whatever the schema
/// does not declare and the node itself wrote becomes a sub-task config.
pub fn sort(
    mut task_info: TaskInfo,
    raw: &ConfigValue,
    parent: &TaskConfig,
    schema: Option<&Schema>,
) -> ConfigResult<SortedConfig> {
    let own_schema = schema.cloned().unwrap_or_default();
    let full_schema = own_schema.with_defaults(&SCHEMA_DEFAULTS);

    let mut raw = coerce_raw(raw, &full_schema)?;
    task_info.absorb(&raw)?;
    for property in TASK_PROPERTIES {
        raw.shift_remove(property);
    }
    if task_info.name.is_empty() {
        if let Some(title) = &own_schema.title {
            task_info.name = title.clone();
        }
    }
    if task_info.description.is_none() {
        task_info.description = own_schema.description.clone();
    }

    parent.ensure_normalized()?;

    let mut local = ConfigMap::new();
    if let Some(src) = raw.shift_remove("src").filter(|v| !v.is_null()) {
        let src = resolve_src(parent.src(), &src).map_err(|e| e.at(task_info.name.as_str()))?;
        local.insert("src".to_string(), src);
    }
    if let Some(dest) = raw.shift_remove("dest").filter(|v| !v.is_null()) {
        let dest = resolve_dest(parent.dest(), &dest).map_err(|e| e.at(task_info.name.as_str()))?;
        local.insert("dest".to_string(), dest);
    }

    // own properties beat own `config`, which beats the parent
    let lifted = take_config_property(&mut raw);
    let inherited = defaults_deep_all([&local, &raw, &lifted, parent.as_map()]);
    let mut task_config = full_schema
        .normalize(&ConfigValue::Object(inherited))
        .map_err(|e| e.at(task_info.name.as_str()))?
        .into_object()
        .unwrap_or_default();

    let bucket = full_schema.gathering.as_deref().unwrap_or(GATHERING_PROPERTY);
    let gathered = match task_config.shift_remove(bucket) {
        Some(ConfigValue::Object(gathered)) => gathered,
        _ => ConfigMap::new(),
    };

    // only what the node wrote itself can be a sub-task; inherited extras stay settings
    let mut sub_task_configs = ConfigMap::new();
    for (key, value) in gathered {
        if raw.contains_key(&key) {
            sub_task_configs.insert(key, value);
        } else {
            task_config.entry(key).or_insert(value);
        }
    }

    expose_prefixed_properties(&mut task_config);

    // a delegating task without its own schema takes leftovers as settings
    if schema.is_none() && task_info.task.is_some() && !sub_task_configs.is_empty() {
        for (key, value) in sub_task_configs.drain(..) {
            task_config.entry(key).or_insert(value);
        }
    }

    debug!(
        "Sorted task '{}': {} properties, {} sub-task configs",
        task_info.name,
        task_config.len(),
        sub_task_configs.len()
    );

    Ok(SortedConfig {
        task_info,
        task_config: TaskConfig(task_config),
        sub_task_configs,
    })
}

/// Allow-list variant: the consumed names are the only declared properties
pub fn sort_with_consumes(
    task_info: TaskInfo,
    raw: &ConfigValue,
    parent: &TaskConfig,
    consumes: &[&str],
) -> ConfigResult<SortedConfig> {
    let schema = Schema::declaring(TASK_PROPERTIES.iter().chain(consumes).copied());
    sort(task_info, raw, parent, Some(&schema))
}

fn coerce_raw(raw: &ConfigValue, schema: &Schema) -> ConfigResult<ConfigMap> {
    match raw {
        ConfigValue::Object(map) => Ok(map.clone()),
        ConfigValue::Null => Ok(ConfigMap::new()),
        other => {
            let mut map = ConfigMap::new();
            if let Some(primary) = &schema.primary {
                map.insert(primary.clone(), other.clone());
            } else if matches!(
                other,
                ConfigValue::String(_) | ConfigValue::Array(_) | ConfigValue::Function(_)
            ) {
                // `build: ["clean", "scripts"]` delegates to other tasks
                map.insert("task".to_string(), other.clone());
            } else {
                return Err(ConfigurationError::validation(format!(
                    "task configuration should be an object, found {}",
                    other.type_name()
                )));
            }
            Ok(map)
        }
    }
}

/// Take the properties inside an object-valued `config` out of `raw`.
///
/// `src` and `dest` are only configured directly, never through `config`.
fn take_config_property(raw: &mut ConfigMap) -> ConfigMap {
    if !matches!(raw.get("config"), Some(ConfigValue::Object(_))) {
        return ConfigMap::new();
    }
    match raw.shift_remove("config") {
        Some(ConfigValue::Object(mut lifted)) => {
            lifted.shift_remove("src");
            lifted.shift_remove("dest");
            lifted
        }
        _ => ConfigMap::new(),
    }
}

fn expose_prefixed_properties(task_config: &mut ConfigMap) {
    let exposed: Vec<(String, ConfigValue)> = task_config
        .iter()
        .filter_map(|(key, value)| {
            key.strip_prefix('$')
                .filter(|name| !name.is_empty())
                .map(|name| (name.to_string(), value.clone()))
        })
        .collect();
    for (name, value) in exposed {
        task_config.insert(name, value);
    }
}

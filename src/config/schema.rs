//! JSON-Schema-like normalization for task configurations.
//!
//! Only the attributes the task tree relies on are understood:
//!
//! - `type`, `items`: shape checks, a scalar given where an array is declared is wrapped
//! - `properties`, `patternProperties`: declared keys, normalized recursively
//! - `alias`: alternate accepted names for a property
//! - `default`: injected when the property is absent
//! - `required`: must be present once defaults have been applied
//! - `primary`: a bare non-object input is promoted into this property
//! - `gathering`: every undeclared key is collected into this property

use crate::config::error::{ConfigResult, ConfigurationError};
use crate::config::value::{ConfigMap, ConfigValue};
use indexmap::IndexMap;
use dashmap::DashMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Compiled `patternProperties`, shared by every schema that uses the same pattern
static PATTERN_CACHE: LazyLock<DashMap<String, Regex>> = LazyLock::new(DashMap::new);

fn compiled_pattern(pattern: &str) -> ConfigResult<Regex> {
    if let Some(re) = PATTERN_CACHE.get(pattern) {
        return Ok(re.clone());
    }
    let re = Regex::new(pattern).map_err(|e| {
        ConfigurationError::validation(format!("invalid property pattern '{pattern}': {e}"))
    })?;
    PATTERN_CACHE.insert(pattern.to_string(), re.clone());
    Ok(re)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl SchemaType {
    fn accepts(&self, value: &ConfigValue) -> bool {
        match (self, value) {
            // late-bound values are checked after they are realized
            (_, ConfigValue::Function(_)) => true,
            (SchemaType::Object, ConfigValue::Object(_)) => true,
            (SchemaType::Array, ConfigValue::Array(_)) => true,
            (SchemaType::String, ConfigValue::String(_)) => true,
            (SchemaType::Number, ConfigValue::Number(_)) => true,
            (SchemaType::Integer, ConfigValue::Number(n)) => n.is_i64() || n.is_u64(),
            (SchemaType::Boolean, ConfigValue::Bool(_)) => true,
            (SchemaType::Null, ConfigValue::Null) => true,
            _ => false,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            SchemaType::Object => "object",
            SchemaType::Array => "array",
            SchemaType::String => "string",
            SchemaType::Number => "number",
            SchemaType::Integer => "integer",
            SchemaType::Boolean => "boolean",
            SchemaType::Null => "null",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Schema {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub schema_type: Option<SchemaType>,
    pub properties: IndexMap<String, Schema>,
    pub pattern_properties: IndexMap<String, Schema>,
    pub required: Vec<String>,
    pub primary: Option<String>,
    pub gathering: Option<String>,
    pub alias: Vec<String>,
    pub default: Option<ConfigValue>,
    pub items: Option<Box<Schema>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a schema from its JSON representation
    pub fn from_json(value: serde_json::Value) -> ConfigResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| ConfigurationError::validation(format!("invalid schema: {e}")))
    }

    /// A schema that declares exactly the given property names
    pub fn declaring<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut schema = Self::new().of_type(SchemaType::Object);
        for name in names {
            schema.properties.insert(name.into(), Schema::new());
        }
        schema
    }

    pub fn of_type(mut self, schema_type: SchemaType) -> Self {
        self.schema_type = Some(schema_type);
        self
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn property(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    pub fn pattern_property(mut self, pattern: impl Into<String>, schema: Schema) -> Self {
        self.pattern_properties.insert(pattern.into(), schema);
        self
    }

    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    pub fn primary(mut self, name: impl Into<String>) -> Self {
        self.primary = Some(name.into());
        self
    }

    pub fn gathering(mut self, name: impl Into<String>) -> Self {
        self.gathering = Some(name.into());
        self
    }

    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.alias.push(name.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<ConfigValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn items(mut self, schema: Schema) -> Self {
        self.items = Some(Box::new(schema));
        self
    }

    /// Fill everything this schema leaves unset from `defaults`.
    ///
    /// Properties present on both sides are merged recursively; lists
    /// (`required`, `alias`) are taken from `defaults` only when empty here.
    pub fn with_defaults(&self, defaults: &Schema) -> Schema {
        let mut merged = self.clone();

        merged.title = merged.title.or_else(|| defaults.title.clone());
        merged.description = merged.description.or_else(|| defaults.description.clone());
        merged.schema_type = merged.schema_type.or(defaults.schema_type);
        merged.primary = merged.primary.or_else(|| defaults.primary.clone());
        merged.gathering = merged.gathering.or_else(|| defaults.gathering.clone());
        merged.default = merged.default.or_else(|| defaults.default.clone());
        if merged.required.is_empty() {
            merged.required = defaults.required.clone();
        }
        if merged.alias.is_empty() {
            merged.alias = defaults.alias.clone();
        }
        merged.items = match (merged.items.take(), &defaults.items) {
            (Some(own), Some(fallback)) => Some(Box::new(own.with_defaults(fallback))),
            (Some(own), None) => Some(own),
            (None, fallback) => fallback.clone(),
        };

        for (name, fallback) in &defaults.properties {
            let property = match merged.properties.get(name) {
                Some(own) => own.with_defaults(fallback),
                None => fallback.clone(),
            };
            merged.properties.insert(name.clone(), property);
        }
        for (pattern, fallback) in &defaults.pattern_properties {
            merged
                .pattern_properties
                .entry(pattern.clone())
                .or_insert_with(|| fallback.clone());
        }

        merged
    }

    /// Normalize `input` against this schema, returning a new value
    pub fn normalize(&self, input: &ConfigValue) -> ConfigResult<ConfigValue> {
        self.normalize_at(input.clone(), "")
    }

    fn is_structured(&self) -> bool {
        self.schema_type == Some(SchemaType::Object)
            || !self.properties.is_empty()
            || !self.pattern_properties.is_empty()
            || self.primary.is_some()
            || self.gathering.is_some()
    }

    fn normalize_at(&self, mut value: ConfigValue, path: &str) -> ConfigResult<ConfigValue> {
        if let Some(primary) = &self.primary {
            if !value.is_object() && !value.is_null() {
                let mut promoted = ConfigMap::new();
                promoted.insert(primary.clone(), value);
                value = ConfigValue::Object(promoted);
            }
        }

        if self.schema_type == Some(SchemaType::Array)
            && !matches!(
                value,
                ConfigValue::Array(_) | ConfigValue::Null | ConfigValue::Function(_)
            )
        {
            value = ConfigValue::Array(vec![value]);
        }

        if let Some(expected) = self.schema_type {
            if !value.is_null() && !expected.accepts(&value) {
                return Err(ConfigurationError::validation(format!(
                    "'{}' should be {}, found {}",
                    display_path(path),
                    expected.name(),
                    value.type_name()
                )));
            }
        }

        match value {
            ConfigValue::Object(map) if self.is_structured() => self.normalize_object(map, path),
            ConfigValue::Array(items) => match &self.items {
                Some(item_schema) => items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| item_schema.normalize_at(item, &format!("{path}[{i}]")))
                    .collect::<ConfigResult<Vec<_>>>()
                    .map(ConfigValue::Array),
                None => Ok(ConfigValue::Array(items)),
            },
            other => Ok(other),
        }
    }

    fn normalize_object(&self, mut input: ConfigMap, path: &str) -> ConfigResult<ConfigValue> {
        for (name, property) in &self.properties {
            if input.contains_key(name) {
                continue;
            }
            if let Some(alias) = property.alias.iter().find(|a| input.contains_key(*a)) {
                if let Some(value) = input.shift_remove(alias) {
                    input.insert(name.clone(), value);
                }
            }
        }

        let patterns = self
            .pattern_properties
            .iter()
            .map(|(pattern, schema)| compiled_pattern(pattern).map(|re| (re, schema)))
            .collect::<ConfigResult<Vec<_>>>()?;

        let mut output = ConfigMap::new();
        let mut gathered = ConfigMap::new();

        for (key, value) in input {
            let child_path = join_property_path(path, &key);
            if let Some(property) = self.properties.get(&key) {
                let normalized = property.normalize_at(value, &child_path)?;
                output.insert(key, normalized);
            } else if let Some((_, property)) = patterns.iter().find(|(re, _)| re.is_match(&key)) {
                let normalized = property.normalize_at(value, &child_path)?;
                output.insert(key, normalized);
            } else if self.gathering.is_some() && self.gathering.as_deref() != Some(key.as_str()) {
                gathered.insert(key, value);
            } else {
                output.insert(key, value);
            }
        }

        if let Some(bucket) = &self.gathering {
            if !gathered.is_empty() {
                match output.get_mut(bucket) {
                    Some(ConfigValue::Object(existing)) => {
                        for (key, value) in gathered {
                            existing.entry(key).or_insert(value);
                        }
                    }
                    Some(other) => {
                        return Err(ConfigurationError::validation(format!(
                            "'{}' gathers undeclared properties and should be an object, found {}",
                            display_path(&join_property_path(path, bucket)),
                            other.type_name()
                        )));
                    }
                    None => {
                        output.insert(bucket.clone(), ConfigValue::Object(gathered));
                    }
                }
            }
        }

        for (name, property) in &self.properties {
            if output.contains_key(name) {
                continue;
            }
            if let Some(default) = &property.default {
                output.insert(name.clone(), default.clone());
            }
        }

        for name in &self.required {
            if output.get(name).is_none_or(ConfigValue::is_null) {
                return Err(ConfigurationError::validation(format!(
                    "missing required property '{}'",
                    display_path(&join_property_path(path, name))
                )));
            }
        }

        Ok(ConfigValue::Object(output))
    }
}

fn join_property_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "<root>" } else { path }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::error::ErrorKind;
    use serde_json::json;

    fn value(v: serde_json::Value) -> ConfigValue {
        ConfigValue::from(v)
    }

    fn glob_schema() -> Schema {
        Schema::new()
            .property(
                "globs",
                Schema::new()
                    .of_type(SchemaType::Array)
                    .items(Schema::new().of_type(SchemaType::String))
                    .alias("glob"),
            )
            .property("options", Schema::new().of_type(SchemaType::Object))
            .primary("globs")
            .gathering("options")
            .required("globs")
    }

    #[test]
    fn test_primary_promotes_bare_scalar() {
        let normalized = glob_schema().normalize(&value(json!("src/**/*.js"))).unwrap();
        assert_eq!(normalized, value(json!({ "globs": ["src/**/*.js"] })));
    }

    #[test]
    fn test_primary_promotes_bare_array() {
        let normalized = glob_schema()
            .normalize(&value(json!(["a/**", "b/**"])))
            .unwrap();
        assert_eq!(normalized, value(json!({ "globs": ["a/**", "b/**"] })));
    }

    #[test]
    fn test_alias_and_gathering() {
        let normalized = glob_schema()
            .normalize(&value(json!({ "glob": "lib/*.css", "base": "lib", "override": true })))
            .unwrap();
        assert_eq!(
            normalized,
            value(json!({
                "globs": ["lib/*.css"],
                "options": { "base": "lib", "override": true }
            }))
        );
    }

    #[test]
    fn test_gathering_keeps_explicit_bucket_entries() {
        let normalized = glob_schema()
            .normalize(&value(json!({
                "globs": "a",
                "options": { "base": "explicit" },
                "base": "gathered",
                "read": false
            })))
            .unwrap();
        assert_eq!(
            normalized.get("options"),
            Some(&value(json!({ "base": "explicit", "read": false })))
        );
    }

    #[test]
    fn test_required_property_missing() {
        let error = glob_schema()
            .normalize(&value(json!({ "options": { "base": "x" } })))
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::Validation);
        assert!(error.message.contains("globs"));
    }

    #[test]
    fn test_item_type_mismatch_is_reported_with_path() {
        let error = glob_schema()
            .normalize(&value(json!({ "globs": ["ok", 3] })))
            .unwrap_err();
        assert!(error.message.contains("globs[1]"), "{}", error.message);
    }

    #[test]
    fn test_defaults_are_injected() {
        let schema = Schema::new()
            .property("minify", Schema::new().default_value(true))
            .property("level", Schema::new().default_value(2i64));
        let normalized = schema.normalize(&value(json!({ "level": 5 }))).unwrap();
        assert_eq!(normalized, value(json!({ "level": 5, "minify": true })));
    }

    #[test]
    fn test_pattern_properties_are_not_gathered() {
        let schema = Schema::new()
            .property("a", Schema::new())
            .pattern_property(r"^\$.*$", Schema::new())
            .gathering("others");
        let normalized = schema
            .normalize(&value(json!({ "a": 1, "$b": 2, "c": 3 })))
            .unwrap();
        assert_eq!(
            normalized,
            value(json!({ "a": 1, "$b": 2, "others": { "c": 3 } }))
        );
    }

    #[test]
    fn test_without_gathering_unknown_keys_pass_through() {
        let schema = Schema::new().property("a", Schema::new());
        let normalized = schema.normalize(&value(json!({ "a": 1, "z": 2 }))).unwrap();
        assert_eq!(normalized, value(json!({ "a": 1, "z": 2 })));
    }

    #[test]
    fn test_with_defaults_merges_properties() {
        let own = Schema::new()
            .titled("sass")
            .property("options", Schema::new().property("outputStyle", Schema::new()));
        let defaults = Schema::new()
            .property("options", Schema::new().of_type(SchemaType::Object))
            .property("src", glob_schema())
            .gathering("others");

        let merged = own.with_defaults(&defaults);

        assert_eq!(merged.title.as_deref(), Some("sass"));
        assert_eq!(merged.gathering.as_deref(), Some("others"));
        assert!(merged.properties.contains_key("src"));
        let options = &merged.properties["options"];
        assert_eq!(options.schema_type, Some(SchemaType::Object));
        assert!(options.properties.contains_key("outputStyle"));
    }

    #[test]
    fn test_property_patterns_are_compiled_once() {
        let schema = Schema::new()
            .pattern_property(r"^cache-[a-z]+$", Schema::new())
            .gathering("others");
        let input = ConfigValue::from(json!({ "cache-dir": "tmp", "other": 1 }));

        let first = schema.normalize(&input).unwrap();
        let cached = PATTERN_CACHE.get(r"^cache-[a-z]+$").map(|re| re.as_str().to_string());
        let second = schema.normalize(&input).unwrap();

        assert_eq!(cached.as_deref(), Some(r"^cache-[a-z]+$"));
        assert_eq!(first, second);
        assert_eq!(first.get("cache-dir"), Some(&ConfigValue::from("tmp")));

        let error = compiled_pattern("(unclosed").unwrap_err();
        assert!(error.to_string().contains("invalid property pattern"));
        assert!(!PATTERN_CACHE.contains_key("(unclosed"));
    }

    #[test]
    fn test_schema_from_json() {
        let schema = Schema::from_json(json!({
            "title": "watch",
            "type": "object",
            "properties": { "options": { "properties": { "persistent": {} } } },
            "patternProperties": { "^x-": {} },
            "required": ["options"]
        }))
        .unwrap();

        assert_eq!(schema.title.as_deref(), Some("watch"));
        assert_eq!(schema.schema_type, Some(SchemaType::Object));
        assert!(schema.pattern_properties.contains_key("^x-"));
        assert_eq!(schema.required, vec!["options"]);
    }
}

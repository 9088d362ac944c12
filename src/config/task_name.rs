use crate::config::error::{ConfigResult, ConfigurationError};
use crate::config::value::{ConfigMap, ConfigValue};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

// word characters are ASCII only
static TASK_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([.#]?)([_A-Za-z0-9][-_\sA-Za-z0-9]*)([!?]?)$").unwrap());

/// Whether a task is exposed, only usable from other tasks, or dropped entirely
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Can be run from the command line
    #[default]
    Normal,
    /// Functional, but not registered for direct invocation
    Hidden,
    /// Not processed at all, including all descendants
    Disabled,
}

impl Visibility {
    pub fn marker(&self) -> &'static str {
        match self {
            Visibility::Normal => "",
            Visibility::Hidden => ".",
            Visibility::Disabled => "#",
        }
    }

    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker.trim().to_ascii_lowercase().as_str() {
            "" | "normal" => Some(Visibility::Normal),
            "." | "hidden" => Some(Visibility::Hidden),
            "#" | "disabled" => Some(Visibility::Disabled),
            _ => None,
        }
    }
}

/// The build mode(s) a task is allowed to run in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    #[default]
    All,
    Production,
    Development,
}

impl RuntimeMode {
    pub fn marker(&self) -> &'static str {
        match self {
            RuntimeMode::All => "",
            RuntimeMode::Production => "!",
            RuntimeMode::Development => "?",
        }
    }

    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Some(RuntimeMode::All),
            "!" | "production" | "prod" => Some(RuntimeMode::Production),
            "?" | "development" | "dev" => Some(RuntimeMode::Development),
            _ => None,
        }
    }

    /// Whether a task restricted to `self` may run while `active` is in effect
    pub fn allows(&self, active: RuntimeMode) -> bool {
        *self == RuntimeMode::All || active == RuntimeMode::All || *self == active
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RuntimeMode::All => "all",
            RuntimeMode::Production => "production",
            RuntimeMode::Development => "development",
        };
        f.write_str(label)
    }
}

/// Properties that describe the task itself rather than its configuration
pub const TASK_PROPERTIES: [&str; 6] = [
    "depends",
    "description",
    "task",
    "name",
    "visibility",
    "runtime",
];

/// Task descriptor derived from a configuration key
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskInfo {
    pub name: String,
    pub visibility: Visibility,
    pub runtime: RuntimeMode,
    pub description: Option<String>,
    pub depends: Vec<String>,
    /// Delegate for solo tasks: a task name, a list of names, or a function
    pub task: Option<ConfigValue>,
}

impl TaskInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Normal
    }

    pub fn is_disabled(&self) -> bool {
        self.visibility == Visibility::Disabled
    }

    /// The name decorated with its visibility and runtime markers
    pub fn marked_name(&self) -> String {
        format!(
            "{}{}{}",
            self.visibility.marker(),
            self.name,
            self.runtime.marker()
        )
    }

    /// Fill unset fields from descriptor properties found in a raw config
    pub fn absorb(&mut self, raw: &ConfigMap) -> ConfigResult<()> {
        if self.name.is_empty() {
            if let Some(name) = raw.get("name").and_then(ConfigValue::as_str) {
                self.name = name.trim().to_string();
            }
        }
        if self.description.is_none() {
            self.description = raw
                .get("description")
                .and_then(ConfigValue::as_str)
                .map(str::to_string);
        }
        if self.visibility == Visibility::Normal {
            if let Some(marker) = raw.get("visibility").and_then(ConfigValue::as_str) {
                self.visibility = Visibility::from_marker(marker).ok_or_else(|| {
                    ConfigurationError::validation(format!("invalid visibility: {marker}"))
                })?;
            }
        }
        if self.runtime == RuntimeMode::All {
            if let Some(marker) = raw.get("runtime").and_then(ConfigValue::as_str) {
                self.runtime = RuntimeMode::from_marker(marker).ok_or_else(|| {
                    ConfigurationError::validation(format!("invalid runtime mode: {marker}"))
                })?;
            }
        }
        if self.depends.is_empty() {
            match raw.get("depends") {
                Some(ConfigValue::String(name)) => self.depends = vec![name.clone()],
                Some(ConfigValue::Array(names)) => {
                    self.depends = names
                        .iter()
                        .map(|n| {
                            n.as_str().map(str::to_string).ok_or_else(|| {
                                ConfigurationError::validation(format!(
                                    "depends should list task names, found {}",
                                    n.type_name()
                                ))
                            })
                        })
                        .collect::<ConfigResult<Vec<_>>>()?;
                }
                Some(ConfigValue::Null) | None => {}
                Some(other) => {
                    return Err(ConfigurationError::validation(format!(
                        "depends should be a task name or a list of task names, found {}",
                        other.type_name()
                    )));
                }
            }
        }
        if self.task.is_none() {
            self.task = raw.get("task").filter(|t| !t.is_null()).cloned();
        }
        Ok(())
    }
}

/// Parse a configuration key like `.styles!` into a task descriptor
pub fn parse_task_name(raw_name: &str) -> ConfigResult<TaskInfo> {
    let name = raw_name.trim();
    let captures = TASK_NAME
        .captures(name)
        .ok_or_else(|| ConfigurationError::syntax(format!("invalid task name: {name}")))?;

    let visibility = captures
        .get(1)
        .and_then(|m| Visibility::from_marker(m.as_str()))
        .unwrap_or_default();
    let runtime = captures
        .get(3)
        .and_then(|m| RuntimeMode::from_marker(m.as_str()))
        .unwrap_or_default();
    let name = captures.get(2).map_or(name, |m| m.as_str());

    Ok(TaskInfo {
        name: name.to_string(),
        visibility,
        runtime,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::error::ErrorKind;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> ConfigMap {
        ConfigValue::from(value).into_object().unwrap()
    }

    #[test]
    fn test_plain_name() {
        let info = parse_task_name("scripts").unwrap();
        assert_eq!(info.name, "scripts");
        assert_eq!(info.visibility, Visibility::Normal);
        assert_eq!(info.runtime, RuntimeMode::All);
    }

    #[test]
    fn test_markers() {
        let info = parse_task_name(".styles!").unwrap();
        assert_eq!(info.name, "styles");
        assert_eq!(info.visibility, Visibility::Hidden);
        assert_eq!(info.runtime, RuntimeMode::Production);

        let info = parse_task_name("#legacy").unwrap();
        assert_eq!(info.visibility, Visibility::Disabled);
        assert!(info.is_disabled());

        let info = parse_task_name("serve?").unwrap();
        assert_eq!(info.runtime, RuntimeMode::Development);
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        let info = parse_task_name("  copy assets  ").unwrap();
        assert_eq!(info.name, "copy assets");
    }

    #[test]
    fn test_marked_name_round_trip() {
        for raw in ["build", ".hidden-task", "#off", "deploy!", "watch?", ".x_1?", "#a b!"] {
            let info = parse_task_name(raw).unwrap();
            assert_eq!(info.marked_name(), raw);
        }
    }

    #[test]
    fn test_invalid_names() {
        for raw in ["", "a/b", "!start", "..double", "name!!", "-dash", "café", "ünits"] {
            let error = parse_task_name(raw).unwrap_err();
            assert_eq!(error.kind, ErrorKind::Syntax, "{raw}");
            assert!(error.message.contains("invalid task name"));
        }
    }

    #[test]
    fn test_runtime_mode_allows() {
        assert!(RuntimeMode::All.allows(RuntimeMode::Production));
        assert!(RuntimeMode::Production.allows(RuntimeMode::Production));
        assert!(RuntimeMode::Production.allows(RuntimeMode::All));
        assert!(!RuntimeMode::Production.allows(RuntimeMode::Development));
        assert!(!RuntimeMode::Development.allows(RuntimeMode::Production));
    }

    #[test]
    fn test_absorb_keeps_parsed_values() {
        let mut info = parse_task_name(".styles").unwrap();
        info.absorb(&raw(json!({
            "name": "renamed",
            "visibility": "disabled",
            "runtime": "production",
            "description": "compile styles",
            "depends": "clean",
            "task": ["a", "b"]
        })))
        .unwrap();

        assert_eq!(info.name, "styles");
        assert_eq!(info.visibility, Visibility::Hidden);
        assert_eq!(info.runtime, RuntimeMode::Production);
        assert_eq!(info.description.as_deref(), Some("compile styles"));
        assert_eq!(info.depends, vec!["clean"]);
        assert_eq!(info.task, Some(ConfigValue::from(json!(["a", "b"]))));
    }

    #[test]
    fn test_absorb_rejects_bad_visibility() {
        let mut info = parse_task_name("styles").unwrap();
        let error = info
            .absorb(&raw(json!({ "visibility": "sometimes" })))
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::Validation);
    }
}

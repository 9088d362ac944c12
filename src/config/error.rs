use std::fmt;
use thiserror::Error;

/// Category of a configuration failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A task name that does not match the task name grammar
    Syntax,
    /// A value missing or malformed after schema normalization
    Validation,
    /// A parent configuration used for inheritance before it was normalized
    InternalInvariant,
    /// A task name that resolves to no recipe, stream or inline runner
    MissingRunner,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Syntax => "syntax error",
            ErrorKind::Validation => "validation error",
            ErrorKind::InternalInvariant => "internal invariant violated",
            ErrorKind::MissingRunner => "missing runner",
        };
        f.write_str(label)
    }
}

/// Error raised while loading or resolving a task configuration tree
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}{}", .task_path.as_ref().map(|p| format!(" (task '{p}')")).unwrap_or_default())]
pub struct ConfigurationError {
    pub kind: ErrorKind,
    pub task_path: Option<String>,
    pub message: String,
}

impl ConfigurationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            task_path: None,
            message: message.into(),
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalInvariant, message)
    }

    pub fn missing_runner(name: &str) -> Self {
        Self::new(
            ErrorKind::MissingRunner,
            format!("can't infer a recipe, stream or inline task for '{name}', task will do nothing"),
        )
    }

    /// Attach the task path the error belongs to, keeping an existing one
    pub fn at(mut self, task_path: impl Into<String>) -> Self {
        if self.task_path.is_none() {
            self.task_path = Some(task_path.into());
        }
        self
    }
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_with_task_path() {
        let error = ConfigurationError::validation("missing required property 'path'").at("build:css");
        assert_eq!(
            error.to_string(),
            "validation error: missing required property 'path' (task 'build:css')"
        );
    }

    #[test]
    fn test_error_keeps_innermost_path() {
        let error = ConfigurationError::syntax("invalid task name: a/b")
            .at("scripts:a/b")
            .at("scripts");
        assert_eq!(error.task_path.as_deref(), Some("scripts:a/b"));
        assert_eq!(error.kind, ErrorKind::Syntax);
    }
}

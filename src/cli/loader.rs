//! Task document loading
//!
//! A task document is a nested mapping keyed by task names, written either as
//! JSON (`.json`) or TOML (`.toml`). Both are read into the same
//! [`ConfigValue`] tree, keeping the key order of the file.

use crate::config::ConfigValue;
use crate::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Task document '{path}' not found")]
    NotFound { path: PathBuf },

    #[error("Task document '{path}' is not UTF-8 encoded")]
    NotUtf8 { path: PathBuf },

    #[error("IO error reading '{path}': {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unsupported task document format '{path}': expected a .json or .toml file")]
    UnsupportedFormat { path: PathBuf },

    #[error("Failed to parse task document '{path}': {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Task document '{path}' should contain a table of tasks at the top level")]
    NotATable { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Toml,
}

impl DocumentFormat {
    /// Detect the format from the file extension, case-insensitively
    pub fn detect(path: &Path) -> Option<Self> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "json" => Some(DocumentFormat::Json),
            "toml" => Some(DocumentFormat::Toml),
            _ => None,
        }
    }
}

pub struct TaskDocument;

impl TaskDocument {
    /// Load and parse a task document
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ConfigValue, DocumentError> {
        let path = path.as_ref().to_path_buf();
        let format = DocumentFormat::detect(&path)
            .ok_or_else(|| DocumentError::UnsupportedFormat { path: path.clone() })?;

        debug!("Loading {:?} task document: {:?}", format, path);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                return Err(match e.kind() {
                    std::io::ErrorKind::NotFound => DocumentError::NotFound { path },
                    std::io::ErrorKind::InvalidData => DocumentError::NotUtf8 { path },
                    _ => DocumentError::IoError { path, source: e },
                });
            }
        };

        Self::parse(&content, format).map_err(|reason| match reason {
            ParseFailure::Syntax(reason) => DocumentError::ParseError {
                path: path.clone(),
                reason,
            },
            ParseFailure::NotATable => DocumentError::NotATable { path: path.clone() },
        })
    }

    /// Parse document text in the given format
    pub fn parse(content: &str, format: DocumentFormat) -> Result<ConfigValue, ParseFailure> {
        let value = match format {
            DocumentFormat::Json => serde_json::from_str::<ConfigValue>(content)
                .map_err(|e| ParseFailure::Syntax(e.to_string()))?,
            DocumentFormat::Toml => toml::from_str::<ConfigValue>(content)
                .map_err(|e| ParseFailure::Syntax(e.to_string()))?,
        };

        if !value.is_object() {
            return Err(ParseFailure::NotATable);
        }
        Ok(value)
    }

    /// First default task document present in `project_root`
    pub fn find_in(project_root: &Path) -> Option<PathBuf> {
        env::task_file_candidates(project_root)
            .into_iter()
            .find(|candidate| candidate.is_file())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    Syntax(String),
    NotATable,
}

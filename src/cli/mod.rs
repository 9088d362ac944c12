//! CLI-specific functionality for taskchef
//!
//! This module contains all CLI-related code including argument parsing,
//! task document loading, and configuration discovery.

pub mod args;
pub mod config;
pub mod loader;

pub use args::{Args, DocumentConfig, ExecutionMode, RunConfig};
pub use config::{ChefConfig, ChefConfigError, ConfigDiscovery};
pub use loader::{DocumentError, DocumentFormat, TaskDocument};

//! Configuration resolution for task trees
//!
//! This module turns the raw, user-authored configuration of one task node into
//! its resolved form: key parsing, schema normalization, inheritance from the
//! parent node and the late-binding `realize` step used at run time.

pub mod error;
pub mod globs;
pub mod merge;
pub mod realize;
pub mod schema;
pub mod sort;
pub mod task_name;
pub mod value;


pub use error::{ConfigResult, ConfigurationError, ErrorKind};
pub use globs::{DEST_SCHEMA, SRC_SCHEMA, join_globs, join_path};
pub use merge::{defaults_deep, defaults_deep_all};
pub use realize::{interpolate, realize};
pub use schema::{Schema, SchemaType};
pub use sort::{DEFAULT_CONSUMES, SortedConfig, TaskConfig, sort, sort_with_consumes};
pub use task_name::{RuntimeMode, TASK_PROPERTIES, TaskInfo, Visibility, parse_task_name};
pub use value::{ConfigFn, ConfigMap, ConfigValue};

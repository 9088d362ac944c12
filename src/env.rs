//! Environment constants and path utilities for taskchef.
//!
//! This module centralizes the file and directory names the CLI looks for,
//! making them easier to maintain and modify.

use std::path::{Path, PathBuf};

/// Application directory name (hidden directory like .git, .vscode)
pub const CHEF_DIR_NAME: &str = ".taskchef";

/// Configuration file name inside a `.taskchef` directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file name at a project root
pub const LOCAL_CONFIG_FILE_NAME: &str = "taskchef.toml";

/// Task documents looked up in the working directory when none is given, in order
pub const DEFAULT_TASK_FILES: [&str; 2] = ["taskchef.json", "taskchef.tasks.toml"];

/// Task run when the command line names none
pub const DEFAULT_TASK_NAME: &str = "default";

/// System-wide configuration (Unix-like systems)
pub const SYSTEM_CONFIG_FILE: &str = "/etc/taskchef/config.toml";

/// Build the `.taskchef` directory path from a project root
pub fn chef_dir_path(project_root: &Path) -> PathBuf {
    project_root.join(CHEF_DIR_NAME)
}

/// Build config directory path in user's home directory
pub fn user_config_dir_path(home_dir: &Path) -> PathBuf {
    chef_dir_path(home_dir)
}

/// Build config file path in user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    user_config_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build local config file path in current directory
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    chef_dir_path(current_dir).join(CONFIG_FILE_NAME)
}

/// Task document candidates for a project root, in lookup order
pub fn task_file_candidates(project_root: &Path) -> Vec<PathBuf> {
    DEFAULT_TASK_FILES
        .iter()
        .map(|name| project_root.join(name))
        .collect()
}

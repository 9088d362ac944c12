//! Source glob and destination path handling.
//!
//! A child's `src` extends its ancestor's glob list unless it sets the
//! `override` option; a child's `dest` is joined onto the ancestor's folder
//! under the same rule.

use crate::config::error::ConfigResult;
use crate::config::schema::{Schema, SchemaType};
use crate::config::value::ConfigValue;
use std::path::Path;
use std::sync::LazyLock;

pub static SRC_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new()
        .property(
            "globs",
            Schema::new()
                .described("Glob or array of globs to read.")
                .of_type(SchemaType::Array)
                .items(Schema::new().of_type(SchemaType::String))
                .alias("glob"),
        )
        .property(
            "options",
            Schema::new()
                .of_type(SchemaType::Object)
                .property(
                    "base",
                    Schema::new().described("Used for relative pathing. Typically where a glob starts."),
                )
                .property(
                    "buffer",
                    Schema::new().described("Set to false to stream file contents instead of buffering them."),
                )
                .property(
                    "read",
                    Schema::new().described("Set to false to skip reading file contents at all."),
                )
                .property("since", Schema::new())
                .property(
                    "override",
                    Schema::new().described("Override parent's src settings."),
                ),
        )
        .required("globs")
        .primary("globs")
        .gathering("options")
});

pub static DEST_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new()
        .property(
            "path",
            Schema::new()
                .described("The path (output folder) to write files to.")
                .of_type(SchemaType::String),
        )
        .property(
            "options",
            Schema::new()
                .of_type(SchemaType::Object)
                .property(
                    "cwd",
                    Schema::new().described("cwd for the output folder, only used when the path is relative."),
                )
                .property(
                    "mode",
                    Schema::new().described("Octal permission string for folders created for the output."),
                )
                .property("dirMode", Schema::new())
                .property("overwrite", Schema::new())
                .property(
                    "flatten",
                    Schema::new().described("Remove or replace relative path for files."),
                )
                .property(
                    "override",
                    Schema::new().described("Override parent's dest settings."),
                ),
        )
        .required("path")
        .primary("path")
        .gathering("options")
});

/// Parent patterns first, in order, followed by the child's
pub fn join_globs(parent: &[String], child: &[String]) -> Vec<String> {
    parent.iter().chain(child).cloned().collect()
}

/// Join a relative path onto a parent path.
///
/// With `join_as_folder` unset, a parent whose last segment carries an
/// extension is taken to be a file and the child lands next to it.
pub fn join_path(parent: &str, child: &str, join_as_folder: bool) -> String {
    let parent = Path::new(parent);
    let base = if !join_as_folder && parent.extension().is_some() {
        parent.parent().unwrap_or(parent)
    } else {
        parent
    };
    base.join(child).to_string_lossy().into_owned()
}

/// Whether a normalized `src`/`dest` asks to replace the inherited value
pub fn is_override(normalized: &ConfigValue) -> bool {
    normalized
        .get_path("options.override")
        .and_then(ConfigValue::as_bool)
        .unwrap_or(false)
}

/// Read the glob list out of a normalized `src`
pub fn globs_of(src: &ConfigValue) -> Option<Vec<String>> {
    src.get("globs")?
        .as_array()?
        .iter()
        .map(|g| g.as_str().map(str::to_string))
        .collect()
}

/// Read the folder out of a normalized `dest`
pub fn path_of(dest: &ConfigValue) -> Option<&str> {
    dest.get("path")?.as_str()
}

/// Normalize a child's raw `src` and combine it with the parent's normalized one
pub fn resolve_src(parent: Option<&ConfigValue>, raw: &ConfigValue) -> ConfigResult<ConfigValue> {
    let mut value = SRC_SCHEMA.normalize(raw)?;
    if let Some(parent_globs) = parent.and_then(globs_of) {
        if !is_override(&value) {
            let child_globs = globs_of(&value).unwrap_or_default();
            let joined = join_globs(&parent_globs, &child_globs);
            if let Some(map) = value.as_object_mut() {
                map.insert(
                    "globs".to_string(),
                    ConfigValue::Array(joined.into_iter().map(ConfigValue::from).collect()),
                );
            }
        }
    }
    Ok(value)
}

/// Normalize a child's raw `dest` and join it onto the parent's folder
pub fn resolve_dest(parent: Option<&ConfigValue>, raw: &ConfigValue) -> ConfigResult<ConfigValue> {
    let mut value = DEST_SCHEMA.normalize(raw)?;
    if let Some(parent_path) = parent.and_then(path_of) {
        if !is_override(&value) {
            let child_path = path_of(&value).unwrap_or_default();
            // a destination is always a folder, even when it does not exist yet
            let joined = join_path(parent_path, child_path, true);
            if let Some(map) = value.as_object_mut() {
                map.insert("path".to_string(), ConfigValue::from(joined));
            }
        }
    }
    Ok(value)
}

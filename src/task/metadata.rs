use crate::task::registry::RunnerKind;
use crate::task::types::TaskId;
use dashmap::DashMap;
use std::collections::HashSet;
use std::fmt::Write;

/// Tree bookkeeping for one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMetadata {
    pub name: String,
    pub label: String,
    pub kind: RunnerKind,
    /// Labels of the tasks this one runs
    pub nodes: Vec<String>,
    pub branch: bool,
}

/// Side table describing the task tree, keyed by task id
#[derive(Debug, Default)]
pub struct MetadataTable {
    entries: DashMap<TaskId, TaskMetadata>,
}

impl MetadataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a task, or append `nodes` to one already recorded
    pub fn set(&self, id: TaskId, name: &str, label: &str, kind: RunnerKind, nodes: Vec<String>) {
        if let Some(mut existing) = self.entries.get_mut(&id) {
            if !nodes.is_empty() {
                existing.nodes.extend(nodes);
                existing.branch = true;
            }
            return;
        }
        let branch = !nodes.is_empty();
        self.entries.insert(
            id,
            TaskMetadata {
                name: name.to_string(),
                label: label.to_string(),
                kind,
                nodes,
                branch,
            },
        );
    }

    pub fn get(&self, id: &TaskId) -> Option<TaskMetadata> {
        self.entries.get(id).map(|entry| entry.clone())
    }

    pub fn find_by_label(&self, label: &str) -> Option<TaskMetadata> {
        self.entries
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the tree below each root label, one indented line per node
    pub fn render_tree(&self, roots: &[String]) -> String {
        let mut out = String::new();
        for root in roots {
            let mut visiting = HashSet::new();
            self.render_node(root, 0, &mut visiting, &mut out);
        }
        out
    }

    fn render_node(
        &self,
        label: &str,
        depth: usize,
        visiting: &mut HashSet<String>,
        out: &mut String,
    ) {
        let indent = "  ".repeat(depth);
        let meta = self.find_by_label(label);
        let kind = meta.as_ref().map_or("task", |m| m.kind.label());
        let _ = writeln!(out, "{indent}{label} ({kind})");

        let Some(meta) = meta else {
            return;
        };
        if !visiting.insert(label.to_string()) {
            return;
        }
        for node in &meta.nodes {
            self.render_node(node, depth + 1, visiting, out);
        }
        visiting.remove(label);
    }
}

//! Forest reconstruction from flat todo snapshots.
//!
//! The store keeps todos flat, each optionally pointing at a parent. Every time
//! a new snapshot arrives the whole forest is rebuilt with a two-pass
//! index-then-link over an arena of nodes, so the cost stays O(n) regardless
//! of nesting depth.

use crate::types::Todo;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// What to do with a todo whose `parent_todo_id` does not resolve in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Leave the todo out of the forest entirely (default).
    #[default]
    Drop,
    /// Show the todo as an extra root.
    Promote,
}

impl OrphanPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "drop" => Some(OrphanPolicy::Drop),
            "promote" => Some(OrphanPolicy::Promote),
            _ => None,
        }
    }
}

/// A todo together with its subtasks, in render order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TodoNode {
    #[serde(flatten)]
    pub todo: Todo,
    pub subtasks: Vec<TodoNode>,
}

impl TodoNode {
    /// Number of nodes in this subtree, including the node itself.
    pub fn size(&self) -> usize {
        1 + self.subtasks.iter().map(TodoNode::size).sum::<usize>()
    }
}

/// Build the ordered forest for a snapshot.
///
/// Roots are sorted ascending by `created_at` (stable on input order); subtasks
/// keep their input order. Records caught in a parent cycle are never reachable
/// from a root and so never appear.
pub fn build_forest(records: &[Todo], policy: OrphanPolicy) -> Vec<TodoNode> {
    let index: HashMap<&str, usize> = records
        .iter()
        .enumerate()
        .map(|(i, todo)| (todo.id.as_str(), i))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
    let mut roots: Vec<usize> = Vec::new();

    for (i, todo) in records.iter().enumerate() {
        match todo.parent_todo_id.as_deref() {
            None => roots.push(i),
            Some(parent_id) => match index.get(parent_id) {
                Some(&parent) => children[parent].push(i),
                None => match policy {
                    OrphanPolicy::Drop => {
                        debug!(todo_id = %todo.id, parent_id = %parent_id, "Dropping orphaned todo");
                    }
                    OrphanPolicy::Promote => {
                        debug!(todo_id = %todo.id, parent_id = %parent_id, "Promoting orphaned todo to root");
                        roots.push(i);
                    }
                },
            },
        }
    }

    roots.sort_by_key(|&i| records[i].created_at);

    let mut placed = vec![false; records.len()];
    roots
        .into_iter()
        .filter_map(|i| materialize(i, records, &children, &mut placed))
        .collect()
}

fn materialize(
    i: usize,
    records: &[Todo],
    children: &[Vec<usize>],
    placed: &mut [bool],
) -> Option<TodoNode> {
    if placed[i] {
        return None;
    }
    placed[i] = true;

    let subtasks = children[i]
        .iter()
        .filter_map(|&c| materialize(c, records, children, placed))
        .collect();

    Some(TodoNode {
        todo: records[i].clone(),
        subtasks,
    })
}

/// Ids of every descendant of `root_id`, children before their parents.
///
/// Works on the raw records so it also reaches todos that the forest would hide.
/// The root itself is not included.
pub fn descendants_post_order(records: &[Todo], root_id: &str) -> Vec<String> {
    let mut by_parent: HashMap<&str, Vec<&str>> = HashMap::new();
    for todo in records {
        if let Some(parent_id) = todo.parent_todo_id.as_deref() {
            by_parent.entry(parent_id).or_default().push(todo.id.as_str());
        }
    }

    fn visit<'a>(
        id: &'a str,
        by_parent: &HashMap<&'a str, Vec<&'a str>>,
        seen: &mut Vec<&'a str>,
        out: &mut Vec<String>,
    ) {
        let Some(kids) = by_parent.get(id) else {
            return;
        };
        for &kid in kids {
            if seen.contains(&kid) {
                continue;
            }
            seen.push(kid);
            visit(kid, by_parent, seen, out);
            out.push(kid.to_string());
        }
    }

    let mut seen = vec![root_id];
    let mut out = Vec::new();
    visit(root_id, &by_parent, &mut seen, &mut out);
    out
}

/// Depth-first flattening for line-oriented rendering: `(depth, todo)` pairs.
pub fn flatten(forest: &[TodoNode]) -> Vec<(usize, &Todo)> {
    fn walk<'a>(nodes: &'a [TodoNode], depth: usize, out: &mut Vec<(usize, &'a Todo)>) {
        for node in nodes {
            out.push((depth, &node.todo));
            walk(&node.subtasks, depth + 1, out);
        }
    }

    let mut out = Vec::new();
    walk(forest, 0, &mut out);
    out
}

/// Counts for a snapshot and its rendered forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ForestStats {
    pub total: usize,
    pub shown: usize,
    pub done: usize,
    pub orphaned: usize,
}

impl ForestStats {
    pub fn compute(records: &[Todo], forest: &[TodoNode]) -> Self {
        let known: std::collections::HashSet<&str> =
            records.iter().map(|t| t.id.as_str()).collect();
        let orphaned = records
            .iter()
            .filter(|t| {
                t.parent_todo_id
                    .as_deref()
                    .is_some_and(|p| !known.contains(p))
            })
            .count();

        Self {
            total: records.len(),
            shown: forest.iter().map(TodoNode::size).sum(),
            done: records.iter().filter(|t| t.is_done).count(),
            orphaned,
        }
    }
}

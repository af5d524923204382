use crate::tree::DirectoryNode;
use log;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Checked state of every node, keyed by full path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSnapshot {
    states: HashMap<PathBuf, bool>,
}

impl SelectionSnapshot {
    pub fn get(&self, path: &Path) -> Option<bool> {
        self.states.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn checked_count(&self) -> usize {
        self.states.values().filter(|checked| **checked).count()
    }
}

pub fn snapshot(nodes: &[DirectoryNode]) -> SelectionSnapshot {
    let mut snap = SelectionSnapshot::default();
    for node in nodes {
        collect_states(node, &mut snap.states);
    }
    log::debug!(
        "Captured selection snapshot: {} nodes, {} checked",
        snap.len(),
        snap.checked_count()
    );
    snap
}

fn collect_states(node: &DirectoryNode, states: &mut HashMap<PathBuf, bool>) {
    states.insert(node.full_path().to_path_buf(), node.is_checked());
    for child in node.children() {
        collect_states(child, states);
    }
}

/// Reapplies a snapshot by exact path match, pre-order.
///
/// Each write cascades, and a parent is always written before its children, so a
/// child's own stored value overrides whatever its parent cascaded onto it.
/// Paths missing from the snapshot keep their current (freshly built) value.
pub fn restore(nodes: &mut [DirectoryNode], snap: &SelectionSnapshot) -> usize {
    let mut restored = 0;
    for node in nodes.iter_mut() {
        restored += restore_node(node, snap);
    }
    log::debug!("Restored checked state on {} nodes", restored);
    restored
}

fn restore_node(node: &mut DirectoryNode, snap: &SelectionSnapshot) -> usize {
    let mut restored = 0;
    if let Some(checked) = snap.get(node.full_path()) {
        node.set_checked(checked);
        restored += 1;
    }
    for child in node.children_mut() {
        restored += restore_node(child, snap);
    }
    restored
}

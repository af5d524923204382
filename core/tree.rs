use crate::error::{AppError, Result};
use crate::skip_policy::{SkipSwitches, should_skip_directory, should_skip_file};
use log;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

/// One scanned filesystem entry with its inclusion flag.
///
/// The kind is captured at build time, so an empty directory stays a directory.
/// `is_checked` only changes through [`DirectoryNode::set_checked`], which cascades
/// to the whole subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryNode {
    name: String,
    full_path: PathBuf,
    kind: NodeKind,
    is_checked: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<DirectoryNode>,
}

impl DirectoryNode {
    pub fn file(full_path: impl Into<PathBuf>) -> Self {
        Self::new(full_path.into(), NodeKind::File, Vec::new())
    }

    pub fn directory(full_path: impl Into<PathBuf>, children: Vec<DirectoryNode>) -> Self {
        Self::new(full_path.into(), NodeKind::Directory, children)
    }

    fn new(full_path: PathBuf, kind: NodeKind, children: Vec<DirectoryNode>) -> Self {
        let name = display_name(&full_path);
        Self {
            name,
            full_path,
            kind,
            is_checked: false,
            children,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn is_checked(&self) -> bool {
        self.is_checked
    }

    pub fn children(&self) -> &[DirectoryNode] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut [DirectoryNode] {
        &mut self.children
    }

    /// Sets the flag on this node and overwrites it on every descendant.
    pub fn set_checked(&mut self, checked: bool) {
        let mut stack: Vec<&mut DirectoryNode> = vec![self];
        while let Some(node) = stack.pop() {
            node.is_checked = checked;
            stack.extend(node.children.iter_mut());
        }
    }

    pub fn find(&self, path: &Path) -> Option<&DirectoryNode> {
        if self.full_path == path {
            return Some(self);
        }
        if !path.starts_with(&self.full_path) {
            return None;
        }
        self.children.iter().find_map(|child| child.find(path))
    }

    pub fn find_mut(&mut self, path: &Path) -> Option<&mut DirectoryNode> {
        if self.full_path == path {
            return Some(self);
        }
        if !path.starts_with(&self.full_path) {
            return None;
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_mut(path))
    }

    /// Number of nodes in this subtree, including itself.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(DirectoryNode::count).sum::<usize>()
    }
}

pub fn find_in_forest_mut<'a>(
    nodes: &'a mut [DirectoryNode],
    path: &Path,
) -> Option<&'a mut DirectoryNode> {
    nodes.iter_mut().find_map(|node| node.find_mut(path))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Shared flag used to stop a running scan between directories.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Scans `root` into a node tree.
///
/// Returns `Ok(None)` when the root directory itself is excluded by the skip policy.
/// Unreadable subdirectories become empty directory nodes.
pub fn build_tree(
    root: &Path,
    switches: &SkipSwitches,
    cancel: &CancelFlag,
) -> Result<Option<DirectoryNode>> {
    if !root.is_dir() {
        return Err(AppError::RootNotFound {
            path: root.to_path_buf(),
        });
    }
    log::info!("Scanning directory tree: {}", root.display());
    let tree = build_directory(root, switches, cancel)?;
    match &tree {
        Some(node) => log::info!("Scan complete. {} nodes loaded.", node.count()),
        None => log::info!("Root '{}' is excluded by skip policy.", root.display()),
    }
    Ok(tree)
}

fn build_directory(
    dir: &Path,
    switches: &SkipSwitches,
    cancel: &CancelFlag,
) -> Result<Option<DirectoryNode>> {
    if cancel.is_cancelled() {
        log::debug!("Scan cancelled before entering {}", dir.display());
        return Err(AppError::ScanCancelled);
    }
    let name = display_name(dir);
    if should_skip_directory(&name, switches) {
        log::trace!("Skipping directory by policy: {}", dir.display());
        return Ok(None);
    }

    let mut subdirectories = Vec::<PathBuf>::new();
    let mut files = Vec::<PathBuf>::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false);
    for entry_result in walker {
        match entry_result {
            Ok(entry) => {
                let file_type = entry.file_type();
                let path = entry.into_path();
                if file_type.is_dir() {
                    subdirectories.push(path);
                } else if file_type.is_file() || path.is_file() {
                    files.push(path);
                } else {
                    log::trace!("Skipping non-regular entry: {}", path.display());
                }
            }
            Err(e) => {
                let err = AppError::ScanIo {
                    path: e.path().unwrap_or(dir).to_path_buf(),
                    source: e.into(),
                };
                log::warn!("{}", err);
            }
        }
    }

    let mut children = Vec::with_capacity(subdirectories.len() + files.len());
    for subdirectory in subdirectories {
        if let Some(child) = build_directory(&subdirectory, switches, cancel)? {
            children.push(child);
        }
    }
    for file in files {
        if should_skip_file(&file) {
            log::trace!("Skipping file by policy: {}", file.display());
            continue;
        }
        children.push(DirectoryNode::file(file));
    }
    log::trace!(
        "Built directory {} with {} children",
        dir.display(),
        children.len()
    );
    Ok(Some(DirectoryNode::directory(dir, children)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(root.join("src/a.txt"), "a\n").unwrap();
        fs::write(root.join("src/nested/b.rs"), "fn b() {}\n").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "x").unwrap();
        fs::write(root.join("app.exe"), "MZ").unwrap();
        fs::write(root.join(".gitignore"), "target").unwrap();
        fs::write(root.join("README.md"), "# hi\n").unwrap();
        dir
    }

    fn child_names(node: &DirectoryNode) -> Vec<&str> {
        node.children().iter().map(DirectoryNode::name).collect()
    }

    #[test]
    fn builds_tree_with_policy_applied() {
        let dir = fixture();
        let tree = build_tree(dir.path(), &SkipSwitches::default(), &CancelFlag::new())
            .unwrap()
            .unwrap();

        let mut names = child_names(&tree);
        names.sort();
        assert_eq!(names, vec!["README.md", "empty", "src"]);
        assert!(!tree.is_checked());

        let empty = tree.find(&dir.path().join("empty")).unwrap();
        assert!(empty.is_directory());
        assert!(empty.children().is_empty());

        let nested = tree.find(&dir.path().join("src/nested/b.rs")).unwrap();
        assert!(nested.is_file());
        assert_eq!(nested.name(), "b.rs");
    }

    #[test]
    fn directories_precede_files() {
        let dir = fixture();
        let tree = build_tree(dir.path(), &SkipSwitches::default(), &CancelFlag::new())
            .unwrap()
            .unwrap();
        let kinds: Vec<NodeKind> = tree.children().iter().map(DirectoryNode::kind).collect();
        let first_file = kinds.iter().position(|k| *k == NodeKind::File).unwrap();
        assert!(kinds[first_file..].iter().all(|k| *k == NodeKind::File));
    }

    #[test]
    fn disabled_switch_keeps_directory() {
        let dir = fixture();
        let switches = SkipSwitches {
            skip_node_modules: false,
            ..SkipSwitches::default()
        };
        let tree = build_tree(dir.path(), &switches, &CancelFlag::new())
            .unwrap()
            .unwrap();
        assert!(
            tree.find(&dir.path().join("node_modules/pkg/index.js"))
                .is_some()
        );
    }

    #[test]
    fn skipped_root_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("node_modules");
        fs::create_dir_all(&root).unwrap();
        let tree = build_tree(&root, &SkipSwitches::default(), &CancelFlag::new()).unwrap();
        assert!(tree.is_none());
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_tree(
            &dir.path().join("nope"),
            &SkipSwitches::default(),
            &CancelFlag::new(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::RootNotFound { .. }));
    }

    #[test]
    fn cancelled_scan_stops() {
        let dir = fixture();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = build_tree(dir.path(), &SkipSwitches::default(), &cancel).unwrap_err();
        assert!(matches!(err, AppError::ScanCancelled));
    }

    #[test]
    fn set_checked_cascades_both_ways() {
        let mut tree = DirectoryNode::directory(
            "/r",
            vec![
                DirectoryNode::directory(
                    "/r/d",
                    vec![DirectoryNode::file("/r/d/x"), DirectoryNode::file("/r/d/y")],
                ),
                DirectoryNode::file("/r/z"),
            ],
        );
        tree.find_mut(Path::new("/r/d/x")).unwrap().set_checked(true);
        tree.set_checked(true);
        assert!(all_checked(&tree, true));
        tree.set_checked(false);
        assert!(all_checked(&tree, false));

        tree.find_mut(Path::new("/r/d")).unwrap().set_checked(true);
        tree.find_mut(Path::new("/r/d/y")).unwrap().set_checked(false);
        let d = tree.find(Path::new("/r/d")).unwrap();
        assert!(d.is_checked(), "unchecking a child must not propagate upward");
        assert!(!tree.is_checked());
    }

    #[test]
    fn nodes_serialize_with_kind_and_flag() {
        let node = DirectoryNode::file("/p/a.rs");
        let yaml = serde_yml::to_string(&node).unwrap();
        assert!(yaml.contains("name: a.rs"));
        assert!(yaml.contains("kind: file"));
        assert!(yaml.contains("isChecked: false"));
        assert!(!yaml.contains("children"));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_becomes_empty_node() {
        use std::os::unix::fs::PermissionsExt;
        let dir = fixture();
        let locked = dir.path().join("locked");
        fs::create_dir_all(&locked).unwrap();
        fs::write(locked.join("hidden.txt"), "h").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Running as root: permissions are not enforced.
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let built = build_tree(dir.path(), &SkipSwitches::default(), &CancelFlag::new());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        let tree = built.unwrap().unwrap();

        let node = tree.find(&locked).unwrap();
        assert!(node.is_directory());
        assert!(node.children().is_empty());
        assert!(tree.find(&dir.path().join("src/a.txt")).is_some());
    }

    fn all_checked(node: &DirectoryNode, value: bool) -> bool {
        node.is_checked() == value && node.children().iter().all(|c| all_checked(c, value))
    }
}

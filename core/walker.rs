use crate::chunking::{ChunkSettings, format_file_blocks};
use crate::extract::{LineRange, RedactionRule, extract_content};
use crate::languages::LanguageTable;
use crate::tree::DirectoryNode;
use log;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Everything the walker needs to turn a selected file into output blocks.
#[derive(Debug, Clone, Copy)]
pub struct WalkOptions<'a> {
    pub rules: &'a [RedactionRule],
    pub chunking: ChunkSettings,
    pub line_range: LineRange,
    pub languages: &'a LanguageTable,
}

/// Files in scope for output, in tree order.
///
/// A checked directory brings in every descendant file whatever their own flags;
/// an unchecked directory is searched for checked files and checked subdirectories.
pub fn collect_selected_files(nodes: &[DirectoryNode]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for node in nodes {
        collect_node(node, &mut files);
    }
    files
}

fn collect_node(node: &DirectoryNode, files: &mut Vec<PathBuf>) {
    if node.is_file() {
        if node.is_checked() {
            files.push(node.full_path().to_path_buf());
        }
        return;
    }
    if node.is_checked() {
        collect_all_files(node, files);
    } else {
        for child in node.children() {
            collect_node(child, files);
        }
    }
}

fn collect_all_files(node: &DirectoryNode, files: &mut Vec<PathBuf>) {
    if node.is_file() {
        files.push(node.full_path().to_path_buf());
        return;
    }
    for child in node.children() {
        collect_all_files(child, files);
    }
}

fn render_file(path: &Path, options: &WalkOptions<'_>) -> Option<String> {
    if !path.exists() {
        log::debug!("Selected file no longer exists, skipping: {}", path.display());
        return None;
    }
    match extract_content(path, options.rules, options.line_range) {
        Ok(text) => Some(format_file_blocks(
            path,
            &text,
            &options.chunking,
            options.languages,
        )),
        Err(e) => {
            log::warn!("Omitting file from output: {}", e);
            None
        }
    }
}

/// Concatenated code blocks for every in-scope file.
///
/// Files are read in parallel but emitted in tree order. Unreadable or vanished
/// files are left out without failing the walk.
pub fn walk_selection(nodes: &[DirectoryNode], options: &WalkOptions<'_>) -> String {
    let files = collect_selected_files(nodes);
    log::info!("Extracting content for {} selected files...", files.len());
    let blocks: Vec<Option<String>> = files
        .par_iter()
        .map(|path| render_file(path, options))
        .collect();
    let emitted = blocks.iter().filter(|b| b.is_some()).count();
    log::debug!("Emitted {} of {} selected files", emitted, files.len());
    blocks.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct Fixture {
        _dir: tempfile::TempDir,
        tree: DirectoryNode,
        a: PathBuf,
        b: PathBuf,
        src: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let a = src.join("a.txt");
        let b = src.join("b.txt");
        fs::write(&a, "alpha 1\nalpha 2\nalpha 3\n").unwrap();
        fs::write(&b, "beta\n").unwrap();
        let tree = DirectoryNode::directory(
            dir.path(),
            vec![DirectoryNode::directory(
                &src,
                vec![DirectoryNode::file(&a), DirectoryNode::file(&b)],
            )],
        );
        Fixture {
            _dir: dir,
            tree,
            a,
            b,
            src,
        }
    }

    fn walk(tree: &DirectoryNode) -> String {
        let languages = LanguageTable::builtin();
        let options = WalkOptions {
            rules: &[],
            chunking: ChunkSettings::disabled(),
            line_range: LineRange::full(),
            languages: &languages,
        };
        walk_selection(std::slice::from_ref(tree), &options)
    }

    #[test]
    fn only_checked_files_under_unchecked_folder() {
        let mut fx = fixture();
        fx.tree.find_mut(&fx.a).unwrap().set_checked(true);
        let out = walk(&fx.tree);
        assert!(out.contains("alpha 1\nalpha 2\nalpha 3"));
        assert!(!out.contains("beta"));
    }

    #[test]
    fn checked_folder_includes_every_descendant() {
        let mut fx = fixture();
        fx.tree.find_mut(&fx.src).unwrap().set_checked(true);
        fx.tree.find_mut(&fx.b).unwrap().set_checked(false);
        let out = walk(&fx.tree);
        assert!(out.contains("alpha 1"));
        assert!(out.contains("beta"));
        let a_pos = out.find("alpha").unwrap();
        let b_pos = out.find("beta").unwrap();
        assert!(a_pos < b_pos, "tree order must be preserved");
    }

    #[test]
    fn vanished_file_is_skipped() {
        let mut fx = fixture();
        fx.tree.find_mut(&fx.src).unwrap().set_checked(true);
        fs::remove_file(&fx.a).unwrap();
        let out = walk(&fx.tree);
        assert!(!out.contains("a.txt"));
        assert!(out.contains("beta"));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_is_omitted_and_walk_continues() {
        use std::os::unix::fs::PermissionsExt;
        let mut fx = fixture();
        fx.tree.find_mut(&fx.src).unwrap().set_checked(true);
        fs::set_permissions(&fx.a, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read(&fx.a).is_ok() {
            // Running as root: permissions are not enforced.
            return;
        }
        let out = walk(&fx.tree);
        fs::set_permissions(&fx.a, fs::Permissions::from_mode(0o644)).unwrap();
        assert!(!out.contains("a.txt"));
        assert!(out.contains("beta"));
    }

    #[test]
    fn non_utf8_file_is_emitted_lossily() {
        let mut fx = fixture();
        fs::write(&fx.a, b"ok \xff\xfe end\n").unwrap();
        fx.tree.find_mut(&fx.src).unwrap().set_checked(true);
        let out = walk(&fx.tree);
        assert!(out.contains("ok \u{FFFD}\u{FFFD} end"));
        assert!(out.contains("beta"));
    }

    #[test]
    fn checked_empty_directory_emits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty");
        fs::create_dir_all(&empty).unwrap();
        let mut tree = DirectoryNode::directory(&empty, Vec::new());
        tree.set_checked(true);
        assert_eq!(walk(&tree), "");
        assert!(collect_selected_files(std::slice::from_ref(&tree)).is_empty());
    }

    #[test]
    fn checked_subdirectory_under_unchecked_parent() {
        let fx = fixture();
        let mut tree = fx.tree.clone();
        tree.find_mut(&fx.src).unwrap().set_checked(true);
        let files = collect_selected_files(std::slice::from_ref(&tree));
        assert_eq!(files, vec![fx.a.clone(), fx.b.clone()]);
    }
}

use serde::{Deserialize, Serialize};
use std::path::Path;

/// File names that are never part of a scan.
pub const IGNORED_FILE_NAMES: &[&str] = &[".gitignore"];

/// Extensions (without the dot) that are never part of a scan.
pub const DENIED_EXTENSIONS: &[&str] = &["exe", "pdb", "dll", "obj", "cache"];

/// Named switches deciding which well-known build/VCS/dependency directories are skipped.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SkipSwitches {
    #[serde(default = "default_true")]
    pub skip_bin: bool,
    #[serde(default = "default_true")]
    pub skip_obj: bool,
    #[serde(default = "default_true")]
    pub skip_vs_dir: bool,
    #[serde(default = "default_true")]
    pub skip_git_dir: bool,
    #[serde(default = "default_true")]
    pub skip_node_modules: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SkipSwitches {
    fn default() -> Self {
        Self {
            skip_bin: default_true(),
            skip_obj: default_true(),
            skip_vs_dir: default_true(),
            skip_git_dir: default_true(),
            skip_node_modules: default_true(),
        }
    }
}

impl SkipSwitches {
    /// Switches with every skip disabled.
    pub fn none() -> Self {
        Self {
            skip_bin: false,
            skip_obj: false,
            skip_vs_dir: false,
            skip_git_dir: false,
            skip_node_modules: false,
        }
    }

    fn table(&self) -> [(&'static str, bool); 5] {
        [
            ("bin", self.skip_bin),
            ("obj", self.skip_obj),
            (".vs", self.skip_vs_dir),
            (".git", self.skip_git_dir),
            ("node_modules", self.skip_node_modules),
        ]
    }
}

pub fn should_skip_directory(name: &str, switches: &SkipSwitches) -> bool {
    switches
        .table()
        .iter()
        .any(|(well_known, enabled)| *enabled && name.eq_ignore_ascii_case(well_known))
}

pub fn should_skip_file(path: &Path) -> bool {
    let name_ignored = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| {
            IGNORED_FILE_NAMES
                .iter()
                .any(|ignored| name.eq_ignore_ascii_case(ignored))
        });
    if name_ignored {
        return true;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            DENIED_EXTENSIONS
                .iter()
                .any(|denied| ext.eq_ignore_ascii_case(denied))
        })
}

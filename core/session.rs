use crate::assembly::{AssembledPrompt, AssemblySettings, assemble_prompt};
use crate::error::{AppError, Result};
use crate::prompt::{PromptAssembler, PromptFields};
use crate::render::render_tree;
use crate::selection::{self, SelectionSnapshot};
use crate::skip_policy::SkipSwitches;
use crate::tree::{CancelFlag, DirectoryNode, build_tree, find_in_forest_mut};
use crate::walker::collect_selected_files;
use log;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
}

/// Holds the session in `Scanning` for as long as it lives.
///
/// Dropping it cancels the worker and reopens the session.
#[derive(Debug)]
struct ScanGate {
    busy: Arc<AtomicBool>,
    cancel: CancelFlag,
}

impl Drop for ScanGate {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// A rebuild running on a worker thread.
///
/// Hand it back to [`FolderSession::complete_rescan`] to swap the new tree in.
/// Dropping it instead abandons the rebuild and returns the session to idle.
#[derive(Debug)]
pub struct PendingScan {
    snapshot: SelectionSnapshot,
    cancel: CancelFlag,
    handle: JoinHandle<Result<Option<DirectoryNode>>>,
    gate: ScanGate,
}

impl PendingScan {
    /// Asks the worker to stop before its next directory.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// The loaded tree for one folder plus the idle/scanning gate around it.
#[derive(Debug)]
pub struct FolderSession {
    root: PathBuf,
    switches: SkipSwitches,
    nodes: Vec<DirectoryNode>,
    scanning: Arc<AtomicBool>,
}

impl FolderSession {
    pub fn open(root: &Path, switches: SkipSwitches) -> Result<Self> {
        let tree = build_tree(root, &switches, &CancelFlag::new())?;
        Ok(Self {
            root: root.to_path_buf(),
            switches,
            nodes: tree.into_iter().collect(),
            scanning: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn nodes(&self) -> &[DirectoryNode] {
        &self.nodes
    }

    pub fn state(&self) -> ScanState {
        if self.scanning.load(Ordering::SeqCst) {
            ScanState::Scanning
        } else {
            ScanState::Idle
        }
    }

    pub fn switches(&self) -> &SkipSwitches {
        &self.switches
    }

    fn ensure_idle(&self) -> Result<()> {
        match self.state() {
            ScanState::Idle => Ok(()),
            ScanState::Scanning => Err(AppError::ScanInProgress),
        }
    }

    /// Toggles a node by full path; the new value cascades to its subtree.
    pub fn set_checked(&mut self, path: &Path, checked: bool) -> Result<()> {
        self.ensure_idle()?;
        let node = find_in_forest_mut(&mut self.nodes, path).ok_or_else(|| {
            AppError::NodeNotFound {
                path: path.to_path_buf(),
            }
        })?;
        node.set_checked(checked);
        log::debug!("Set checked={} on {}", checked, path.display());
        Ok(())
    }

    /// New switches apply from the next rescan.
    pub fn set_switches(&mut self, switches: SkipSwitches) -> Result<()> {
        self.ensure_idle()?;
        self.switches = switches;
        Ok(())
    }

    pub fn begin_rescan(&mut self) -> Result<PendingScan> {
        self.begin_rescan_with(CancelFlag::new())
    }

    pub fn begin_rescan_with(&mut self, cancel: CancelFlag) -> Result<PendingScan> {
        if self.scanning.swap(true, Ordering::SeqCst) {
            return Err(AppError::ScanInProgress);
        }
        let gate = ScanGate {
            busy: Arc::clone(&self.scanning),
            cancel: cancel.clone(),
        };
        let snapshot = selection::snapshot(&self.nodes);
        let root = self.root.clone();
        let switches = self.switches;
        let worker_cancel = cancel.clone();
        let handle = thread::Builder::new()
            .name("xprompt-scan".to_string())
            .spawn(move || build_tree(&root, &switches, &worker_cancel))
            .map_err(AppError::Io)?;
        log::info!("Rescan started for {}", self.root.display());
        Ok(PendingScan {
            snapshot,
            cancel,
            handle,
            gate,
        })
    }

    /// Waits for the worker, restores the snapshot into the new tree and swaps it in.
    ///
    /// On any failure the previous tree stays loaded. The session is idle afterwards
    /// either way.
    pub fn complete_rescan(&mut self, pending: PendingScan) -> Result<()> {
        let PendingScan {
            snapshot,
            handle,
            gate,
            ..
        } = pending;
        let outcome = handle
            .join()
            .map_err(|_| AppError::Io(io::Error::other("scan worker panicked")));
        drop(gate);

        let tree = match outcome.and_then(|built| built) {
            Ok(tree) => tree,
            Err(e) => {
                log::warn!("Rescan failed, keeping previous tree: {}", e);
                return Err(e);
            }
        };
        let mut nodes: Vec<DirectoryNode> = tree.into_iter().collect();
        selection::restore(&mut nodes, &snapshot);
        self.nodes = nodes;
        log::info!("Rescan complete for {}", self.root.display());
        Ok(())
    }

    pub fn rescan(&mut self) -> Result<()> {
        let pending = self.begin_rescan()?;
        self.complete_rescan(pending)
    }

    pub fn selected_files(&self) -> Vec<PathBuf> {
        collect_selected_files(&self.nodes)
    }

    pub fn render_outline(&self) -> String {
        render_tree(&self.nodes, 0)
    }

    pub fn assemble(
        &self,
        settings: &AssemblySettings,
        fields: &PromptFields,
        assembler: &dyn PromptAssembler,
    ) -> Result<AssembledPrompt> {
        assemble_prompt(&self.nodes, settings, fields, assembler)
    }
}

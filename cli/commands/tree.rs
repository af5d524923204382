use crate::cli_args::TreeArgs;
use crate::load_config_for_command;
use crate::output::{print_json, write_to_stdout};
use anyhow::{Context, Result};
use log;
use xprompt_core::{Config, FolderSession};

pub fn handle_tree_command(args: TreeArgs) -> Result<()> {
    let project_root = Config::determine_project_root(args.project_config.project_root.as_ref())
        .context("Failed to determine project root")?;

    let config = load_config_for_command(
        &project_root,
        &args.project_config,
        Some(&args.scan_toggles),
        None,
    )
    .context("Failed to load configuration for tree command")?;

    let session = FolderSession::open(&project_root, config.scan)
        .context("Failed to scan project root")?;
    log::info!(
        "Scanned {} nodes under {}",
        session.nodes().iter().map(|n| n.count()).sum::<usize>(),
        project_root.display()
    );

    match args.format_output.format.as_deref() {
        Some("json") => print_json(&session.nodes()),
        _ => write_to_stdout(&session.render_outline()),
    }
}

use crate::cli_args::AssembleArgs;
use crate::commands::{apply_selection, build_prompt, report_tokens};
use crate::output::emit_prompt;
use crate::{load_config_for_command, prompt_fields_from_args};
use anyhow::{Context, Result};
use log;
use xprompt_core::{Config, FolderSession};

pub fn handle_assemble_command(args: AssembleArgs, quiet: bool) -> Result<()> {
    let project_root = Config::determine_project_root(args.project_config.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let config = load_config_for_command(
        &project_root,
        &args.project_config,
        Some(&args.scan_toggles),
        Some(&args.assembly),
    )
    .context("Failed to load configuration for assemble command")?;

    let mut session = FolderSession::open(&project_root, config.scan)
        .context("Failed to scan project root")?;
    apply_selection(&mut session, &args.selection)?;
    log::debug!("{} files selected", session.selected_files().len());

    let fields = prompt_fields_from_args(&args.fields)?;
    let prompt = build_prompt(&session, &config, &fields)?;
    emit_prompt(&prompt.text, args.output.as_deref(), quiet)?;

    if args.tokens {
        report_tokens(&prompt.text, &config.prompt.model)?;
    }
    Ok(())
}

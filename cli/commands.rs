pub mod assemble;
pub mod completion;
pub mod config;
pub mod debug;
pub mod session;
pub mod tree;

use crate::cli_args::SelectionOpts;
use anyhow::{Context, Result};
use colored::*;
use log;
use std::path::{Path, PathBuf};
use xprompt_core::{
    AssembledPrompt, AssemblySettings, Config, FolderSession, PromptFields, TemplateAssembler,
    TikTokenEstimator, TokenEstimator,
};

/// Maps a user-supplied path onto the full path used by the loaded tree.
pub(crate) fn resolve_selection_path(project_root: &Path, raw: &Path) -> PathBuf {
    if raw.is_relative() {
        return project_root.join(raw);
    }
    if raw.starts_with(project_root) {
        return raw.to_path_buf();
    }
    raw.canonicalize().unwrap_or_else(|_| raw.to_path_buf())
}

pub(crate) fn apply_selection(session: &mut FolderSession, selection: &SelectionOpts) -> Result<()> {
    let project_root = session.root().to_path_buf();
    if selection.select_all {
        session
            .set_checked(&project_root, true)
            .context("Failed to select the project root")?;
    }
    for raw in &selection.select {
        let path = resolve_selection_path(&project_root, raw);
        session
            .set_checked(&path, true)
            .with_context(|| format!("Failed to select '{}'", raw.display()))?;
    }
    Ok(())
}

pub(crate) fn assembler_for(config: &Config, project_root: &Path) -> Result<TemplateAssembler> {
    let assembler = match &config.prompt.template_file {
        Some(path) => TemplateAssembler::from_file(&project_root.join(path))
            .context("Failed to load custom template file")?,
        None => TemplateAssembler::builtin(config.prompt.template)
            .context("Failed to load built-in template")?,
    };
    Ok(assembler)
}

/// Resolves settings from config, logs rule diagnostics and assembles the current selection.
pub(crate) fn build_prompt(
    session: &FolderSession,
    config: &Config,
    fields: &PromptFields,
) -> Result<AssembledPrompt> {
    let (settings, diagnostics) = AssemblySettings::from_config(config, session.root())
        .context("Failed to resolve assembly settings")?;
    for diagnostic in &diagnostics {
        if diagnostic.is_per_entry() {
            log::warn!("Skipping redaction rule: {}", diagnostic);
        } else {
            log::error!("Redaction setup problem: {}", diagnostic);
        }
    }
    let assembler = assembler_for(config, session.root())?;
    let prompt = session
        .assemble(&settings, fields, &assembler)
        .context("Failed to assemble prompt")?;
    if prompt.selected_files == 0 {
        log::warn!("No files are selected; the code section is empty.");
    }
    Ok(prompt)
}

pub(crate) fn report_tokens(text: &str, model: &str) -> Result<()> {
    let count = TikTokenEstimator::new()
        .estimate(text, model)
        .context("Failed to estimate token count")?;
    eprintln!(
        "{} {} ({})",
        "Estimated tokens:".green(),
        count.to_string().cyan(),
        model.dimmed()
    );
    Ok(())
}

use crate::chunking::ChunkSettings;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::extract::{LineRange, RedactionRule};
use crate::languages::LanguageTable;
use crate::prompt::{PromptAssembler, PromptFields, directory_structure_section};
use crate::render::render_tree;
use crate::tree::DirectoryNode;
use crate::walker::{WalkOptions, collect_selected_files, walk_selection};
use log;
use std::path::Path;

/// Resolved, ready-to-use settings for one assembly run.
#[derive(Debug, Clone)]
pub struct AssemblySettings {
    pub rules: Vec<RedactionRule>,
    pub chunking: ChunkSettings,
    pub line_range: LineRange,
    pub languages: LanguageTable,
    pub include_tree: bool,
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            chunking: ChunkSettings::disabled(),
            line_range: LineRange::full(),
            languages: LanguageTable::builtin(),
            include_tree: true,
        }
    }
}

impl AssemblySettings {
    /// Builds settings from configuration; rule diagnostics are returned, not raised.
    pub fn from_config(config: &Config, project_root: &Path) -> Result<(Self, Vec<AppError>)> {
        config.chunking.validate()?;
        let (rules, diagnostics) = config.resolve_redaction_rules(project_root);
        let settings = Self {
            rules,
            chunking: config.chunking,
            line_range: config.line_range(),
            languages: config.language_table(),
            include_tree: config.prompt.include_tree,
        };
        Ok((settings, diagnostics))
    }

    pub fn walk_options(&self) -> WalkOptions<'_> {
        WalkOptions {
            rules: &self.rules,
            chunking: self.chunking,
            line_range: self.line_range,
            languages: &self.languages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    pub text: String,
    pub selected_files: usize,
}

pub fn assemble_prompt(
    nodes: &[DirectoryNode],
    settings: &AssemblySettings,
    fields: &PromptFields,
    assembler: &dyn PromptAssembler,
) -> Result<AssembledPrompt> {
    settings.chunking.validate()?;
    let selected_files = collect_selected_files(nodes).len();
    let code_section = walk_selection(nodes, &settings.walk_options());
    let tree_section = if settings.include_tree {
        directory_structure_section(&render_tree(nodes, 0))
    } else {
        String::new()
    };
    let text = assembler.assemble(fields, &code_section, &tree_section)?;
    log::info!(
        "Assembled prompt: {} selected files, {} bytes",
        selected_files,
        text.len()
    );
    Ok(AssembledPrompt {
        text,
        selected_files,
    })
}

use crate::cli_args::DebugArgs;
use crate::commands::apply_selection;
use crate::load_config_for_command;
use crate::output::{display_relative, print_json, print_rules_table, print_section_header};
use anyhow::{Context, Result};
use colored::*;
use log;
use serde::Serialize;
use std::path::Path;
use xprompt_core::{Config, FolderSession};

#[derive(Debug, Serialize)]
struct RuleInfo {
    pattern: String,
    replacement: String,
}

#[derive(Debug, Serialize)]
struct DebugInfo<'a> {
    project_root: String,
    effective_config: &'a Config,
    node_count: usize,
    selected_files: Vec<String>,
    redaction_rules: Vec<RuleInfo>,
    rule_diagnostics: Vec<String>,
}

pub fn handle_debug_command(args: DebugArgs) -> Result<()> {
    let project_root = Config::determine_project_root(args.project_config.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let config = load_config_for_command(
        &project_root,
        &args.project_config,
        Some(&args.scan_toggles),
        Some(&args.assembly),
    )
    .context("Failed to load configuration for debug command")?;

    let mut session = FolderSession::open(&project_root, config.scan)
        .context("Failed to scan project root")?;
    apply_selection(&mut session, &args.selection)?;

    let (rules, diagnostics) = config.resolve_redaction_rules(&project_root);
    let debug_data = DebugInfo {
        project_root: project_root.display().to_string(),
        effective_config: &config,
        node_count: session.nodes().iter().map(|n| n.count()).sum(),
        selected_files: session
            .selected_files()
            .iter()
            .map(|f| display_relative(f, &project_root))
            .collect(),
        redaction_rules: rules
            .iter()
            .map(|r| RuleInfo {
                pattern: r.pattern().to_string(),
                replacement: r.replacement().to_string(),
            })
            .collect(),
        rule_diagnostics: diagnostics.iter().map(|d| d.to_string()).collect(),
    };

    match args.format_output.format.as_deref() {
        Some("json") => print_json(&debug_data),
        _ => {
            print_debug_info_pretty(&debug_data, &project_root)?;
            print_section_header("Redaction Rules");
            print_rules_table(&rules);
            if !debug_data.rule_diagnostics.is_empty() {
                print_path_list("Rule Diagnostics", &debug_data.rule_diagnostics);
            }
            println!("{}", "\n--- End Debug Info ---".green().bold());
            Ok(())
        }
    }
}

fn print_debug_info_pretty(debug_info: &DebugInfo, project_root: &Path) -> Result<()> {
    print_section_header("Effective Configuration");
    let config_toml = debug_info
        .effective_config
        .to_toml_string()
        .context("Failed to serialize effective config to TOML")?;
    println!("{}", config_toml);

    print_section_header("Scan");
    println!(
        "{:<16} {}",
        "Project root:".green(),
        project_root.display().to_string().blue()
    );
    println!(
        "{:<16} {}",
        "Nodes:".green(),
        debug_info.node_count.to_string().cyan()
    );

    print_path_list("Selected Files", &debug_info.selected_files);
    Ok(())
}

fn print_path_list(title: &str, paths: &[String]) {
    print_section_header(title);
    if paths.is_empty() {
        println!("{}", "(None)".dimmed());
    } else {
        paths.iter().for_each(|p| println!("- {}", p.cyan()));
    }
}

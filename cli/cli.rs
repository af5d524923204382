mod cli_args;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use log;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use cli_args::{AssemblyOpts, Cli, Commands, ProjectConfigOpts, PromptFieldOpts, ScanTogglesGroup};
use xprompt_core::{AppError, Config, PromptFields, PromptTemplate};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);
    let quiet = cli_args.quiet;
    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("xprompt finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = exit_code_for(e.downcast_ref::<AppError>());
            if !quiet || exit_code == 1 || exit_code == 5 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("xprompt failed: {:#}", e);
            }
            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn exit_code_for(err: Option<&AppError>) -> i32 {
    match err {
        Some(AppError::Config(_)) => 1,
        Some(AppError::TomlParse(_)) => 1,
        Some(AppError::TomlSerialize(_)) => 1,
        Some(AppError::DataLoading(_)) => 1,
        Some(AppError::Template(_)) => 1,
        Some(AppError::RootNotFound { .. }) => 2,
        Some(AppError::ScanIo { .. }) => 2,
        Some(AppError::FileRead { .. }) => 2,
        Some(AppError::Io(_)) => 2,
        Some(AppError::ScanInProgress) => 3,
        Some(AppError::ScanCancelled) => 3,
        Some(AppError::InvalidArgument(_)) => 5,
        Some(AppError::NodeNotFound { .. }) => 5,
        Some(AppError::InvalidRule { .. }) => 5,
        Some(AppError::PatternCompile { .. }) => 5,
        Some(AppError::TikToken(_)) => 8,
        Some(_) => 1,
        None => 1,
    }
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };
    match command {
        Commands::Assemble(args) => {
            log::debug!("Executing 'assemble' command...");
            commands::assemble::handle_assemble_command(args, quiet)?;
        }
        Commands::Tree(args) => {
            log::debug!("Executing 'tree' command...");
            commands::tree::handle_tree_command(args)?;
        }
        Commands::Session(args) => {
            log::debug!("Executing 'session' command...");
            commands::session::handle_session_command(args, quiet)?;
        }
        Commands::Debug(args) => {
            log::debug!("Executing 'debug' command...");
            commands::debug::handle_debug_command(args)?;
        }
        Commands::Completion(args) => {
            log::debug!("Executing 'completion' command...");
            commands::completion::handle_completion_command(&args, quiet)?;
        }
        Commands::Config(args) => {
            log::debug!("Executing 'config' command...");
            let project_root =
                Config::determine_project_root(args.project_config.project_root.as_ref())
                    .context("Failed to determine project root for config command")?;
            commands::config::handle_config_command(&args, &project_root, quiet)?;
        }
    }
    Ok(())
}

fn merge_scan_toggles(config: &mut Config, toggles: &ScanTogglesGroup) {
    if toggles.keep_bin {
        config.scan.skip_bin = false;
    }
    if toggles.keep_obj {
        config.scan.skip_obj = false;
    }
    if toggles.keep_vs {
        config.scan.skip_vs_dir = false;
    }
    if toggles.keep_git {
        config.scan.skip_git_dir = false;
    }
    if toggles.keep_node_modules {
        config.scan.skip_node_modules = false;
    }
}

fn merge_assembly_opts(config: &mut Config, opts: &AssemblyOpts) -> Result<()> {
    if let Some(name) = &opts.template {
        config.prompt.template = name.parse::<PromptTemplate>()?;
    }
    if let Some(path) = &opts.template_file {
        config.prompt.template_file = Some(absolutize(path)?);
    }
    if opts.no_redaction {
        config.redaction.enabled = false;
    }
    config.redaction.rules.extend(opts.redact.iter().cloned());
    for path in &opts.redact_file {
        config.redaction.import.push(absolutize(path)?);
    }
    if let Some(max_lines) = opts.chunk_lines {
        config.chunking.enabled = true;
        config.chunking.max_lines = max_lines;
        config.chunking.validate()?;
    }
    if let Some(range) = opts.lines {
        config.lines.start = range.start;
        config.lines.end = range.end;
    }
    if opts.no_tree {
        config.prompt.include_tree = false;
    }
    if let Some(model) = &opts.model {
        config.prompt.model = model.clone();
    }
    Ok(())
}

/// CLI paths are relative to the working directory, config paths to the project root.
fn absolutize(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path)
        .with_context(|| format!("Failed to resolve path {}", path.display()))
}

pub fn load_config_for_command(
    project_root: &Path,
    project_opts: &ProjectConfigOpts,
    scan_toggles: Option<&ScanTogglesGroup>,
    assembly: Option<&AssemblyOpts>,
) -> Result<Config> {
    let config_path = Config::resolve_config_path(
        project_root,
        project_opts.config_file.as_ref(),
        project_opts.disable_config_file,
    )
    .context("Failed to resolve configuration path")?;

    let mut config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(toggles) = scan_toggles {
        merge_scan_toggles(&mut config, toggles);
    }
    if let Some(opts) = assembly {
        merge_assembly_opts(&mut config, opts)?;
    }
    log::trace!("Config after CLI overrides: {:?}", config);
    Ok(config)
}

/// Reads a prompt field given as literal text or `@path`.
fn read_field(value: Option<&String>) -> Result<String> {
    match value {
        None => Ok(String::new()),
        Some(v) => match v.strip_prefix('@') {
            Some(path) => fs::read_to_string(path)
                .map_err(|e| AppError::FileRead {
                    path: PathBuf::from(path),
                    source: e,
                })
                .with_context(|| format!("Failed to read prompt field from '{}'", path)),
            None => Ok(v.clone()),
        },
    }
}

pub fn prompt_fields_from_args(opts: &PromptFieldOpts) -> Result<PromptFields> {
    Ok(PromptFields {
        request: read_field(opts.request.as_ref())?,
        rules: read_field(opts.rules.as_ref())?,
        spec: read_field(opts.spec.as_ref())?,
        plan: read_field(opts.plan.as_ref())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_reads_literal_text_and_at_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("req.md");
        fs::write(&file, "from file").unwrap();

        assert_eq!(read_field(None).unwrap(), "");
        assert_eq!(read_field(Some(&"inline".to_string())).unwrap(), "inline");
        let at = format!("@{}", file.display());
        assert_eq!(read_field(Some(&at)).unwrap(), "from file");
        assert!(read_field(Some(&"@/no/such/file".to_string())).is_err());
    }

    #[test]
    fn cli_overrides_win_over_defaults() {
        let mut config = Config::default();
        merge_scan_toggles(
            &mut config,
            &ScanTogglesGroup {
                keep_git: true,
                ..ScanTogglesGroup::default()
            },
        );
        merge_assembly_opts(
            &mut config,
            &AssemblyOpts {
                template: Some("review".to_string()),
                chunk_lines: Some(50),
                no_tree: true,
                redact: vec!["secret => ***".to_string()],
                ..AssemblyOpts::default()
            },
        )
        .unwrap();

        assert!(!config.scan.skip_git_dir);
        assert!(config.scan.skip_bin);
        assert_eq!(config.prompt.template, PromptTemplate::Review);
        assert!(config.chunking.enabled);
        assert_eq!(config.chunking.max_lines, 50);
        assert!(!config.prompt.include_tree);
        assert_eq!(config.redaction.rules, vec!["secret => ***".to_string()]);
    }

    #[test]
    fn zero_chunk_lines_is_rejected() {
        let mut config = Config::default();
        let err = merge_assembly_opts(
            &mut config,
            &AssemblyOpts {
                chunk_lines: Some(0),
                ..AssemblyOpts::default()
            },
        )
        .unwrap_err();
        assert!(err.downcast_ref::<AppError>().is_some());
    }

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(exit_code_for(Some(&AppError::ScanInProgress)), 3);
        assert_eq!(
            exit_code_for(Some(&AppError::InvalidArgument("x".into()))),
            5
        );
        assert_eq!(exit_code_for(Some(&AppError::TikToken("x".into()))), 8);
        assert_eq!(exit_code_for(None), 1);
    }
}

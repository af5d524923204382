use crate::cli_args::ConfigArgs;
use crate::output::{confirm_overwrite, write_to_file, write_to_stdout};
use anyhow::{Context, Result};
use colored::*;
use std::path::Path;
use xprompt_core::Config;
use xprompt_core::config::{DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME};

pub fn handle_config_command(args: &ConfigArgs, project_root: &Path, quiet: bool) -> Result<()> {
    let content = Config::default()
        .to_toml_string()
        .context("Failed to serialize default configuration")?;

    if !args.save {
        return write_to_stdout(&content);
    }

    let save_path = project_root
        .join(DEFAULT_CONFIG_DIR)
        .join(DEFAULT_CONFIG_FILENAME);
    if !confirm_overwrite(&save_path, quiet)? {
        return Ok(());
    }
    write_to_file(&save_path, &content)?;
    if !quiet {
        println!(
            "{} Default configuration saved to: {}",
            "✅".green(),
            save_path.display().to_string().blue()
        );
    }
    Ok(())
}

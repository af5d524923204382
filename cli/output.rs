use anyhow::{Context, Result};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use xprompt_core::RedactionRule;

/// Writes the assembled prompt to a file or standard output.
pub fn emit_prompt(text: &str, output_path: Option<&Path>, quiet: bool) -> Result<()> {
    match output_path {
        Some(path) => {
            write_to_file(path, text)?;
            if !quiet {
                eprintln!(
                    "{} Prompt saved to: {}",
                    "✅".green(),
                    path.display().to_string().blue()
                );
            }
        }
        None => write_to_stdout(text)?,
    }
    Ok(())
}

pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(data).context("Failed to serialize JSON output")?;
    write_to_stdout(&content)
}

pub fn write_to_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut file =
        File::create(path).with_context(|| format!("Failed to create file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to file {}", path.display()))?;
    Ok(())
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

/// Asks before replacing an existing file. Quiet mode never overwrites.
pub fn confirm_overwrite(path: &Path, quiet: bool) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    if quiet {
        anyhow::bail!(
            "Target file '{}' exists. Overwrite prevented in quiet mode.",
            path.display()
        );
    }
    print!(
        "{} File already exists at '{}'. Overwrite? [{}/{}] ",
        "⚠️".yellow(),
        path.display().to_string().cyan(),
        "y".green(),
        "N".red()
    );
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut response = String::new();
    io::stdin()
        .read_line(&mut response)
        .context("Failed to read user input")?;
    let confirmed = response.trim().eq_ignore_ascii_case("y");
    if !confirmed {
        println!("Save cancelled.");
    }
    Ok(confirmed)
}

/// Path relative to the project root for display, falling back to the full path.
pub fn display_relative(path: &Path, project_root: &Path) -> String {
    pathdiff::diff_paths(path, project_root)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| path.to_path_buf())
        .to_string_lossy()
        .to_string()
}

pub fn print_section_header(title: &str) {
    println!(
        "{}",
        format!("\n--- {} ---", title).green().bold().underline()
    );
}

pub fn print_rules_table(rules: &[RedactionRule]) {
    if rules.is_empty() {
        println!("{}", "(No redaction rules active)".dimmed());
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").fg(Color::Green),
        Cell::new("Pattern").fg(Color::Green),
        Cell::new("Replacement").fg(Color::Green),
    ]);
    for (i, rule) in rules.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1).set_alignment(CellAlignment::Right),
            Cell::new(rule.pattern()).fg(Color::Cyan),
            Cell::new(rule.replacement()).fg(Color::DarkGrey),
        ]);
    }
    println!("{table}");
}

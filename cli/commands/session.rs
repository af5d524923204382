use crate::cli_args::SessionArgs;
use crate::commands::{apply_selection, build_prompt, report_tokens, resolve_selection_path};
use crate::output::{display_relative, emit_prompt};
use crate::{load_config_for_command, prompt_fields_from_args};
use anyhow::{Context, Result};
use colored::*;
use log;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;
use xprompt_core::{
    Config, DirectoryNode, FolderSession, NodeKind, PromptFields, PromptTemplate,
};

const HELP: &str = "\
Commands:
  ls                      show the tree with check marks
  check <path>            check a file or folder (cascades to children)
  uncheck <path>          uncheck a file or folder
  files                   list the files that would be included
  rescan                  rebuild the tree, keeping the selection
  set <field> <text>      set request, rules, spec or plan ('@file' reads a file)
  template <name>         switch to codegen, review or none
  build [file]            assemble the prompt to stdout or a file
  tokens                  estimate tokens of the last built prompt
  help                    show this help
  quit                    leave the session";

#[derive(Debug, PartialEq, Eq)]
enum SessionCommand<'a> {
    List,
    Check(&'a str, bool),
    Files,
    Rescan,
    Set(&'a str, &'a str),
    Template(&'a str),
    Build(Option<&'a str>),
    Tokens,
    Help,
    Quit,
    Unknown(&'a str),
}

fn parse_command(line: &str) -> Option<SessionCommand<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let command = match (verb, rest) {
        ("ls" | "tree", _) => SessionCommand::List,
        ("check", p) if !p.is_empty() => SessionCommand::Check(p, true),
        ("uncheck", p) if !p.is_empty() => SessionCommand::Check(p, false),
        ("files", _) => SessionCommand::Files,
        ("rescan" | "r", _) => SessionCommand::Rescan,
        ("set", args) => match args.split_once(char::is_whitespace) {
            Some((field, text)) => SessionCommand::Set(field, text.trim()),
            None => SessionCommand::Unknown(line),
        },
        ("template", name) if !name.is_empty() => SessionCommand::Template(name),
        ("build" | "b", "") => SessionCommand::Build(None),
        ("build" | "b", file) => SessionCommand::Build(Some(file)),
        ("tokens", _) => SessionCommand::Tokens,
        ("help" | "?", _) => SessionCommand::Help,
        ("quit" | "exit" | "q", _) => SessionCommand::Quit,
        _ => SessionCommand::Unknown(line),
    };
    Some(command)
}

/// Outline with a check mark per node.
fn render_marked(nodes: &[DirectoryNode], level: usize, out: &mut String) {
    for node in nodes {
        let mark = if node.is_checked() { "[x]" } else { "[ ]" };
        let suffix = if node.kind() == NodeKind::Directory { "/" } else { "" };
        out.push_str(&format!(
            "{}{} {}{}\n",
            "  ".repeat(level),
            mark,
            node.name(),
            suffix
        ));
        render_marked(node.children(), level + 1, out);
    }
}

fn set_field(fields: &mut PromptFields, name: &str, value: &str) -> Result<()> {
    let text = match value.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path))?,
        None => value.to_string(),
    };
    match name {
        "request" => fields.request = text,
        "rules" => fields.rules = text,
        "spec" => fields.spec = text,
        "plan" => fields.plan = text,
        other => anyhow::bail!("Unknown prompt field '{}'", other),
    }
    Ok(())
}

/// Runs the rebuild on the worker thread and reports progress while it runs.
fn rescan_with_progress(session: &mut FolderSession, quiet: bool) -> Result<()> {
    let pending = session.begin_rescan().context("Failed to start rescan")?;
    if !quiet {
        eprint!("{}", "Scanning".dimmed());
    }
    while !pending.is_finished() {
        if !quiet {
            eprint!("{}", ".".dimmed());
        }
        thread::sleep(Duration::from_millis(100));
    }
    if !quiet {
        eprintln!();
    }
    session
        .complete_rescan(pending)
        .context("Rescan failed; the previous tree is kept")
}

struct SessionState {
    config: Config,
    fields: PromptFields,
    last_prompt: Option<String>,
}

fn execute(
    command: SessionCommand<'_>,
    session: &mut FolderSession,
    state: &mut SessionState,
    quiet: bool,
) -> Result<bool> {
    match command {
        SessionCommand::List => {
            let mut out = String::new();
            render_marked(session.nodes(), 0, &mut out);
            print!("{}", out);
        }
        SessionCommand::Check(raw, checked) => {
            let path = resolve_selection_path(session.root(), Path::new(raw));
            session.set_checked(&path, checked)?;
        }
        SessionCommand::Files => {
            let files = session.selected_files();
            if files.is_empty() {
                println!("{}", "(No files selected)".dimmed());
            }
            for file in files {
                println!("- {}", display_relative(&file, session.root()).cyan());
            }
        }
        SessionCommand::Rescan => rescan_with_progress(session, quiet)?,
        SessionCommand::Set(field, text) => set_field(&mut state.fields, field, text)?,
        SessionCommand::Template(name) => {
            state.config.prompt.template = name.parse::<PromptTemplate>()?;
            state.config.prompt.template_file = None;
        }
        SessionCommand::Build(file) => {
            let prompt = build_prompt(session, &state.config, &state.fields)?;
            emit_prompt(&prompt.text, file.map(Path::new), quiet)?;
            state.last_prompt = Some(prompt.text);
        }
        SessionCommand::Tokens => match &state.last_prompt {
            Some(text) => report_tokens(text, &state.config.prompt.model)?,
            None => println!("{}", "Nothing built yet; run 'build' first.".yellow()),
        },
        SessionCommand::Help => println!("{}", HELP),
        SessionCommand::Quit => return Ok(false),
        SessionCommand::Unknown(line) => {
            println!("{} '{}' (try 'help')", "Unknown command:".yellow(), line)
        }
    }
    Ok(true)
}

pub fn handle_session_command(args: SessionArgs, quiet: bool) -> Result<()> {
    let project_root = Config::determine_project_root(args.project_config.project_root.as_ref())
        .context("Failed to determine project root")?;
    let config = load_config_for_command(
        &project_root,
        &args.project_config,
        Some(&args.scan_toggles),
        Some(&args.assembly),
    )
    .context("Failed to load configuration for session command")?;

    let mut session = FolderSession::open(&project_root, config.scan)
        .context("Failed to scan project root")?;
    apply_selection(&mut session, &args.selection)?;
    let mut state = SessionState {
        fields: prompt_fields_from_args(&args.fields)?,
        config,
        last_prompt: None,
    };

    if !quiet {
        eprintln!(
            "{} {} (type 'help' for commands)",
            "Session opened for".green(),
            project_root.display().to_string().blue()
        );
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        if !quiet {
            eprint!("{} ", "xprompt>".bold());
            io::stderr().flush().context("Failed to flush stderr")?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read session input")?;
        let Some(command) = parse_command(&line) else {
            continue;
        };
        log::debug!("Session command: {:?}", command);
        match execute(command, &mut session, &mut state, quiet) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => eprintln!("{} {:#}", "Error:".red().bold(), e),
        }
    }
    Ok(())
}

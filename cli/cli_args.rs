use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use xprompt_core::LineRange;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectConfigOpts {
    #[arg(
        long,
        help = "Specify the folder to scan (default: current dir).",
        help_heading = "Project Setup",
        value_name = "PATH"
    )]
    pub project_root: Option<PathBuf>,

    #[arg(
        long,
        help = "Specify path/filename of the TOML config file (default: .xtools/xprompt/xprompt.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "disable_config_file",
        help_heading = "Project Setup"
    )]
    pub config_file: Option<String>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "config_file",
        help_heading = "Project Setup"
    )]
    pub disable_config_file: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ScanTogglesGroup {
    #[arg(
        long,
        help = "Keep 'bin' directories in the scan.",
        help_heading = "Scan Policy"
    )]
    pub keep_bin: bool,
    #[arg(
        long,
        help = "Keep 'obj' directories in the scan.",
        help_heading = "Scan Policy"
    )]
    pub keep_obj: bool,
    #[arg(
        long,
        help = "Keep '.vs' directories in the scan.",
        help_heading = "Scan Policy"
    )]
    pub keep_vs: bool,
    #[arg(
        long,
        help = "Keep '.git' directories in the scan.",
        help_heading = "Scan Policy"
    )]
    pub keep_git: bool,
    #[arg(
        long,
        help = "Keep 'node_modules' directories in the scan.",
        help_heading = "Scan Policy"
    )]
    pub keep_node_modules: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PromptFieldOpts {
    #[arg(
        long,
        value_name = "TEXT|@FILE",
        help = "Request text, or @path to read it from a file.",
        help_heading = "Prompt Fields"
    )]
    pub request: Option<String>,
    #[arg(
        long,
        value_name = "TEXT|@FILE",
        help = "Rules text, or @path to read it from a file.",
        help_heading = "Prompt Fields"
    )]
    pub rules: Option<String>,
    #[arg(
        long,
        value_name = "TEXT|@FILE",
        help = "Specification text, or @path to read it from a file.",
        help_heading = "Prompt Fields"
    )]
    pub spec: Option<String>,
    #[arg(
        long,
        value_name = "TEXT|@FILE",
        help = "Plan text, or @path to read it from a file.",
        help_heading = "Prompt Fields"
    )]
    pub plan: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct AssemblyOpts {
    #[arg(short = 't', long, value_name = "TEMPLATE", value_parser = ["codegen", "review", "none"], help = "Prompt layout to use.", help_heading = "Assembly")]
    pub template: Option<String>,

    #[arg(
        long,
        value_name = "PATH",
        help = "Use a custom template body instead of the built-in one.",
        help_heading = "Assembly"
    )]
    pub template_file: Option<PathBuf>,

    #[arg(long = "redact", value_name = "RULE", action = clap::ArgAction::Append, help = "Add a redaction rule ('<pattern> => <replacement>').", help_heading = "Assembly")]
    pub redact: Vec<String>,

    #[arg(long = "redact-file", value_name = "PATH", action = clap::ArgAction::Append, help = "Read redaction rules from a file (one per line).", help_heading = "Assembly")]
    pub redact_file: Vec<PathBuf>,

    #[arg(
        long,
        help = "Disable all redaction rules.",
        help_heading = "Assembly"
    )]
    pub no_redaction: bool,

    #[arg(
        short = 'c',
        long,
        value_name = "LINES",
        help = "Split files longer than LINES into numbered chunks.",
        help_heading = "Assembly"
    )]
    pub chunk_lines: Option<usize>,

    #[arg(
        long,
        value_name = "START:END",
        value_parser = parse_line_range,
        help = "Only include this 1-based line range of every file (e.g. '10:50', '5:', ':20').",
        help_heading = "Assembly"
    )]
    pub lines: Option<LineRange>,

    #[arg(
        long,
        help = "Leave the directory structure section out.",
        help_heading = "Assembly"
    )]
    pub no_tree: bool,

    #[arg(
        long,
        value_name = "MODEL",
        help = "Model name used for token estimation.",
        help_heading = "Assembly"
    )]
    pub model: Option<String>,
}

fn parse_line_range(s: &str) -> Result<LineRange, String> {
    s.parse::<LineRange>().map_err(|e| e.to_string())
}

#[derive(Args, Debug, Clone, Default)]
pub struct SelectionOpts {
    #[arg(short = 's', long = "select", value_name = "PATH", action = clap::ArgAction::Append, help = "Check a file or folder (relative to the project root or absolute).", help_heading = "Selection")]
    pub select: Vec<PathBuf>,

    #[arg(
        short = 'A',
        long,
        help = "Check the whole project root.",
        help_heading = "Selection"
    )]
    pub select_all: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FormatOutputOpts {
    #[arg(short = 'f', long, help = "Set the output format.", value_name = "FORMAT", value_parser = ["text", "json"], help_heading = "Output Formatting")]
    pub format: Option<String>,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Assemble an LLM prompt from a selected subset of a directory tree.",
    long_about = "xprompt scans a folder, lets you pick files and folders, and assembles their \n(optionally redacted and chunked) contents plus a directory outline into a prompt \nbuilt from a codegen, review or plain template.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  xprompt assemble -s src -t codegen --request 'Add logging' -o prompt.md\n  xprompt assemble -A --redact '(ApiKey=)(\\S+) => $1[REDACTED]' --tokens\n  xprompt tree --keep-git\n  xprompt session",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "a",
        visible_alias = "gen",
        about = "Assemble a prompt from the selected files."
    )]
    Assemble(AssembleArgs),

    #[command(visible_alias = "t", about = "Print the scanned directory outline.")]
    Tree(TreeArgs),

    #[command(
        visible_alias = "s",
        about = "Interactive session: toggle selection, rescan and build prompts."
    )]
    Session(SessionArgs),

    #[command(
        visible_alias = "d",
        about = "Show effective configuration, redaction rules and selected files."
    )]
    Debug(DebugArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),

    #[command(about = "Show or save the default configuration file structure.")]
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AssembleArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub scan_toggles: ScanTogglesGroup,
    #[clap(flatten)]
    pub selection: SelectionOpts,
    #[clap(flatten)]
    pub fields: PromptFieldOpts,
    #[clap(flatten)]
    pub assembly: AssemblyOpts,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the prompt to FILE instead of standard output.",
        help_heading = "Output Control"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        help = "Print the estimated token count to stderr.",
        help_heading = "Output Control"
    )]
    pub tokens: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub scan_toggles: ScanTogglesGroup,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
}

#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub scan_toggles: ScanTogglesGroup,
    #[clap(flatten)]
    pub selection: SelectionOpts,
    #[clap(flatten)]
    pub fields: PromptFieldOpts,
    #[clap(flatten)]
    pub assembly: AssemblyOpts,
}

#[derive(Args, Debug, Clone)]
pub struct DebugArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub scan_toggles: ScanTogglesGroup,
    #[clap(flatten)]
    pub selection: SelectionOpts,
    #[clap(flatten)]
    pub assembly: AssemblyOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh) [default: fish]"
    )]
    pub shell: Option<String>,
    #[arg(
        long,
        help = "Save completion script to default location (prompts overwrite)."
    )]
    pub save: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[arg(
        long,
        help = "Save default config structure to default path (prompts overwrite)."
    )]
    pub save: bool,
}

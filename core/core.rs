pub mod assembly;
pub mod chunking;
pub mod config;
pub mod error;
pub mod extract;
pub mod languages;
pub mod prompt;
pub mod render;
pub mod selection;
pub mod session;
pub mod skip_policy;
pub mod tokens;
pub mod tree;
pub mod walker;

pub use assembly::{AssembledPrompt, AssemblySettings, assemble_prompt};
pub use chunking::{ChunkSettings, format_file_blocks, split_into_chunks};
pub use config::Config;
pub use error::{AppError, Result};
pub use extract::{LineRange, RedactionRule, extract_content, parse_redaction_rules};
pub use languages::LanguageTable;
pub use prompt::{PromptAssembler, PromptFields, PromptTemplate, TemplateAssembler};
pub use render::render_tree;
pub use selection::{SelectionSnapshot, restore, snapshot};
pub use session::{FolderSession, PendingScan, ScanState};
pub use skip_policy::{SkipSwitches, should_skip_directory, should_skip_file};
pub use tokens::{TikTokenEstimator, TokenEstimator};
pub use tree::{CancelFlag, DirectoryNode, NodeKind, build_tree};
pub use walker::{WalkOptions, collect_selected_files, walk_selection};

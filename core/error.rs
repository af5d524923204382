use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("Root Not Found: '{path}' does not exist or is not a directory")]
    RootNotFound { path: PathBuf },

    #[error("Scan I/O Error: Directory '{path}', Error: {source}")]
    ScanIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File Read Error: Path '{path}', Error: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Pattern Compile Error: Line {line}, Pattern '{pattern}': {source}")]
    PatternCompile {
        line: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid Redaction Rule: Line {line} ('{text}') is missing the ' => ' separator")]
    InvalidRule { line: usize, text: String },

    #[error("A scan is already in progress")]
    ScanInProgress,

    #[error("Scan was cancelled")]
    ScanCancelled,

    #[error("Node Not Found: '{path}' is not part of the loaded tree")]
    NodeNotFound { path: PathBuf },

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("TOML Parsing Error: {0}")]
    TomlParse(String),

    #[error("TOML Serialization Error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("YAML Parsing/Serialization Error: {0}")]
    YamlError(#[from] serde_yml::Error),

    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data Loading Error: {0}")]
    DataLoading(String),

    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),

    #[error("TikToken Error: {0}")]
    TikToken(String),

    #[error("Template Error: {0}")]
    Template(String),
}

impl AppError {
    /// Errors that only affect a single entry and must not abort a scan or assembly.
    pub fn is_per_entry(&self) -> bool {
        matches!(
            self,
            AppError::ScanIo { .. }
                | AppError::FileRead { .. }
                | AppError::DataLoading(_)
                | AppError::PatternCompile { .. }
                | AppError::InvalidRule { .. }
        )
    }
}

impl From<std::str::Utf8Error> for AppError {
    fn from(err: std::str::Utf8Error) -> Self {
        AppError::DataLoading(format!("UTF-8 decoding error: {}", err))
    }
}

use crate::error::{AppError, Result};
use crate::languages::LanguageTable;
use log;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

pub const DEFAULT_MAX_LINES: usize = 500;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ChunkSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
}

fn default_max_lines() -> usize {
    DEFAULT_MAX_LINES
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_lines: default_max_lines(),
        }
    }
}

impl ChunkSettings {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_max_lines(max_lines: usize) -> Self {
        Self {
            enabled: true,
            max_lines,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.max_lines == 0 {
            return Err(AppError::InvalidArgument(
                "Chunk size must be greater than 0 lines".to_string(),
            ));
        }
        Ok(())
    }

    /// The line limit in effect, `None` when the whole file goes into one block.
    pub fn limit(&self) -> Option<usize> {
        (self.enabled && self.max_lines > 0).then_some(self.max_lines)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    pub current_part: usize,
    pub total_parts: usize,
}

/// Splits text into consecutive pieces of at most `max_lines` lines each.
pub fn split_into_chunks(text: &str, max_lines: usize) -> Vec<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    if max_lines == 0 || lines.len() <= max_lines {
        return vec![text.to_string()];
    }
    lines
        .chunks(max_lines)
        .map(|chunk| chunk.join("\n"))
        .collect()
}

fn push_block(
    out: &mut String,
    file_path: &Path,
    lang: &str,
    content: &str,
    chunk: Option<ChunkInfo>,
) {
    let label = match chunk {
        Some(info) => format!(" (Chunk #{})", info.current_part),
        None => String::new(),
    };
    // Writing into a String cannot fail.
    let _ = write!(
        out,
        "```{}\n// FILE: {}{}\n{}\n```\n\n",
        lang,
        file_path.display(),
        label,
        content
    );
}

/// Renders processed file text as one fenced block, or as numbered blocks when
/// chunking is enabled and the text exceeds the line limit.
pub fn format_file_blocks(
    file_path: &Path,
    processed_text: &str,
    settings: &ChunkSettings,
    languages: &LanguageTable,
) -> String {
    let lang = languages.tag_for_path(file_path);
    let mut out = String::with_capacity(processed_text.len() + 64);

    let Some(max_lines) = settings.limit() else {
        push_block(&mut out, file_path, lang, processed_text, None);
        return out;
    };

    let chunks = split_into_chunks(processed_text, max_lines);
    if chunks.len() == 1 {
        push_block(&mut out, file_path, lang, processed_text, None);
        return out;
    }

    let total_parts = chunks.len();
    log::debug!(
        "Split {} into {} chunks of up to {} lines",
        file_path.display(),
        total_parts,
        max_lines
    );
    for (i, content) in chunks.iter().enumerate() {
        let info = ChunkInfo {
            current_part: i + 1,
            total_parts,
        };
        push_block(&mut out, file_path, lang, content, Some(info));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> String {
        (1..=n)
            .map(|i| format!("l{}", i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Pulls the raw content out of each fenced block.
    fn block_bodies(output: &str) -> Vec<(String, String)> {
        output
            .split("```\n\n")
            .filter(|b| !b.is_empty())
            .map(|block| {
                let mut parts = block.splitn(3, '\n');
                let _fence = parts.next().unwrap();
                let label = parts.next().unwrap().to_string();
                let body = parts.next().unwrap().trim_end_matches('\n').to_string();
                (label, body)
            })
            .collect()
    }

    #[test]
    fn single_block_is_bit_exact() {
        let out = format_file_blocks(
            Path::new("/p/Program.cs"),
            "a\nb",
            &ChunkSettings::disabled(),
            &LanguageTable::builtin(),
        );
        assert_eq!(out, "```csharp\n// FILE: /p/Program.cs\na\nb\n```\n\n");
    }

    #[test]
    fn unknown_extension_gets_untagged_fence() {
        let out = format_file_blocks(
            Path::new("/p/notes"),
            "x",
            &ChunkSettings::disabled(),
            &LanguageTable::builtin(),
        );
        assert!(out.starts_with("```\n// FILE: /p/notes\n"));
    }

    #[test]
    fn limit_at_or_above_length_gives_one_unlabeled_block() {
        let text = numbered(10);
        let out = format_file_blocks(
            Path::new("a.ts"),
            &text,
            &ChunkSettings::with_max_lines(10),
            &LanguageTable::builtin(),
        );
        assert_eq!(out.matches("// FILE:").count(), 1);
        assert!(!out.contains("Chunk #"));
    }

    #[test]
    fn chunks_are_numbered_and_reassemble() {
        let text = numbered(10);
        let out = format_file_blocks(
            Path::new("a.ts"),
            &text,
            &ChunkSettings::with_max_lines(3),
            &LanguageTable::builtin(),
        );
        let blocks = block_bodies(&out);
        assert_eq!(blocks.len(), 4);
        for (i, (label, _)) in blocks.iter().enumerate() {
            assert_eq!(label, &format!("// FILE: a.ts (Chunk #{})", i + 1));
        }
        assert_eq!(blocks[3].1, "l10");
        let rejoined: Vec<String> = blocks.into_iter().map(|(_, body)| body).collect();
        assert_eq!(rejoined.join("\n"), text);
    }

    #[test]
    fn zero_limit_is_rejected() {
        assert!(ChunkSettings::with_max_lines(0).validate().is_err());
        assert!(ChunkSettings::with_max_lines(1).validate().is_ok());
        assert!(ChunkSettings::disabled().validate().is_ok());
    }
}

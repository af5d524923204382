use crate::error::{AppError, Result};
use log;
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const RULE_SEPARATOR: &str = " => ";

/// A compiled pattern and its replacement, applied globally to each line.
#[derive(Debug, Clone)]
pub struct RedactionRule {
    pattern: Regex,
    replacement: String,
}

impl RedactionRule {
    pub fn new(pattern: &str, replacement: &str) -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            replacement: normalize_replacement(replacement),
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    pub fn apply(&self, line: &str) -> String {
        self.pattern
            .replace_all(line, self.replacement.as_str())
            .into_owned()
    }
}

/// Rewrites `$N` followed by an identifier character as `${N}`.
///
/// The regex crate reads `$1abc` as a group named `1abc`; rule authors mean group 1.
fn normalize_replacement(replacement: &str) -> String {
    let chars: Vec<char> = replacement.chars().collect();
    let mut out = String::with_capacity(replacement.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c != '$' {
            out.push(c);
            i += 1;
            continue;
        }
        if chars.get(i + 1) == Some(&'$') {
            out.push_str("$$");
            i += 2;
            continue;
        }
        let digits_start = i + 1;
        let mut j = digits_start;
        while j < chars.len() && chars[j].is_ascii_digit() {
            j += 1;
        }
        let followed_by_ident = chars
            .get(j)
            .is_some_and(|next| next.is_alphanumeric() || *next == '_');
        if j > digits_start && followed_by_ident {
            out.push_str("${");
            out.extend(&chars[digits_start..j]);
            out.push('}');
            i = j;
        } else {
            out.push('$');
            i += 1;
        }
    }
    out
}

/// Parses rule text, one `<pattern> => <replacement>` per line.
///
/// Blank lines and lines starting with `#` are ignored. Malformed lines and patterns
/// that fail to compile are dropped and reported in the returned diagnostics.
pub fn parse_redaction_rules(text: &str) -> (Vec<RedactionRule>, Vec<AppError>) {
    let mut rules = Vec::new();
    let mut diagnostics = Vec::new();
    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if raw_line.trim().is_empty() || raw_line.trim_start().starts_with('#') {
            continue;
        }
        let Some((pattern, replacement)) = raw_line.split_once(RULE_SEPARATOR) else {
            let err = AppError::InvalidRule {
                line: line_no,
                text: raw_line.to_string(),
            };
            log::warn!("Skipping redaction rule: {}", err);
            diagnostics.push(err);
            continue;
        };
        match RedactionRule::new(pattern, replacement) {
            Ok(rule) => {
                log::trace!("Compiled redaction rule {}: {}", line_no, pattern);
                rules.push(rule);
            }
            Err(e) => {
                let err = AppError::PatternCompile {
                    line: line_no,
                    pattern: pattern.to_string(),
                    source: e,
                };
                log::warn!("Skipping redaction rule: {}", err);
                diagnostics.push(err);
            }
        }
    }
    log::debug!(
        "Parsed {} redaction rules ({} skipped)",
        rules.len(),
        diagnostics.len()
    );
    (rules, diagnostics)
}

/// 1-based inclusive line bounds; a value of 0 or less is unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineRange {
    pub start: i64,
    pub end: i64,
}

impl LineRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn full() -> Self {
        Self::default()
    }

    /// Zero-based half-open index range into a file of `total` lines.
    pub fn resolve(&self, total: usize) -> std::ops::Range<usize> {
        if total == 0 {
            return 0..0;
        }
        let clamp = |v: i64| (v as u64).min(total as u64) as usize;
        let start = if self.start <= 0 { 1 } else { clamp(self.start) };
        let end = if self.end <= 0 { total } else { clamp(self.end) };
        if start > end {
            return 0..0;
        }
        (start - 1)..end
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |v: i64| if v > 0 { v.to_string() } else { String::new() };
        write!(f, "{}:{}", side(self.start), side(self.end))
    }
}

impl FromStr for LineRange {
    type Err = AppError;

    /// Accepts `START:END`, `START:`, `:END`, `:` or a single `LINE`.
    /// `START-END` also works when no colon is present; a leading `-` is a sign.
    fn from_str(s: &str) -> Result<Self> {
        let parse_side = |side: &str| -> Result<i64> {
            let side = side.trim();
            if side.is_empty() {
                return Ok(0);
            }
            side.parse::<i64>().map_err(|e| {
                AppError::InvalidArgument(format!("Invalid line number '{}': {}", side, e))
            })
        };
        let dash_split = || {
            let body = s.trim_start();
            body.get(1..)
                .and_then(|rest| rest.find('-'))
                .map(|idx| (&body[..idx + 1], &body[idx + 2..]))
        };
        match s.split_once(':').or_else(dash_split) {
            Some((start, end)) => Ok(Self::new(parse_side(start)?, parse_side(end)?)),
            None => {
                let line = parse_side(s)?;
                Ok(Self::new(line, line))
            }
        }
    }
}

/// Reads a file, slices it to `range` and runs every rule over each kept line.
pub fn extract_content(path: &Path, rules: &[RedactionRule], range: LineRange) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| AppError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let content = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            log::debug!(
                "Replacing invalid UTF-8 in {} ({})",
                path.display(),
                e.utf8_error()
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };

    let lines: Vec<&str> = content.lines().collect();
    let slice = &lines[range.resolve(lines.len())];
    log::trace!(
        "Extracting {} of {} lines from {}",
        slice.len(),
        lines.len(),
        path.display()
    );

    let processed: Vec<String> = slice
        .iter()
        .map(|line| {
            rules
                .iter()
                .fold((*line).to_string(), |acc, rule| rule.apply(&acc))
        })
        .collect();
    Ok(processed.join("\n"))
}

/// Reads rule files, continuing past unreadable ones.
pub fn load_rule_files(paths: &[PathBuf]) -> (Vec<RedactionRule>, Vec<AppError>) {
    let mut rules = Vec::new();
    let mut diagnostics = Vec::new();
    for path in paths {
        match fs::read_to_string(path) {
            Ok(text) => {
                let (parsed, errors) = parse_redaction_rules(&text);
                rules.extend(parsed);
                diagnostics.extend(errors);
            }
            Err(e) => {
                let err = AppError::FileRead {
                    path: path.clone(),
                    source: e,
                };
                log::warn!("Failed to read redaction rule file: {}", err);
                diagnostics.push(err);
            }
        }
    }
    (rules, diagnostics)
}

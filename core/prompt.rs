use crate::error::{AppError, Result};
use log;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(RustEmbed)]
#[folder = "../data/templates/"]
#[prefix = "templates/"]
struct TemplateAssets;

static SLOT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([a-z_]+)\s*\}\}").expect("slot pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptTemplate {
    Codegen,
    Review,
    #[default]
    None,
}

impl PromptTemplate {
    pub const ALL: [PromptTemplate; 3] = [
        PromptTemplate::Codegen,
        PromptTemplate::Review,
        PromptTemplate::None,
    ];

    fn asset_path(&self) -> String {
        format!("templates/{}.md", self)
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PromptTemplate::Codegen => "codegen",
            PromptTemplate::Review => "review",
            PromptTemplate::None => "none",
        };
        f.write_str(name)
    }
}

impl FromStr for PromptTemplate {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "codegen" => Ok(PromptTemplate::Codegen),
            "review" => Ok(PromptTemplate::Review),
            "none" | "" => Ok(PromptTemplate::None),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown prompt template '{}'. Expected codegen, review or none.",
                other
            ))),
        }
    }
}

pub fn get_template_body(template: PromptTemplate) -> Result<String> {
    let path = template.asset_path();
    log::trace!("Loading embedded prompt template: {}", path);
    let asset = TemplateAssets::get(&path).ok_or_else(|| {
        AppError::Template(format!("Template file not found in embed: {}", path))
    })?;
    let content = std::str::from_utf8(asset.data.as_ref())?;
    Ok(content.to_string())
}

/// Free-text fields the user types next to the file selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptFields {
    #[serde(default)]
    pub request: String,
    #[serde(default)]
    pub rules: String,
    #[serde(default)]
    pub spec: String,
    #[serde(default)]
    pub plan: String,
}

/// Turns the user fields and the generated sections into the final document.
pub trait PromptAssembler {
    fn assemble(
        &self,
        fields: &PromptFields,
        code_section: &str,
        directory_structure_section: &str,
    ) -> Result<String>;
}

/// Wraps a rendered outline into the section placed in the `directory_structure` slot.
pub fn directory_structure_section(outline: &str) -> String {
    if outline.is_empty() {
        return String::new();
    }
    format!("## Directory Structure\n```\n{}```\n\n", outline)
}

/// Single-pass `{{slot}}` substitution over a template body.
#[derive(Debug, Clone)]
pub struct TemplateAssembler {
    body: String,
}

impl TemplateAssembler {
    pub fn builtin(template: PromptTemplate) -> Result<Self> {
        Ok(Self::from_body(get_template_body(template)?))
    }

    pub fn from_body(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        log::info!("Loading prompt template from: {}", path.display());
        let body = fs::read_to_string(path).map_err(|e| AppError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::from_body(body))
    }
}

impl PromptAssembler for TemplateAssembler {
    fn assemble(
        &self,
        fields: &PromptFields,
        code_section: &str,
        directory_structure_section: &str,
    ) -> Result<String> {
        let slots: HashMap<&str, &str> = HashMap::from([
            ("request", fields.request.as_str()),
            ("rules", fields.rules.as_str()),
            ("spec", fields.spec.as_str()),
            ("plan", fields.plan.as_str()),
            ("code", code_section),
            ("directory_structure", directory_structure_section),
        ]);
        let rendered = SLOT_PATTERN.replace_all(&self.body, |caps: &Captures| {
            match slots.get(&caps[1]) {
                Some(value) => (*value).to_string(),
                None => {
                    log::debug!("Leaving unknown template slot untouched: {}", &caps[0]);
                    caps[0].to_string()
                }
            }
        });
        Ok(rendered.into_owned())
    }
}

use crate::chunking::ChunkSettings;
use crate::error::{AppError, Result};
use crate::extract::{self, LineRange, RedactionRule};
use crate::languages::LanguageTable;
use crate::prompt::PromptTemplate;
use crate::skip_policy::SkipSwitches;
use crate::tokens::DEFAULT_MODEL;
use indexmap::IndexMap;
use log;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_DIR: &str = ".xtools/xprompt";
pub const DEFAULT_CONFIG_FILENAME: &str = "xprompt.toml";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub scan: SkipSwitches,
    #[serde(default)]
    pub redaction: RedactionConfig,
    #[serde(default)]
    pub chunking: ChunkSettings,
    #[serde(default)]
    pub lines: LinesConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub languages: IndexMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RedactionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub import: Vec<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct LinesConfig {
    #[serde(default)]
    pub start: i64,
    #[serde(default)]
    pub end: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PromptConfig {
    #[serde(default)]
    pub template: PromptTemplate,
    #[serde(default = "default_true")]
    pub include_tree: bool,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            rules: Vec::new(),
            import: Vec::new(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            template: PromptTemplate::default(),
            include_tree: default_true(),
            model: default_model(),
            template_file: None,
        }
    }
}

impl From<LinesConfig> for LineRange {
    fn from(lines: LinesConfig) -> Self {
        LineRange::new(lines.start, lines.end)
    }
}

impl Config {
    pub fn determine_project_root(cli_project_root: Option<&PathBuf>) -> Result<PathBuf> {
        let path_str_opt = cli_project_root
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| env::var("PROJECT_ROOT").ok().filter(|s| !s.is_empty()));

        let path_to_resolve = match path_str_opt {
            Some(p_str) => PathBuf::from(shellexpand::tilde(&p_str).as_ref()),
            None => env::current_dir().map_err(AppError::Io)?,
        };

        let canonical = path_to_resolve
            .canonicalize()
            .map_err(|_| AppError::RootNotFound {
                path: path_to_resolve.clone(),
            })?;
        if !canonical.is_dir() {
            return Err(AppError::RootNotFound { path: canonical });
        }
        Ok(canonical)
    }

    pub fn resolve_config_path(
        project_root: &Path,
        cli_config_file: Option<&String>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        let Some(p_str) = cli_config_file else {
            let default_path = project_root
                .join(DEFAULT_CONFIG_DIR)
                .join(DEFAULT_CONFIG_FILENAME);
            if default_path.exists() {
                log::debug!("Using default config file path: {}", default_path.display());
                return Ok(Some(default_path));
            }
            log::debug!(
                "No config file specified and default not found at: {}",
                default_path.display()
            );
            return Ok(None);
        };

        let mut path = PathBuf::from(shellexpand::tilde(p_str).as_ref());
        let looks_like_path =
            path.is_absolute() || path.components().count() > 1 || p_str.contains(['/', '\\']);

        if looks_like_path {
            if !path.exists() && path.extension().is_none() {
                path.set_extension("toml");
            }
            if !path.exists() {
                return Err(AppError::Config(format!(
                    "Specified config file not found at path: {}",
                    path.display()
                )));
            }
            log::debug!("Using specified config file path: {}", path.display());
            return Ok(Some(path));
        }

        let filename = if path.extension().is_none_or(|e| e != "toml") {
            format!("{}.toml", path.to_string_lossy())
        } else {
            path.to_string_lossy().to_string()
        };
        let full_path = project_root.join(DEFAULT_CONFIG_DIR).join(filename);
        if !full_path.exists() {
            return Err(AppError::Config(format!(
                "Specified config file '{}' not found in default directory: {}",
                path.display(),
                project_root.join(DEFAULT_CONFIG_DIR).display()
            )));
        }
        log::debug!(
            "Using specified config filename in default directory: {}",
            full_path.display()
        );
        Ok(Some(full_path))
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&toml_content).map_err(|e| {
            AppError::TomlParse(format!(
                "Error parsing config file '{}': {}. Check TOML syntax and structure.",
                config_path.display(),
                e
            ))
        })
    }

    pub fn from_toml_str(toml_content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(toml_content).map_err(|e| AppError::TomlParse(e.to_string()))?;
        config.chunking.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn line_range(&self) -> LineRange {
        self.lines.into()
    }

    pub fn language_table(&self) -> LanguageTable {
        LanguageTable::builtin().with_overrides(&self.languages)
    }

    /// Compiles inline rules and imported rule files, in that order.
    ///
    /// Imports are looked up relative to the project root, then the config dir.
    /// Anything that cannot be read or compiled is reported, not fatal.
    pub fn resolve_redaction_rules(
        &self,
        project_root: &Path,
    ) -> (Vec<RedactionRule>, Vec<AppError>) {
        if !self.redaction.enabled {
            log::debug!("Redaction is disabled in configuration.");
            return (Vec::new(), Vec::new());
        }
        let (mut rules, mut diagnostics) =
            extract::parse_redaction_rules(&self.redaction.rules.join("\n"));

        let mut import_paths = Vec::new();
        for import_path_rel in &self.redaction.import {
            let candidates = [
                project_root.join(import_path_rel),
                project_root.join(DEFAULT_CONFIG_DIR).join(import_path_rel),
            ];
            match candidates.into_iter().find(|p| p.exists()) {
                Some(found) => {
                    log::trace!("Found redaction import: {}", found.display());
                    import_paths.push(found);
                }
                None => {
                    log::warn!(
                        "Could not find redaction rule file '{}' relative to project root or config dir. Skipping.",
                        import_path_rel.display()
                    );
                    diagnostics.push(AppError::Config(format!(
                        "Redaction rule file not found: {}",
                        import_path_rel.display()
                    )));
                }
            }
        }
        let (imported, import_errors) = extract::load_rule_files(&import_paths);
        rules.extend(imported);
        diagnostics.extend(import_errors);
        log::info!("Resolved {} redaction rules.", rules.len());
        (rules, diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = config.to_toml_string().unwrap();
        let parsed = Config::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn parses_every_section() {
        let text = r#"
[scan]
skip_node_modules = false

[redaction]
rules = ['(ApiKey=)(\S+) => $1[REDACTED]']

[chunking]
enabled = true
max_lines = 40

[lines]
start = 2
end = 9

[prompt]
template = "review"
include_tree = false

[languages]
".vue" = "vue"
"#;
        let config = Config::from_toml_str(text).unwrap();
        assert!(!config.scan.skip_node_modules);
        assert!(config.scan.skip_git_dir);
        assert_eq!(config.chunking.limit(), Some(40));
        assert_eq!(config.line_range(), LineRange::new(2, 9));
        assert_eq!(config.prompt.template, PromptTemplate::Review);
        assert!(!config.prompt.include_tree);
        assert_eq!(config.prompt.model, DEFAULT_MODEL);
        assert_eq!(
            config.language_table().tag_for_extension("vue"),
            Some("vue")
        );
        let (rules, diagnostics) = config.resolve_redaction_rules(Path::new("/nonexistent"));
        assert_eq!(rules.len(), 1);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn rejects_unknown_fields_and_zero_chunks() {
        assert!(Config::from_toml_str("[scan]\nskip_everything = true\n").is_err());
        assert!(Config::from_toml_str("[chunking]\nenabled = true\nmax_lines = 0\n").is_err());
    }

    #[test]
    fn imports_rules_from_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(DEFAULT_CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("secrets.txt"), "password=\\S+ => password=***\n").unwrap();
        let config = Config {
            redaction: RedactionConfig {
                import: vec![PathBuf::from("secrets.txt"), PathBuf::from("missing.txt")],
                ..RedactionConfig::default()
            },
            ..Config::default()
        };
        let (rules, diagnostics) = config.resolve_redaction_rules(dir.path());
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].apply("password=hunter2"), "password=***");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn resolves_default_and_named_config_paths() {
        let dir = tempfile::tempdir().unwrap();
        assert!(
            Config::resolve_config_path(dir.path(), None, false)
                .unwrap()
                .is_none()
        );
        let config_dir = dir.path().join(DEFAULT_CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join(DEFAULT_CONFIG_FILENAME), "").unwrap();
        fs::write(config_dir.join("alt.toml"), "").unwrap();
        assert_eq!(
            Config::resolve_config_path(dir.path(), None, false).unwrap(),
            Some(config_dir.join(DEFAULT_CONFIG_FILENAME))
        );
        assert_eq!(
            Config::resolve_config_path(dir.path(), Some(&"alt".to_string()), false).unwrap(),
            Some(config_dir.join("alt.toml"))
        );
        assert!(
            Config::resolve_config_path(dir.path(), None, true)
                .unwrap()
                .is_none()
        );
        assert!(Config::resolve_config_path(dir.path(), Some(&"nope".to_string()), false).is_err());
    }
}

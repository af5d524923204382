use indexmap::IndexMap;
use log;
use once_cell::sync::Lazy;
use std::path::Path;

static BUILTIN_LANGUAGES: Lazy<IndexMap<String, String>> = Lazy::new(|| {
    let yaml_content = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../data/languages.yaml"
    ));
    serde_yml::from_str(yaml_content).expect("Failed to parse embedded data/languages.yaml")
});

pub fn get_builtin_languages() -> &'static IndexMap<String, String> {
    &BUILTIN_LANGUAGES
}

/// Extension to code-fence tag lookup. Keys are stored lowercase without the dot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LanguageTable {
    tags: IndexMap<String, String>,
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

impl LanguageTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        Self::empty().with_overrides(get_builtin_languages())
    }

    /// Adds or replaces entries; extensions may be given with or without the dot.
    pub fn with_overrides(mut self, overrides: &IndexMap<String, String>) -> Self {
        for (ext, tag) in overrides {
            let key = normalize_extension(ext);
            if key.is_empty() {
                log::warn!("Ignoring language mapping with empty extension (tag '{}')", tag);
                continue;
            }
            self.tags.insert(key, tag.trim().to_string());
        }
        self
    }

    pub fn tag_for_extension(&self, ext: &str) -> Option<&str> {
        self.tags.get(&normalize_extension(ext)).map(String::as_str)
    }

    /// Fence tag for a file, or an empty string when the extension is unknown.
    pub fn tag_for_path(&self, path: &Path) -> &str {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|ext| self.tag_for_extension(ext))
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

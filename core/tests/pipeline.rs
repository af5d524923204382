use std::fs;
use std::path::Path;
use xprompt_core::{
    AssemblySettings, ChunkSettings, Config, FolderSession, PromptFields, PromptTemplate,
    SkipSwitches, TemplateAssembler, TikTokenEstimator, TokenEstimator,
};

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn setup_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/a.txt", "one\ntwo\nthree\n");
    write(root, "src/b.txt", "bee\n");
    write(root, "src/settings.cs", "var ApiKey=abc123 other=x;\n");
    write(root, "node_modules/dep/index.js", "module.exports = 1;\n");
    write(root, "Node_Modules/other/index.js", "module.exports = 2;\n");
    write(root, "bin/tool.exe", "MZ");
    write(root, "notes.md", "# Notes\n");
    dir
}

#[test]
fn test_selection_to_prompt_workflow() {
    let dir = setup_project();
    let root = dir.path();

    // 1. Scan with default skip policy
    let mut session = FolderSession::open(root, SkipSwitches::default()).unwrap();
    let outline = session.render_outline();
    assert!(!outline.to_lowercase().contains("node_modules"));
    assert!(!outline.contains("tool.exe"));

    // 2. Select one file inside an unchecked folder
    session.set_checked(&root.join("src/a.txt"), true).unwrap();

    let config = Config::from_toml_str(
        r#"
[redaction]
rules = ['(ApiKey=)(\S+) => $1[REDACTED]']
"#,
    )
    .unwrap();
    let (settings, diagnostics) = AssemblySettings::from_config(&config, root).unwrap();
    assert!(diagnostics.is_empty());
    let assembler = TemplateAssembler::builtin(PromptTemplate::None).unwrap();
    let fields = PromptFields {
        request: "Explain this".to_string(),
        ..PromptFields::default()
    };

    let prompt = session.assemble(&settings, &fields, &assembler).unwrap();
    assert_eq!(prompt.selected_files, 1);
    assert!(prompt.text.contains("one\ntwo\nthree"));
    assert!(!prompt.text.contains("bee"));
    assert!(prompt.text.contains("Explain this"));

    // 3. Check the whole folder, leaving b.txt individually unchecked
    session.set_checked(&root.join("src"), true).unwrap();
    session.set_checked(&root.join("src/b.txt"), false).unwrap();
    let prompt = session.assemble(&settings, &fields, &assembler).unwrap();
    assert!(prompt.text.contains("one\ntwo\nthree"));
    assert!(prompt.text.contains("bee"));
    assert!(prompt.text.contains("ApiKey=[REDACTED] other=x"));
    assert!(prompt.text.contains("```csharp\n"));

    // 4. Rescan an unchanged tree: selection survives
    let before = session.selected_files();
    session.rescan().unwrap();
    assert_eq!(session.selected_files(), before);

    // 5. Token estimate over the final text
    let tokens = TikTokenEstimator::new()
        .estimate(&prompt.text, &config.prompt.model)
        .unwrap();
    assert!(tokens > 0);
}

#[test]
fn test_chunked_output_for_large_file() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let body: String = (1..=25).map(|i| format!("row {}\n", i)).collect();
    write(root, "big.rs", &body);

    let mut session = FolderSession::open(root, SkipSwitches::default()).unwrap();
    session.set_checked(root, true).unwrap();

    let settings = AssemblySettings {
        chunking: ChunkSettings::with_max_lines(10),
        include_tree: false,
        ..AssemblySettings::default()
    };
    let assembler = TemplateAssembler::from_body("{{code}}");
    let prompt = session
        .assemble(&settings, &PromptFields::default(), &assembler)
        .unwrap();

    assert_eq!(prompt.text.matches("```rust\n").count(), 3);
    assert!(prompt.text.contains("big.rs (Chunk #1)\nrow 1\n"));
    assert!(prompt.text.contains("big.rs (Chunk #3)\nrow 21\n"));
    assert!(prompt.text.ends_with("row 25\n```\n\n"));
}

#[test]
fn test_skip_switch_excludes_subtree_from_output() {
    let dir = setup_project();
    let root = dir.path();
    let mut session = FolderSession::open(root, SkipSwitches::default()).unwrap();
    session.set_checked(root, true).unwrap();

    let assembler = TemplateAssembler::from_body("{{code}}");
    let prompt = session
        .assemble(
            &AssemblySettings::default(),
            &PromptFields::default(),
            &assembler,
        )
        .unwrap();
    assert!(!prompt.text.contains("module.exports"));
    assert!(prompt.text.contains("# Notes"));
}

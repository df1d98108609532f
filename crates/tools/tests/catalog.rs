#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use serde_json::json;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use switchboard_core::{ManualClock, ToolArgs};
use switchboard_tools::*;
use tempfile::TempDir;

fn registry() -> Arc<ToolRegistry> {
    Arc::new(
        ToolRegistry::with_builtins(
            builtin_tools(Arc::new(ManualClock::default())),
            Duration::from_secs(5),
            SandboxLimits::default(),
        )
        .unwrap(),
    )
}

fn echo_def(name: &str) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: "Echoes text".to_string(),
        code: format!("{{% macro {name}(text) %}}{{{{ text }}}}{{% endmacro %}}"),
        parameters: vec![ParameterSpec::required("text", ParamType::String, "Text")],
    }
}

fn args(value: serde_json::Value) -> ToolArgs {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn test_create_registers_tool() {
    let registry = registry();
    let catalog = ToolCatalog::new(Arc::clone(&registry));

    let tool = catalog.create(echo_def("echo")).unwrap();
    assert_eq!(catalog.get(&tool.id).unwrap(), tool);

    let out = registry
        .invoke("echo", args(json!({"text": "ping"})))
        .await
        .unwrap();
    assert_eq!(out, "ping");
}

#[test]
fn test_create_invalid_handler_stores_nothing() {
    let registry = registry();
    let catalog = ToolCatalog::new(Arc::clone(&registry));

    let mut def = echo_def("broken");
    def.code = "no macro here".to_string();
    let result = catalog.create(def);

    assert!(matches!(
        result,
        Err(CatalogError::Tool(ToolError::Registration(_)))
    ));
    assert!(catalog.list().is_empty());
    assert!(!registry.contains("broken"));
}

#[test]
fn test_create_duplicate_name() {
    let catalog = ToolCatalog::new(registry());
    catalog.create(echo_def("echo")).unwrap();
    let result = catalog.create(echo_def("echo"));
    assert!(matches!(result, Err(CatalogError::DuplicateName(name)) if name == "echo"));
}

#[test]
fn test_update_can_empty_description() {
    let registry = registry();
    let catalog = ToolCatalog::new(Arc::clone(&registry));
    let tool = catalog.create(echo_def("echo")).unwrap();

    let patch = ToolPatch {
        description: Some(String::new()),
        ..ToolPatch::default()
    };
    let updated = catalog.update(&tool.id, &patch).unwrap();

    assert_eq!(updated.definition.description, "");
    assert_eq!(updated.definition.code, tool.definition.code);
    let listed = registry
        .list()
        .into_iter()
        .find(|t| t.name == "echo")
        .unwrap();
    assert_eq!(listed.description, "");
}

#[tokio::test]
async fn test_update_rename() {
    let registry = registry();
    let catalog = ToolCatalog::new(Arc::clone(&registry));
    let tool = catalog.create(echo_def("echo")).unwrap();

    let patch = ToolPatch {
        name: Some("parrot".to_string()),
        code: Some("{% macro parrot(text) %}{{ text }} {{ text }}{% endmacro %}".to_string()),
        ..ToolPatch::default()
    };
    catalog.update(&tool.id, &patch).unwrap();

    assert!(!registry.contains("echo"));
    let out = registry
        .invoke("parrot", args(json!({"text": "hi"})))
        .await
        .unwrap();
    assert_eq!(out, "hi hi");
}

#[test]
fn test_failed_update_keeps_old_version() {
    let registry = registry();
    let catalog = ToolCatalog::new(Arc::clone(&registry));
    let tool = catalog.create(echo_def("echo")).unwrap();

    let patch = ToolPatch {
        code: Some("{% macro echo(text) %}{{ text".to_string()),
        ..ToolPatch::default()
    };
    assert!(catalog.update(&tool.id, &patch).is_err());
    assert_eq!(catalog.get(&tool.id).unwrap(), tool);
    assert!(registry.contains("echo"));
}

#[test]
fn test_update_unknown_id() {
    let catalog = ToolCatalog::new(registry());
    let result = catalog.update("missing", &ToolPatch::default());
    assert!(matches!(result, Err(CatalogError::NotFound(_))));
}

#[tokio::test]
async fn test_delete_unregisters() {
    let registry = registry();
    let catalog = ToolCatalog::new(Arc::clone(&registry));
    let tool = catalog.create(echo_def("echo")).unwrap();

    catalog.delete(&tool.id).unwrap();
    assert!(matches!(catalog.get(&tool.id), Err(CatalogError::NotFound(_))));
    assert!(matches!(catalog.delete(&tool.id), Err(CatalogError::NotFound(_))));

    let result = registry.invoke("echo", args(json!({"text": "x"}))).await;
    assert_eq!(result, Err(ToolError::NotFound("echo".to_string())));
}

#[test]
fn test_save_and_load_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tools.yaml");

    let catalog = ToolCatalog::new(registry());
    catalog.create(echo_def("echo")).unwrap();
    catalog.create(echo_def("repeat")).unwrap();
    catalog.save(&path).unwrap();

    let fresh = registry();
    let loaded = ToolCatalog::load(Arc::clone(&fresh), &path).unwrap();
    assert_eq!(loaded.list(), catalog.list());
    assert!(fresh.contains("echo"));
    assert!(fresh.contains("repeat"));
}

#[test]
fn test_load_skips_invalid_entries() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tools.yaml");
    fs::write(
        &path,
        r#"- id: "1"
  name: good
  description: fine
  code: "{% macro good() %}ok{% endmacro %}"
- id: "2"
  name: bad
  description: broken
  code: "{% macro bad() %}{{ oops"
"#,
    )
    .unwrap();

    let registry = registry();
    let catalog = ToolCatalog::load(Arc::clone(&registry), &path).unwrap();
    assert_eq!(catalog.list().len(), 1);
    assert!(registry.contains("good"));
    assert!(!registry.contains("bad"));
}

#[test]
fn test_load_empty_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tools.yaml");
    fs::write(&path, "").unwrap();
    let catalog = ToolCatalog::load(registry(), &path).unwrap();
    assert!(catalog.list().is_empty());
}

#[test]
fn test_open_missing_file_starts_empty() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tools.yaml");

    let catalog = ToolCatalog::open(registry(), &path).unwrap();
    assert!(catalog.list().is_empty());
    assert_eq!(catalog.path(), Some(path.as_path()));
    assert!(!path.exists());
}

#[test]
fn test_opened_catalog_writes_every_change() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tools.yaml");
    let catalog = ToolCatalog::open(registry(), &path).unwrap();

    let tool = catalog.create(echo_def("echo")).unwrap();
    let reloaded = ToolCatalog::load(registry(), &path).unwrap();
    assert_eq!(reloaded.list(), vec![tool.clone()]);

    let patch = ToolPatch {
        description: Some("Repeats text".to_string()),
        ..ToolPatch::default()
    };
    let updated = catalog.update(&tool.id, &patch).unwrap();
    let reloaded = ToolCatalog::load(registry(), &path).unwrap();
    assert_eq!(reloaded.list(), vec![updated]);

    catalog.delete(&tool.id).unwrap();
    let reloaded = ToolCatalog::load(registry(), &path).unwrap();
    assert!(reloaded.list().is_empty());
}

/// Replace the catalog's parent directory with a regular file so the next
/// write fails.
fn block_writes(dir: &std::path::Path) {
    fs::remove_dir_all(dir).unwrap();
    fs::write(dir, "not a directory").unwrap();
}

#[tokio::test]
async fn test_failed_save_rolls_back_create() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("catalog");
    fs::write(&dir, "not a directory").unwrap();

    let registry = registry();
    let catalog = ToolCatalog::open(Arc::clone(&registry), dir.join("tools.yaml")).unwrap();
    let result = catalog.create(echo_def("echo"));

    assert!(matches!(result, Err(CatalogError::Io(_))));
    assert!(catalog.list().is_empty());
    assert!(!registry.contains("echo"));
    let result = registry.invoke("echo", args(json!({"text": "x"}))).await;
    assert_eq!(result, Err(ToolError::NotFound("echo".to_string())));
}

#[tokio::test]
async fn test_failed_save_rolls_back_update() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("catalog");
    let registry = registry();
    let catalog = ToolCatalog::open(Arc::clone(&registry), dir.join("tools.yaml")).unwrap();
    let tool = catalog.create(echo_def("echo")).unwrap();
    block_writes(&dir);

    let patch = ToolPatch {
        name: Some("parrot".to_string()),
        code: Some("{% macro parrot(text) %}{{ text }} {{ text }}{% endmacro %}".to_string()),
        ..ToolPatch::default()
    };
    let result = catalog.update(&tool.id, &patch);

    assert!(matches!(result, Err(CatalogError::Io(_))));
    assert_eq!(catalog.get(&tool.id).unwrap(), tool);
    assert!(!registry.contains("parrot"));
    let out = registry
        .invoke("echo", args(json!({"text": "ping"})))
        .await
        .unwrap();
    assert_eq!(out, "ping");
}

#[test]
fn test_failed_save_rolls_back_delete() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("catalog");
    let registry = registry();
    let catalog = ToolCatalog::open(Arc::clone(&registry), dir.join("tools.yaml")).unwrap();
    let tool = catalog.create(echo_def("echo")).unwrap();
    block_writes(&dir);

    let result = catalog.delete(&tool.id);

    assert!(matches!(result, Err(CatalogError::Io(_))));
    assert_eq!(catalog.list(), vec![tool]);
    assert!(registry.contains("echo"));
}

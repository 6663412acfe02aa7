//! Integration Tests for Plugin Registration
//!
//! Registers plugin folders from disk and resolves what they produced.

use std::fs;
use std::path::Path;

use launchline::catalog::register_plugin;
use launchline::models::{CommandMode, Visibility};
use launchline::{CommandCatalog, Error, Resolver, SqliteCatalog};
use std::sync::Arc;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_terminal_and_composite_plugins_resolve() {
    let root = TempDir::new().unwrap();
    let ask = root.path().join("ask-name");
    write(
        &ask,
        "plugin.json",
        r#"{
            "name": "ask-name",
            "description": "Ask for a name",
            "mode": "terminal",
            "waitable": true,
            "supports_incremental_query": true,
            "executor_path": "python3",
            "target_path": "ask.py"
        }"#,
    );
    write(&ask, "ask.py", "print('{}')\n");

    let greet = root.path().join("greet");
    write(
        &greet,
        "plugin.json",
        r#"{"name": "greet", "mode": "composite", "links_path": "links.json"}"#,
    );
    write(
        &greet,
        "links.json",
        r#"{"links": [{"name": "ask-name", "input": "Ada"}, {"name": "ask-name", "waitable": false, "input": ""}]}"#,
    );

    let catalog = Arc::new(SqliteCatalog::open(root.path().join("plugins.db")).unwrap());
    let first = register_plugin(&catalog, &ask).unwrap();
    assert_eq!(first.mode, CommandMode::Terminal);
    let second = register_plugin(&catalog, &greet).unwrap();
    assert_eq!(second.links, 2);

    let chain = Resolver::new(catalog.clone()).resolve("greet", false).unwrap();
    let steps: Vec<_> = chain.steps().collect();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].preset_input, "Ada");
    assert!(steps[0].waitable);
    assert_eq!(steps[1].preset_input, "");
    assert!(!steps[1].waitable);

    assert!(steps[0].has_executor);
    assert_eq!(steps[0].executor_path.as_deref(), Some("python3"));
    assert!(steps[0].target_path.ends_with("ask.py"));
    assert!(Path::new(&steps[0].target_path).is_absolute());
}

#[test]
fn test_legacy_manifest_is_accepted() {
    let root = TempDir::new().unwrap();
    let plugin = root.path().join("night");
    write(
        &plugin,
        "plugin.json",
        r#"{
            "name": "night-mode",
            "label": "nsfw",
            "mode": "raw",
            "associatable": false,
            "source_path": "/usr/bin/true"
        }"#,
    );

    let catalog = SqliteCatalog::open_in_memory().unwrap();
    register_plugin(&catalog, &plugin).unwrap();

    assert!(catalog.entry("night-mode", false).unwrap().is_none());
    let entry = catalog.entry("night-mode", true).unwrap().unwrap();
    assert_eq!(entry.visibility, Visibility::Restricted);
    assert_eq!(entry.mode, CommandMode::Terminal);
}

#[test]
fn test_reregistration_keeps_usage_and_switches_mode() {
    let root = TempDir::new().unwrap();
    let plugin = root.path().join("tool");
    write(
        &plugin,
        "plugin.json",
        r#"{"name": "tool", "mode": "terminal", "target_path": "/usr/bin/true"}"#,
    );

    let catalog = SqliteCatalog::open_in_memory().unwrap();
    register_plugin(&catalog, &plugin).unwrap();
    catalog.increment_usage("tool").unwrap();
    catalog.set_starred("tool", true).unwrap();

    write(
        &plugin,
        "plugin.json",
        r#"{"name": "tool", "mode": "composite", "configure_path": "links.json"}"#,
    );
    write(&plugin, "links.json", r#"{"CommandCombination": []}"#);
    register_plugin(&catalog, &plugin).unwrap();

    let entry = catalog.entry("tool", false).unwrap().unwrap();
    assert_eq!(entry.mode, CommandMode::Composite);
    assert_eq!(entry.use_count, 1);
    assert!(entry.starred);
    assert!(catalog
        .fetch_steps(&["tool".to_string()], false)
        .unwrap()
        .is_empty());
}

#[test]
fn test_invalid_manifests_are_rejected() {
    let root = TempDir::new().unwrap();
    let catalog = SqliteCatalog::open_in_memory().unwrap();

    let missing = root.path().join("missing");
    fs::create_dir_all(&missing).unwrap();
    assert!(matches!(
        register_plugin(&catalog, &missing),
        Err(Error::ManifestInvalid { .. })
    ));

    let no_target = root.path().join("no-target");
    write(&no_target, "plugin.json", r#"{"name": "x", "mode": "terminal"}"#);
    assert!(matches!(
        register_plugin(&catalog, &no_target),
        Err(Error::ManifestInvalid { .. })
    ));

    let no_links = root.path().join("no-links");
    write(&no_links, "plugin.json", r#"{"name": "y", "mode": "composite"}"#);
    assert!(matches!(
        register_plugin(&catalog, &no_links),
        Err(Error::ManifestInvalid { .. })
    ));

    let bad_mode = root.path().join("bad-mode");
    write(&bad_mode, "plugin.json", r#"{"name": "z", "mode": "sideways"}"#);
    assert!(matches!(
        register_plugin(&catalog, &bad_mode),
        Err(Error::ManifestInvalid { .. })
    ));

    assert_eq!(catalog.count().unwrap(), 0);
}

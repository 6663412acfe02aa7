//! Integration Tests for Command Resolution
//!
//! Composite flattening, override inheritance, cycle detection, visibility
//! and suggestion ordering against a real (in-memory) catalog.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use launchline::models::CommandLink;
use launchline::resolver::ClosureStatus;
use launchline::{CommandCatalog, Error, Resolver};
use std::sync::Arc;
use test_utils::{link, plain, CatalogBuilder};

#[test]
fn test_nested_composites_flatten_in_pre_order() {
    let resolver = CatalogBuilder::new()
        .terminal("x")
        .terminal("y")
        .terminal("p")
        .terminal("q")
        .composite("inner", &["p", "q"])
        .composite("outer", &["x", "inner", "y"])
        .resolver();

    let chain = resolver.resolve("outer", false).unwrap();
    assert_eq!(chain.names(), vec!["x", "p", "q", "y"]);
    assert_eq!(chain.name, "outer");
}

#[test]
fn test_repeated_terminal_keeps_each_occurrence() {
    let resolver = CatalogBuilder::new()
        .terminal("echo")
        .links(
            "twice",
            vec![
                link("twice", 0, "echo").with_input("first"),
                link("twice", 1, "echo").with_input("second"),
            ],
        )
        .resolver();

    let chain = resolver.resolve("twice", false).unwrap();
    let inputs: Vec<&str> = chain.steps().map(|s| s.preset_input.as_str()).collect();
    assert_eq!(inputs, vec!["first", "second"]);
}

#[test]
fn test_root_recurrence_is_a_cycle() {
    let resolver = CatalogBuilder::new()
        .terminal("x")
        .composite("a", &["x", "b"])
        .composite("b", &["x", "a"])
        .resolver();

    let err = resolver.resolve("a", false).unwrap_err();
    assert!(matches!(err, Error::CycleDetected { ref name } if name == "a"));

    let closure = resolver.closure("a", false).unwrap();
    assert_eq!(closure.status, ClosureStatus::Cycle);
    assert!(closure.leaves.is_empty());
}

#[test]
fn test_self_link_is_a_cycle() {
    let resolver = CatalogBuilder::new()
        .terminal("x")
        .composite("loop", &["x", "loop"])
        .resolver();

    assert!(matches!(
        resolver.resolve("loop", false),
        Err(Error::CycleDetected { .. })
    ));
}

#[test]
fn test_shared_subcomposite_is_not_a_cycle() {
    let resolver = CatalogBuilder::new()
        .terminal("x")
        .composite("shared", &["x"])
        .composite("top", &["shared", "shared"])
        .resolver();

    assert_eq!(resolver.resolve("top", false).unwrap().names(), vec!["x", "x"]);
}

#[test]
fn test_waitable_is_and_combined_along_the_path() {
    let resolver = CatalogBuilder::new()
        .step(plain("ask").waitable(true))
        .step(plain("quiet").waitable(false))
        .links(
            "inner",
            vec![link("inner", 0, "ask"), link("inner", 1, "quiet")],
        )
        .links("forced", vec![link("forced", 0, "inner").waitable(false)])
        .links("neutral", vec![link("neutral", 0, "inner")])
        .resolver();

    let forced = resolver.resolve("forced", false).unwrap();
    assert!(forced.steps().all(|s| !s.waitable));

    let neutral = resolver.resolve("neutral", false).unwrap();
    let flags: Vec<bool> = neutral.steps().map(|s| s.waitable).collect();
    assert_eq!(flags, vec![true, false]);
}

#[test]
fn test_stored_preset_used_without_override() {
    let resolver = CatalogBuilder::new()
        .step(plain("open-site").with_preset_input("https://x"))
        .composite("bookmarks", &["open-site"])
        .resolver();

    let chain = resolver.resolve("bookmarks", false).unwrap();
    assert_eq!(chain.steps().next().unwrap().preset_input, "https://x");
}

#[test]
fn test_restricted_nodes_are_absent_unless_allowed() {
    let resolver = CatalogBuilder::new()
        .terminal("public-step")
        .restricted("private-step")
        .composite("mixed", &["public-step", "private-step"])
        .composite("only-private", &["private-step"])
        .resolver();

    assert_eq!(
        resolver.resolve("mixed", false).unwrap().names(),
        vec!["public-step"]
    );
    assert_eq!(
        resolver.resolve("mixed", true).unwrap().names(),
        vec!["public-step", "private-step"]
    );
    assert!(matches!(
        resolver.resolve("only-private", false),
        Err(Error::NotFound { .. })
    ));
    assert!(matches!(
        resolver.resolve("private-step", false),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn test_restricted_intermediate_composite_is_skipped() {
    let resolver = CatalogBuilder::new()
        .terminal("a")
        .terminal("b")
        .restricted_links("hidden", vec![link("hidden", 0, "b")])
        .composite("top", &["a", "hidden"])
        .resolver();

    assert_eq!(resolver.resolve("top", false).unwrap().names(), vec!["a"]);
    assert_eq!(resolver.resolve("top", true).unwrap().names(), vec!["a", "b"]);
}

#[test]
fn test_dangling_link_is_ignored() {
    let resolver = CatalogBuilder::new()
        .terminal("a")
        .composite("top", &["a", "never-registered"])
        .resolver();

    assert_eq!(resolver.resolve("top", false).unwrap().names(), vec!["a"]);
}

#[test]
fn test_closure_reports_inherited_values() {
    let links: Vec<CommandLink> = vec![
        link("top", 0, "a").waitable(false).with_input("one"),
        link("top", 1, "b"),
    ];
    let resolver = CatalogBuilder::new()
        .terminal("a")
        .terminal("b")
        .links("top", links)
        .resolver();

    let closure = resolver.closure("top", false).unwrap();
    assert_eq!(closure.status, ClosureStatus::Valid);
    assert_eq!(closure.leaves.len(), 2);
    assert!(!closure.leaves[0].inherited_waitable);
    assert_eq!(closure.leaves[0].inherited_preset_input.as_deref(), Some("one"));
    assert!(closure.leaves[1].inherited_waitable);
    assert_eq!(closure.leaves[1].inherited_preset_input, None);
}

#[test]
fn test_suggestions_ranked_by_star_then_usage() {
    let resolver = CatalogBuilder::new()
        .terminal("open-alpha")
        .terminal("open-beta")
        .terminal("open-gamma")
        .terminal("close")
        .used("open-alpha", 1)
        .used("open-beta", 5)
        .star("open-gamma")
        .resolver();

    assert_eq!(
        resolver.suggest("open", false).unwrap(),
        vec!["open-gamma", "open-beta", "open-alpha"]
    );
    assert_eq!(resolver.suggest("PEN-B", false).unwrap(), vec!["open-beta"]);
    assert!(resolver.suggest("zzz", false).unwrap().is_empty());
}

#[test]
fn test_suggestions_capped_and_idempotent() {
    let mut builder = CatalogBuilder::new();
    for i in 0..12 {
        builder = builder.terminal(&format!("tool-{:02}", i));
    }
    let catalog = builder.build();

    let default = Resolver::new(catalog.clone());
    let first = default.suggest("tool", false).unwrap();
    assert_eq!(first.len(), 8);
    assert_eq!(first, default.suggest("tool", false).unwrap());

    let narrow = Resolver::new(catalog).with_limits(3, 20);
    assert_eq!(narrow.suggest("tool", false).unwrap().len(), 3);
}

#[test]
fn test_suggestion_pattern_is_literal() {
    let resolver = CatalogBuilder::new()
        .terminal("100%_done")
        .terminal("1000-done")
        .resolver();

    assert_eq!(resolver.suggest("0%_", false).unwrap(), vec!["100%_done"]);
}

#[test]
fn test_usage_increment_reorders_suggestions() {
    let catalog = CatalogBuilder::new().terminal("git-a").terminal("git-b").build();
    let resolver = Resolver::new(catalog.clone());

    assert_eq!(resolver.suggest("git", false).unwrap(), vec!["git-a", "git-b"]);
    assert!(catalog.increment_usage("git-b").unwrap());
    assert_eq!(resolver.suggest("git", false).unwrap(), vec!["git-b", "git-a"]);
    assert!(!catalog.increment_usage("missing").unwrap());
}

#[test]
fn test_resolver_shared_across_threads() {
    let resolver = CatalogBuilder::new()
        .terminal("x")
        .composite("c", &["x", "x"])
        .resolver();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            std::thread::spawn(move || resolver.resolve("c", false).unwrap().len())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 2);
    }
}

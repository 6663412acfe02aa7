//! Integration Tests for the Dispatcher
//!
//! Role swaps between search and an active chain, background completion
//! delivery, visibility toggling and reset.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use launchline::models::{ControlSignal, UiAction};
use launchline::{CommandCatalog, Dispatcher, Error, Resolver, SqliteCatalog};
use test_utils::{plain, CatalogBuilder, ScriptedRunner};

fn dispatcher(catalog: &Arc<SqliteCatalog>, runner: &Arc<ScriptedRunner>) -> Dispatcher {
    let resolver = Arc::new(Resolver::new(catalog.clone()));
    Dispatcher::new(resolver, runner.clone())
}

#[tokio::test]
async fn test_select_hands_off_then_completes_in_background() {
    let catalog = CatalogBuilder::new().terminal("open-site").build();
    let runner = Arc::new(ScriptedRunner::new());
    let mut dispatcher = dispatcher(&catalog, &runner);

    let outcome = dispatcher.on_select("open-site").await;
    assert_eq!(outcome.signal, ControlSignal::switch_to("open-site"));
    assert!(dispatcher.is_busy());
    assert_eq!(dispatcher.active_chain(), Some("open-site"));

    let done = dispatcher.wait_background().await.unwrap();
    assert_eq!(done.signal, ControlSignal::close());
    assert!(done.diagnostic.is_none());
    assert!(!dispatcher.is_busy());
    assert_eq!(runner.run_names(), vec!["open-site"]);

    let entry = catalog.entry("open-site", false).unwrap().unwrap();
    assert_eq!(entry.use_count, 1);
}

#[tokio::test]
async fn test_paused_chain_takes_input_in_active_role() {
    let catalog = CatalogBuilder::new()
        .step(plain("ask-name").waitable(true))
        .composite("greet", &["ask-name"])
        .build();
    let runner = Arc::new(ScriptedRunner::new());
    let mut dispatcher = dispatcher(&catalog, &runner);

    dispatcher.on_select("greet").await;
    let paused = dispatcher.wait_background().await.unwrap();
    assert_eq!(paused.signal, ControlSignal::stay());
    assert!(dispatcher.is_busy());

    let outcome = dispatcher.on_select("Ada").await;
    assert_eq!(outcome.signal, ControlSignal::close());
    assert!(!dispatcher.is_busy());
    assert_eq!(
        runner.runs(),
        vec![("ask-name".to_string(), "Ada".to_string())]
    );
}

#[tokio::test]
async fn test_search_suggestions_and_echo_suppression() {
    let catalog = CatalogBuilder::new()
        .terminal("open-site")
        .terminal("open-mail")
        .build();
    let runner = Arc::new(ScriptedRunner::new());
    let dispatcher = dispatcher(&catalog, &runner);

    assert_eq!(
        dispatcher.on_text_changed("open").await,
        vec!["open-mail", "open-site"]
    );
    assert!(dispatcher.on_text_changed("open-site").await.is_empty());
    assert!(dispatcher.on_text_changed("").await.is_empty());
}

#[tokio::test]
async fn test_active_suggestions_come_from_step() {
    let catalog = CatalogBuilder::new()
        .step(plain("pick").waitable(true).associatable(true))
        .build();
    let runner = Arc::new(ScriptedRunner::new());
    runner.set_suggestions("pick", &["alpha", "alpine"]);
    let mut dispatcher = dispatcher(&catalog, &runner);

    dispatcher.on_select("pick").await;
    dispatcher.wait_background().await;

    assert_eq!(dispatcher.on_text_changed("al").await, vec!["alpha", "alpine"]);
    assert!(dispatcher.on_text_changed("").await.is_empty());
    assert_eq!(runner.queries().len(), 1);
}

#[tokio::test]
async fn test_toggle_token_reveals_restricted_commands() {
    let catalog = CatalogBuilder::new()
        .terminal("public-tool")
        .restricted("private-tool")
        .build();
    let runner = Arc::new(ScriptedRunner::new());
    let mut dispatcher = dispatcher(&catalog, &runner);

    assert_eq!(dispatcher.on_text_changed("tool").await, vec!["public-tool"]);
    assert!(matches!(
        dispatcher.on_select("private-tool").await.diagnostic,
        Some(Error::NotFound { .. })
    ));

    let toggled = dispatcher.on_select("nsfw").await;
    assert_eq!(toggled.signal, ControlSignal::stay());
    assert!(dispatcher.allow_restricted());
    assert!(!dispatcher.is_busy());
    assert_eq!(
        dispatcher.on_text_changed("tool").await,
        vec!["private-tool", "public-tool"]
    );
}

#[tokio::test]
async fn test_cycle_reported_distinctly() {
    let catalog = CatalogBuilder::new()
        .terminal("x")
        .composite("a", &["x", "b"])
        .composite("b", &["a"])
        .build();
    let runner = Arc::new(ScriptedRunner::new());
    let mut dispatcher = dispatcher(&catalog, &runner);

    let outcome = dispatcher.on_select("a").await;
    assert_eq!(*outcome.action(), UiAction::Close);
    assert!(matches!(outcome.diagnostic, Some(Error::CycleDetected { .. })));
    assert!(!dispatcher.is_busy());
    assert!(dispatcher.wait_background().await.is_none());
    assert_eq!(runner.run_count(), 0);
}

#[tokio::test]
async fn test_background_failure_reverts_to_search() {
    let catalog = CatalogBuilder::new().terminal("broken").build();
    let runner = Arc::new(ScriptedRunner::new());
    runner.fail_launch("broken");
    let mut dispatcher = dispatcher(&catalog, &runner);

    dispatcher.on_select("broken").await;
    let done = dispatcher.wait_background().await.unwrap();

    assert_eq!(done.signal, ControlSignal::close());
    assert!(matches!(
        done.diagnostic,
        Some(Error::ProcessLaunchFailure { .. })
    ));
    assert!(!dispatcher.is_busy());
}

#[tokio::test]
async fn test_poll_background_while_running() {
    let catalog = CatalogBuilder::new()
        .terminal("slow")
        .step(plain("confirm").waitable(true))
        .composite("deploy", &["slow", "confirm"])
        .build();
    let runner = Arc::new(ScriptedRunner::with_delay(Duration::from_millis(200)));
    let mut dispatcher = dispatcher(&catalog, &runner);

    dispatcher.on_select("deploy").await;
    assert!(dispatcher.poll_background().is_none());

    // Input is held back while the first steps are still running
    let early = dispatcher.on_select("yes").await;
    assert_eq!(early.signal, ControlSignal::stay());

    let paused = dispatcher.wait_background().await.unwrap();
    assert_eq!(paused.signal, ControlSignal::stay());
    assert!(dispatcher.poll_background().is_none());

    let outcome = dispatcher.on_select("yes").await;
    assert_eq!(outcome.signal, ControlSignal::close());
    assert_eq!(
        runner.runs(),
        vec![
            ("slow".to_string(), String::new()),
            ("confirm".to_string(), "yes".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_reset_cancels_and_returns_to_search() {
    let catalog = CatalogBuilder::new()
        .step(plain("ask").waitable(true))
        .terminal("other")
        .build();
    let runner = Arc::new(ScriptedRunner::new());
    let mut dispatcher = dispatcher(&catalog, &runner);

    dispatcher.on_select("ask").await;
    dispatcher.wait_background().await;
    assert!(dispatcher.is_busy());

    dispatcher.reset();
    assert!(!dispatcher.is_busy());
    assert!(dispatcher.poll_background().is_none());

    // Back in search: a name is resolved, not fed to the old step
    let outcome = dispatcher.on_select("other").await;
    assert_eq!(outcome.signal, ControlSignal::switch_to("other"));
    dispatcher.wait_background().await;
    assert_eq!(runner.run_names(), vec!["other"]);
}

#[tokio::test]
async fn test_reset_during_background_run_drops_result() {
    let catalog = CatalogBuilder::new()
        .terminal("slow")
        .terminal("never")
        .composite("chain", &["slow", "never"])
        .build();
    let runner = Arc::new(ScriptedRunner::with_delay(Duration::from_millis(100)));
    let mut dispatcher = dispatcher(&catalog, &runner);

    dispatcher.on_select("chain").await;
    dispatcher.reset();
    assert!(dispatcher.wait_background().await.is_none());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!runner.run_names().contains(&"never".to_string()));
}

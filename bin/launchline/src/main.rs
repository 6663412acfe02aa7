//! launchline - type a short name, run a command chain
//!
//! Line-oriented front end over the launchline dispatcher. It stands in for
//! a launcher window: each line is either a suggestion request, a reset, or
//! a selection, and every control signal is printed the way a window would
//! react to it.

use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

use launchline::catalog::register_plugin;
use launchline::{Config, Dispatcher, Outcome, SqliteCatalog, UiAction};

/// What to do after parsing arguments
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    /// Interactive loop over stdin
    Interactive,
    /// Register plugin folders into the catalog
    Register(Vec<PathBuf>),
    /// Print suggestions for one input and exit
    Suggest(String),
    /// Create the catalog schema and exit
    InitDb,
    /// Pin or unpin a command in suggestion order
    Star { name: String, starred: bool },
}

/// Application configuration
#[derive(Debug)]
struct AppArgs {
    /// Configuration file path
    config_path: Option<PathBuf>,
    /// Catalog override
    db_path: Option<PathBuf>,
    /// Enable debug mode
    debug: bool,
    /// Subcommand
    action: Action,
}

impl Default for AppArgs {
    fn default() -> Self {
        Self {
            config_path: None,
            db_path: None,
            debug: false,
            action: Action::Interactive,
        }
    }
}

impl AppArgs {
    /// Parse command line arguments (program name already stripped)
    fn parse(args: &[String]) -> Result<Self> {
        let mut app_args = AppArgs::default();
        let mut positional = Vec::new();

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--config" | "-c" => {
                    let path = args.get(i + 1).context("Missing config file path")?;
                    app_args.config_path = Some(PathBuf::from(path));
                    i += 1;
                }
                "--db" => {
                    let path = args.get(i + 1).context("Missing catalog path")?;
                    app_args.db_path = Some(PathBuf::from(path));
                    i += 1;
                }
                "--debug" | "-d" => {
                    app_args.debug = true;
                }
                "--help" | "-?" => {
                    print_help();
                    process::exit(0);
                }
                "--version" | "-v" => {
                    println!("launchline v{}", launchline::VERSION);
                    process::exit(0);
                }
                arg if arg.starts_with('-') && positional.is_empty() => {
                    anyhow::bail!("Unknown option: {}", arg);
                }
                _ => positional.push(args[i].clone()),
            }
            i += 1;
        }

        app_args.action = Self::parse_action(positional)?;
        Ok(app_args)
    }

    fn parse_action(positional: Vec<String>) -> Result<Action> {
        let mut words = positional.into_iter();
        let Some(command) = words.next() else {
            return Ok(Action::Interactive);
        };
        let rest: Vec<String> = words.collect();

        match command.as_str() {
            "register" => {
                if rest.is_empty() {
                    anyhow::bail!("register needs at least one plugin folder");
                }
                Ok(Action::Register(rest.into_iter().map(PathBuf::from).collect()))
            }
            "suggest" => Ok(Action::Suggest(rest.join(" "))),
            "init-db" => Ok(Action::InitDb),
            "star" | "unstar" => {
                let name = rest.first().context("star needs a command name")?.clone();
                Ok(Action::Star {
                    name,
                    starred: command == "star",
                })
            }
            other => anyhow::bail!("Unknown command: {}", other),
        }
    }
}

/// Print help information
fn print_help() {
    println!("{} - {}", launchline::NAME, launchline::DESCRIPTION);
    println!();
    println!("USAGE:");
    println!("    launchline [OPTIONS] [COMMAND]");
    println!();
    println!("COMMANDS:");
    println!("    register <FOLDER>...   Register plugin folders (each holding plugin.json)");
    println!("    suggest <TEXT>         Print name suggestions for TEXT");
    println!("    star <NAME>            Pin NAME to the top of suggestions");
    println!("    unstar <NAME>          Unpin NAME");
    println!("    init-db                Create the catalog database");
    println!("    (none)                 Interactive mode");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <PATH>    Path to configuration file");
    println!("        --db <PATH>        Path to the catalog database");
    println!("    -d, --debug            Enable debug logging");
    println!("    -?, --help             Print this help message");
    println!("    -v, --version          Print version information");
    println!();
    println!("INTERACTIVE MODE:");
    println!("    ?<text>                Show suggestions for <text>");
    println!("    !reset                 Cancel the active chain");
    println!("    <text>                 Select a command, or answer the active step");
    println!();
    println!("ENVIRONMENT:");
    println!("    LAUNCHLINE_CONFIG      Path to configuration file");
    println!("    LAUNCHLINE_DEBUG       Enable debug mode (1 or true)");
    println!("    RUST_LOG               Set logging level (error, warn, info, debug, trace)");
}

#[tokio::main]
async fn main() -> Result<()> {
    let raw: Vec<String> = env::args().skip(1).collect();
    let args = AppArgs::parse(&raw).unwrap_or_else(|e| {
        eprintln!("Failed to parse arguments: {}", e);
        print_help();
        process::exit(1);
    });

    let mut config = load_configuration(&args);
    init_logging(&args, &config);

    info!("Starting launchline v{}", launchline::VERSION);
    debug!("Arguments: {:?}", args);

    if let Some(db) = &args.db_path {
        config.catalog.path = db.clone();
    }

    if let Err(e) = run(&args, &config).await {
        error!("{:#}", e);
        if let Some(err) = e.downcast_ref::<launchline::Error>() {
            eprintln!("{}", launchline::handle_startup_error(err));
        } else {
            eprintln!("{:#}", e);
        }
        process::exit(1);
    }

    Ok(())
}

/// Load configuration from file or use defaults
fn load_configuration(args: &AppArgs) -> Config {
    let config_path = args
        .config_path
        .clone()
        .or_else(|| env::var("LAUNCHLINE_CONFIG").ok().map(PathBuf::from));

    let loaded = match &config_path {
        Some(path) => launchline::init_with_config(path),
        None => launchline::init(),
    };

    loaded.unwrap_or_else(|e| {
        eprintln!("{}", launchline::handle_startup_error(&e));
        eprintln!("Falling back to default configuration");
        Config::default()
    })
}

fn init_logging(args: &AppArgs, config: &Config) {
    let debug_env = env::var("LAUNCHLINE_DEBUG")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let log_level = if args.debug || debug_env {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };

    let env_filter = env::var("RUST_LOG").unwrap_or(log_level);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from(env_filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

async fn run(args: &AppArgs, config: &Config) -> Result<()> {
    match &args.action {
        Action::InitDb => {
            let catalog = launchline::open_catalog(config)?;
            println!(
                "Catalog ready at {} ({} commands)",
                config.catalog.path.display(),
                catalog.count()?
            );
        }
        Action::Register(folders) => {
            let catalog = launchline::open_catalog(config)?;
            register_all(&catalog, folders)?;
        }
        Action::Star { name, starred } => {
            let catalog = launchline::open_catalog(config)?;
            if !catalog.set_starred(name, *starred)? {
                anyhow::bail!("No command named '{}'", name);
            }
            println!("{} {}", if *starred { "Starred" } else { "Unstarred" }, name);
        }
        Action::Suggest(text) => {
            let dispatcher = launchline::build_dispatcher(config)?;
            for name in dispatcher.on_text_changed(text).await {
                println!("{}", name);
            }
        }
        Action::Interactive => {
            let dispatcher = launchline::build_dispatcher(config)?;
            interactive(dispatcher).await?;
        }
    }
    Ok(())
}

fn register_all(catalog: &SqliteCatalog, folders: &[PathBuf]) -> Result<()> {
    let mut failed = 0;
    for folder in folders {
        match register_plugin(catalog, folder) {
            Ok(plugin) => println!("registered {} ({})", plugin.name, plugin.mode.as_str()),
            Err(e) => {
                warn!("Skipping {}: {}", folder.display(), e);
                eprintln!("failed {}: {}", folder.display(), e);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{} of {} plugin(s) failed to register", failed, folders.len());
    }
    Ok(())
}

async fn interactive(mut dispatcher: Dispatcher) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt(&dispatcher);

    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end();

        if let Some(text) = line.strip_prefix('?') {
            for name in dispatcher.on_text_changed(text).await {
                println!("  {}", name);
            }
        } else if line == "!reset" {
            dispatcher.reset();
            println!("[reset]");
        } else if !line.is_empty() {
            let outcome = dispatcher.on_select(line).await;
            let switched = matches!(outcome.action(), UiAction::SwitchToChain(name) if !name.is_empty());
            show(&outcome);
            if switched {
                if let Some(first) = dispatcher.wait_background().await {
                    show(&first);
                }
            }
        }

        prompt(&dispatcher);
    }

    dispatcher.reset();
    Ok(())
}

fn prompt(dispatcher: &Dispatcher) {
    match dispatcher.active_chain() {
        Some(name) => println!("[{}] >", name),
        None if dispatcher.allow_restricted() => println!("(all) >"),
        None => println!(">"),
    }
}

/// Print an outcome the way a launcher window would react to it
fn show(outcome: &Outcome) {
    if let Some(err) = &outcome.diagnostic {
        println!("! {}", err);
    }
    match outcome.action() {
        UiAction::StayOnSameChain => {}
        UiAction::SwitchToChain(name) if name.is_empty() => println!("[chain released]"),
        UiAction::SwitchToChain(name) => println!("[running {}]", name),
        UiAction::Deactivate => println!("[chain stopped]"),
        UiAction::Close => println!("[done]"),
    }
}

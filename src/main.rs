use anyhow::Result;
use appmenu::catalog::{CatalogBuild, CatalogOptions, LoadOutcome, LoadRequest, MenuCatalog};
use appmenu::category::Row;
use appmenu::config::{load_config, Config};
use appmenu::executor::{self, LogDialog, ProcessSpawner};
use appmenu::search::SearchEngine;
use appmenu::shell::{CommandStatus, SearchPath};
use appmenu::sources::{custom::StaticMenuSource, desktop::DesktopMenuSource, MenuSource};
use calloop::EventLoop;
use clap::Parser;
use std::env;
use std::sync::{Arc, Mutex};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Text to search for; lists the menu when empty
    query: Vec<String>,

    /// Only list this category
    #[arg(short, long)]
    category: Option<String>,

    /// Launch the Nth search result (1-based)
    #[arg(short, long)]
    run: Option<usize>,

    /// Keep running and print the menu again whenever it changes
    #[arg(short, long)]
    watch: bool,

    /// Run a configured command (lock_screen, shut_down, menu_editor, ...)
    #[arg(long, value_name = "KEY")]
    command: Option<String>,
}

struct App {
    catalog: MenuCatalog,
    loaded: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // 1. Load Config
    let config = load_config()?;
    if let Some(key) = &args.command {
        run_command(&config, key);
        return Ok(());
    }
    let desktop = config
        .general
        .desktop
        .clone()
        .or_else(|| env::var("XDG_CURRENT_DESKTOP").ok())
        .filter(|desktop| !desktop.is_empty());

    // 2. Setup Event Loop & channels from the loader thread
    let mut event_loop: EventLoop<App> = EventLoop::try_new()?;
    let (tx_builds, rx_builds) = calloop::channel::channel::<CatalogBuild>();
    let (tx_changes, rx_changes) = calloop::channel::channel::<()>();
    let tx_builds = Mutex::new(tx_builds);
    let tx_changes = Mutex::new(tx_changes);

    // 3. Init Catalog
    let mut sources: Vec<Arc<dyn MenuSource>> = vec![Arc::new(DesktopMenuSource::from_xdg(
        &config.sources.application_dirs,
        config.sources.scan_system,
    ))];
    if !config.items.is_empty() {
        sources.push(Arc::new(StaticMenuSource::new(config.items.clone())));
    }

    let catalog = MenuCatalog::new(
        sources,
        CatalogOptions {
            desktop,
            nested_categories: config.general.nested_categories,
        },
        Arc::new(move |build| {
            if let Ok(tx) = tx_builds.lock() {
                let _ = tx.send(build);
            }
        }),
        Arc::new(move || {
            if let Ok(tx) = tx_changes.lock() {
                let _ = tx.send(());
            }
        }),
    );
    let mut app = App { catalog, loaded: false };

    // Build handler
    event_loop
        .handle()
        .insert_source(rx_builds, |event, _, app: &mut App| {
            if let calloop::channel::Event::Msg(build) = event {
                if app.catalog.finish_load(build) == LoadOutcome::Published {
                    app.loaded = true;
                }
            }
        })
        .map_err(|e| e.error)?;

    // Menu change handler
    event_loop
        .handle()
        .insert_source(rx_changes, |event, _, app: &mut App| {
            if let calloop::channel::Event::Msg(()) = event {
                app.catalog.invalidate();
                if app.catalog.request_load() == LoadRequest::Started {
                    log::info!("Menu changed, reloading");
                }
            }
        })
        .map_err(|e| e.error)?;

    // 4. Run Loop
    app.catalog.request_load();
    loop {
        event_loop.dispatch(None, &mut app)?;
        if !app.loaded {
            continue;
        }
        app.loaded = false;

        show(&app.catalog, &args, &config);
        if !args.watch {
            break;
        }
    }

    Ok(())
}

fn show(catalog: &MenuCatalog, args: &Args, config: &Config) {
    let query = args.query.join(" ");
    if query.trim().is_empty() {
        print_menu(catalog, args.category.as_deref(), config);
    } else {
        search(catalog, &query, args.run, config);
    }
}

fn print_menu(catalog: &MenuCatalog, only: Option<&str>, config: &Config) {
    for category in catalog.categories() {
        if only.is_some_and(|name| name != category.display_name()) {
            continue;
        }
        println!("{}", category.display_name());
        for row in category.rows() {
            match row {
                Row::Header { name, depth, .. } => println!("{}{}/", "  ".repeat(depth + 1), name),
                Row::Launcher { id, depth } => {
                    if let Some(launcher) = catalog.launcher(id) {
                        println!("{}{}", "  ".repeat(depth + 1), launcher.display_name());
                    }
                }
                Row::Separator => println!("  ---"),
            }
        }
    }

    if only.is_none() {
        println!("({} applications)", catalog.all_items().launcher_ids().len());
        let path = SearchPath::from_env();
        for (key, mut command) in config.commands.checks() {
            let state = if command.check(&path) { "" } else { " (unavailable)" };
            println!("[{}] {}: {}{}", key, command.label(), command.command(), state);
        }
    }
}

fn run_command(config: &Config, key: &str) {
    let Some((_, mut command)) = config
        .commands
        .checks()
        .into_iter()
        .find(|(name, _)| *name == key)
    else {
        eprintln!("no command named '{}'", key);
        return;
    };

    if !command.activate(&SearchPath::from_env(), &ProcessSpawner, &LogDialog) {
        if command.status() == CommandStatus::Invalid {
            eprintln!("{} is not available: '{}'", command.label(), command.command());
        }
    }
}

fn search(catalog: &MenuCatalog, query: &str, run: Option<usize>, config: &Config) {
    let mut engine = SearchEngine::new(config.search_actions(), Box::new(SearchPath::from_env()));
    engine.set_filter(query, catalog);

    for (i, (result, item)) in engine
        .results()
        .iter()
        .zip(engine.items(catalog))
        .enumerate()
    {
        println!("{:>3}. {}  [{:#x}]", i + 1, item.display_text(), result.rank);
    }

    let Some(n) = run else {
        return;
    };
    let Some(item) = n.checked_sub(1).and_then(|index| engine.nth(index, catalog)) else {
        eprintln!("no result {}", n);
        return;
    };
    let request = item.spawn_request(None, config.general.terminal.as_deref());
    executor::launch(request, item.display_command(), &ProcessSpawner, &LogDialog);
}

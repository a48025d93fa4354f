//! Poldash - a terminal dashboard for organizational policy records.
//!
//! Thin interactive shell over the library: a command loop that drives the
//! session state machine and the cached policy collection. All the actual
//! behavior lives in the library modules.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use poldash::api::ApiClient;
use poldash::app::{App, Screen};
use poldash::auth::SessionManager;
use poldash::cache::{CacheManager, DiskStore};
use poldash::config::Config;
use poldash::models::STATUS_OPTIONS;

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG to control the level (e.g. RUST_LOG=debug).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    info!("poldash starting");

    let mut config = Config::load()?;
    let client = ApiClient::new(&config.api_base_url())?;
    let session = Arc::new(SessionManager::new(client.clone()));
    let disk = DiskStore::new(config.cache_dir()?)?;
    let cache = Arc::new(CacheManager::new(client, session.clone(), disk));
    session.set_purge_target(cache.clone());

    let mut app = App::new(session, cache);
    app.bootstrap().await;

    println!("poldash - policy governance dashboard (type 'help' for commands)");
    print_screen(&app);

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let mut parts = line.trim().splitn(2, ' ');
        let command = parts.next().unwrap_or("");
        let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

        match command {
            "" => {}
            "help" => print_help(),
            "quit" | "exit" => break,
            "login" => {
                let username = match arg.map(str::to_string).or(config.last_username.clone()) {
                    Some(u) => u,
                    None => {
                        println!("usage: login <username>");
                        continue;
                    }
                };
                let password = rpassword::prompt_password(format!("password for {}: ", username))?;
                if app.login(&username, &password).await {
                    config.last_username = Some(username);
                    if let Err(err) = config.save() {
                        info!(error = %err, "could not save config");
                    }
                }
                print_screen(&app);
            }
            "logout" => {
                app.logout().await;
                print_screen(&app);
            }
            "refresh" | "list" => {
                if command == "refresh" || app.view.entry.is_none() {
                    app.refresh().await;
                }
                print_screen(&app);
            }
            "query" => {
                app.set_query(arg.map(str::to_string));
                app.refresh().await;
                print_screen(&app);
            }
            "search" => {
                app.search = arg.unwrap_or("").to_string();
                print_screen(&app);
            }
            "status" => match arg {
                Some(name) if STATUS_OPTIONS.contains(&name) => {
                    app.toggle_status(name);
                    print_screen(&app);
                }
                _ => println!("usage: status <{}>", STATUS_OPTIONS.join("|")),
            },
            "whoami" => {
                let state = app.session.current();
                match state.identity() {
                    Some(user) => println!("logged in as {}", user),
                    None => println!("not logged in ({:?})", state.status),
                }
            }
            other => println!("unknown command '{}', try 'help'", other),
        }
    }

    info!("poldash shutting down");
    Ok(())
}

fn print_help() {
    println!("commands:");
    println!("  login [username]    log in and load policies");
    println!("  logout              end the session and purge cached data");
    println!("  list                show policies (cached when fresh)");
    println!("  refresh             force a cache-respecting reload");
    println!("  query [text]        set/clear the server-side query");
    println!("  search [text]       set/clear the client-side text filter");
    println!("  status <name>       toggle a status filter ({})", STATUS_OPTIONS.join(", "));
    println!("  whoami              show session state");
    println!("  quit                exit");
}

fn print_screen(app: &App) {
    match app.screen {
        Screen::Login => {
            if let Some(err) = &app.session.current().last_error {
                println!("! {}", err);
            }
            println!("please 'login <username>' to view policies");
        }
        Screen::Policies => print_policies(app),
    }
}

fn print_policies(app: &App) {
    if let Some(err) = &app.view.error {
        println!("! failed to load policies: {}", err);
    }
    let Some(entry) = &app.view.entry else {
        if app.view.error.is_none() {
            println!("no policies loaded yet, try 'refresh'");
        }
        return;
    };

    let rows = app.filtered();
    println!(
        "{} of {} policies (updated {})",
        rows.len(),
        entry.data.len(),
        entry.age_display()
    );
    for (status, count) in app.status_counts() {
        if count > 0 {
            println!("  {:<10} {}", status, count);
        }
    }
    for policy in rows {
        println!(
            "  {:<12} {:<10} {}",
            policy.key(),
            policy.approval_status.as_deref().unwrap_or("-"),
            policy.display_name()
        );
    }
}

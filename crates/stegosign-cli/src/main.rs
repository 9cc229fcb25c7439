//! stegosign - an interactive shell for signing and verifying images.
//!
//! Holds one session for the lifetime of the process. Protected commands
//! pass the route guard first; expired credentials are renewed silently.

mod app;
mod shell;
mod vault;

use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stegosign_core::{ApiError, Config, SessionError, SessionEvent};

use app::{describe_api_error, user_message, App};

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes the log file and must outlive the shell.
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let prefix = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "stegosign.log".to_string());
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, prefix));
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn load_config() -> Result<Config> {
    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config, using defaults: {}", e);
            Config::default()
        }
    };
    config.apply_env();
    config.validate()?;
    Ok(config)
}

/// Log session transitions as they happen.
fn watch_session(app: &App) {
    let mut events = app.services().session.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::SignedIn) => info!("Session started"),
                Ok(SessionEvent::Renewed) => info!("Credential renewed"),
                Ok(SessionEvent::Ended) => info!("Session ended"),
                Err(RecvError::Lagged(missed)) => warn!(missed, "Missed session events"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

fn report(err: &anyhow::Error) {
    if let Some(session_err) = err.downcast_ref::<SessionError>() {
        println!("{}", user_message(session_err));
        if session_err.requires_sign_in() {
            println!("Run 'login' to sign in.");
        }
    } else if let Some(api_err) = err.downcast_ref::<ApiError>() {
        println!("{}", describe_api_error(api_err));
    } else {
        println!("Error: {:#}", err);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = load_config()?;
    let _log_guard = init_tracing(config.log_file.as_deref());
    info!(base_url = %config.api_base_url, "stegosign starting");

    let mut app = App::new(config)?;
    watch_session(&app);

    println!("stegosign shell. Type 'help' for commands.");
    let mut line = String::new();
    loop {
        print!("stegosign> ");
        io::stdout().flush()?;

        // Re-acquire stdin each time; command handlers prompt on it too
        line.clear();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let command = match shell::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(usage) => {
                println!("{}", usage);
                continue;
            }
        };

        match app.handle(command).await {
            Ok(true) => break,
            Ok(false) => {}
            Err(e) => {
                debug!(error = ?e, "Command failed");
                report(&e);
            }
        }
    }

    app.teardown();
    info!("stegosign shutting down");
    Ok(())
}

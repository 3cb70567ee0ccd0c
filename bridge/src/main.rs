//! lockbridge - Entry Point
//!
//! Keeps TTLock cloud locks in sync and exposes them over a local HTTP API.

use std::collections::HashMap;
use std::env;

use colored::Colorize;
use lockbridge::app::options::AppOptions;
use lockbridge::app::run::run;
use lockbridge::authn::login::login;
use lockbridge::errors::BridgeError;
use lockbridge::http::client::ApiClient;
use lockbridge::logs::{init_logging, LogOptions};
use lockbridge::storage::layout::StorageLayout;
use lockbridge::storage::settings::{load_settings, save_settings, Settings};
use lockbridge::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(text) => println!("{}", text),
            Err(_) => println!("{}", version.version),
        }
        return;
    }

    let layout = match cli_args.get("base-dir") {
        Some(dir) => StorageLayout::new(dir),
        None => StorageLayout::default(),
    };

    // Retrieve the settings file
    let settings_file = layout.settings_file();
    let mut settings = match load_settings(&settings_file).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file {}: {}", settings_file.path().display(), e);
            return;
        }
    };
    apply_overrides(&mut settings, &cli_args);

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        json_format: settings.log_json,
        log_dir: cli_args.contains_key("log-to-file").then(|| layout.logs_dir()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    if let Err(e) = settings.validate() {
        error!("{}", e);
        return;
    }

    // Exchange the account password for a refresh token and store it
    if cli_args.contains_key("login") {
        match run_login(&mut settings, &cli_args).await {
            Ok(()) => match save_settings(&settings_file, &settings).await {
                Ok(()) => println!(
                    "{} refresh token stored in {}",
                    "Login succeeded:".green().bold(),
                    settings_file.path().display()
                ),
                Err(e) => println!("{} {}", "Unable to save settings:".red().bold(), e),
            },
            Err(e) => println!("{} {}", "Login failed:".red().bold(), e),
        }
        return;
    }

    let options = AppOptions::from_settings(&settings, layout);
    info!(
        "Running lockbridge {} in {:?} mode against {}",
        version.version, options.refresh_mode, settings.cloud.server_url
    );

    if let Err(e) = run(settings, options, await_shutdown_signal()).await {
        error!("Failed to run lockbridge: {e}");
    }
}

fn apply_overrides(settings: &mut Settings, cli_args: &HashMap<String, String>) {
    if let Some(server) = cli_args.get("server") {
        settings.cloud.server_url = server.clone();
    }
    if let Some(client_id) = cli_args.get("client-id") {
        settings.cloud.client_id = client_id.clone();
    }
    if let Some(client_secret) = cli_args.get("client-secret") {
        settings.cloud.client_secret = client_secret.clone();
    }
    if let Some(username) = cli_args.get("username") {
        settings.cloud.username = username.clone();
    }
    if let Some(mode) = cli_args.get("refresh-mode") {
        match mode.parse() {
            Ok(mode) => settings.refresh_mode = mode,
            Err(e) => eprintln!("Ignoring --refresh-mode: {}", e),
        }
    }
    if let Some(level) = cli_args.get("log-level") {
        match level.parse() {
            Ok(level) => settings.log_level = level,
            Err(e) => eprintln!("Ignoring --log-level: {}", e),
        }
    }
}

async fn run_login(
    settings: &mut Settings,
    cli_args: &HashMap<String, String>,
) -> Result<(), BridgeError> {
    let password = cli_args
        .get("password")
        .cloned()
        .or_else(|| env::var("LOCKBRIDGE_PASSWORD").ok())
        .ok_or_else(|| {
            BridgeError::ConfigError("pass --password=<pw> or set LOCKBRIDGE_PASSWORD".to_string())
        })?;

    let client = ApiClient::new(settings.credentials())?;
    settings.refresh_token = login(&client, &password).await?;
    Ok(())
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("SIGTERM received, shutting down...");
                    }
                    _ = sigint.recv() => {
                        info!("SIGINT received, shutting down...");
                    }
                }
            }
            _ => {
                error!("Unable to install signal handlers, falling back to Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Ctrl+C received, shutting down...");
    }
}

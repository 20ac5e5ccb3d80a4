//! snapeda-importer: bridge between the Fusion 360 shim and SnapEDA imports
//!
//! The host-side shim starts this binary and talks JSON-RPC over its stdio.
//! Logs go to a file in the plugin directory, never to stdout.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use snapeda_importer::bridge::{BridgeOptions, BridgeServer};
use snapeda_importer::config;
use snapeda_importer::process;

/// Imports SnapEDA parts into a Fusion 360 electronics library.
///
/// Speaks newline-delimited JSON-RPC 2.0 on stdin/stdout with the host shim.
#[derive(Parser, Debug)]
#[command(name = "snapeda-importer")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Plugin directory holding the cache, log and client (overrides config)
    #[arg(long, value_name = "DIR")]
    plugin_dir: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,

    /// Log to stderr instead of the plugin log file
    #[arg(long)]
    log_stderr: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "info" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
///
/// The log file is truncated on every start. Falls back to stderr when it
/// cannot be created.
fn init_tracing(level: Level, log_file: Option<&Path>) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_file.map(|path| (path, File::create(path))) {
        Some((_, Ok(file))) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        Some((path, Err(e))) => {
            builder.with_writer(std::io::stderr).init();
            warn!(path = %path.display(), error = %e, "Cannot create log file, logging to stderr");
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
}

/// Picks the plugin directory: CLI, then config, then the executable's folder.
fn resolve_plugin_dir(cli: Option<PathBuf>, configured: Option<PathBuf>) -> PathBuf {
    cli.or(configured)
        .or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf))
        })
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Entry point for the snapeda-importer bridge.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let plugin_dir = resolve_plugin_dir(args.plugin_dir, cfg.plugin_dir.clone());

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    let log_file = plugin_dir.join(&cfg.logging.file);
    init_tracing(log_level, (!args.log_stderr).then_some(log_file.as_path()));

    // Display GPL license notice (required by GPLv3 Section 5d)
    eprintln!(
        "snapeda-importer {}  Copyright (C) 2026  The Embedded Society",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("This program comes with ABSOLUTELY NO WARRANTY.");
    eprintln!("This is free software, licensed under GPL-3.0-or-later.");
    eprintln!();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        plugin_dir = %plugin_dir.display(),
        "Starting snapeda-importer"
    );

    if cfg!(windows) {
        if let Err(e) = process::apply_pending_update(&plugin_dir) {
            warn!(error = %e, "Could not apply staged plugin update");
        }
    }

    let options = BridgeOptions {
        settings: cfg.import_settings(&plugin_dir),
        client_executable: cfg.client_executable(&plugin_dir),
        client_image_name: cfg.client.image_name.clone(),
        host_timeout: cfg.host.timeout(),
    };
    let mut server = BridgeServer::stdio(options);

    info!("Bridge ready, waiting for the host shim");

    // Run the server
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    let result = runtime.block_on(server.run());

    match result {
        Ok(()) => {
            info!("Bridge shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Bridge error");
            ExitCode::FAILURE
        }
    }
}

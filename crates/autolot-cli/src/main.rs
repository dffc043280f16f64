// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod handoff;
mod runtime;

use anyhow::{Context, Result, anyhow};
use autolot_app::{AppState, Inventory};
use autolot_db::SqliteStorage;
use config::Config;
use runtime::CliRuntime;
use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `autolot --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    init_logging()?;
    tracing::info!(
        config = %options.config_path.display(),
        db = %db_path.display(),
        demo = options.demo,
        "starting autolot"
    );

    let storage = SqliteStorage::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or AUTOLOT_DB_PATH",
            db_path.display()
        )
    })?;
    storage.bootstrap()?;

    let llm_client = if config.llm_enabled() {
        Some(
            autolot_llm::Client::new(
                config.llm_base_url(),
                config.llm_model(),
                config.llm_image_model(),
                config.llm_timeout()?,
            )
            .with_context(|| {
                format!(
                    "invalid [llm] config in {}; fix base_url/model/timeout values",
                    options.config_path.display()
                )
            })?
            .with_api_key(config.llm_api_key()),
        )
    } else {
        None
    };

    if options.check_only {
        if let Some(client) = &llm_client {
            client.ping()?;
        }
        tracing::info!("startup check passed");
        return Ok(());
    }

    let inventory = Inventory::load_with_messaging_default(storage, config.messaging_default()?);
    let mut runtime = CliRuntime::new(inventory, llm_client);
    let mut state = AppState::default();
    let result = autolot_tui::run_app(&mut state, &mut runtime);
    if let Err(error) = &result {
        tracing::warn!(error = %format!("{error:#}"), "terminal session ended with an error");
    }
    result
}

/// Logs go to a file in the data directory; the terminal belongs to the UI.
fn init_logging() -> Result<()> {
    let log_path = autolot_db::data_dir()?.join("autolot.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("open log file {}", log_path.display()))?;
    let filter = EnvFilter::try_from_env("AUTOLOT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => options.print_config_path = true,
            "--print-path" => options.print_db_path = true,
            "--print-example-config" => options.print_example = true,
            "--demo" => options.demo = true,
            "--check" => options.check_only = true,
            "--help" | "-h" => options.show_help = true,
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("autolot: dealership inventory and appointment booking");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Launch with the seed inventory (in-memory)");
    println!("  --check                  Validate config, database, and the generation server");
    println!("  --help                   Show this help");
}

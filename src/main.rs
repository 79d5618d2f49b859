//! pagelens - indexed page snapshots for browser agents.
//!
//! Main entry point for the pagelens CLI.

mod cli;

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use pagelens_browser::{BrowserContext, CdpBrowser};
use pagelens_config::{ConfigLoader, ConfigValidator, LoggingConfig};

use cli::{Cli, Commands};

/// Attributes shown next to each indexed element in text output.
const TEXT_ATTRIBUTES: &[&str] = &[
    "title", "type", "name", "role", "aria-label", "placeholder", "value", "alt", "href",
];

fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    // Optional file layer (daily rotation, text format without colors)
    let file_layer = match logging.directory {
        Some(ref directory) => {
            let log_dir = ConfigLoader::expand_path(directory);
            std::fs::create_dir_all(&log_dir)?;

            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("pagelens")
                .filename_suffix("log")
                .max_log_files(30)
                .build(&log_dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // Keep the writer alive for the program duration
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        // Console layer on stderr; stdout carries command output
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(true)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(&cli.config)?;
    init_tracing(&config.logging)?;

    for warning in ConfigValidator::validate(&config)?.warnings {
        warn!("{}: {}", warning.path, warning.message);
    }

    let browser = CdpBrowser::from_config(&config.browser);
    info!("Using browser at {}", browser.endpoint());

    let mut context = BrowserContext::new(
        Arc::new(browser),
        config.context.clone(),
        config.hashing.clone(),
    );

    let result = run(&mut context, cli.command).await;
    context.close().await;
    result
}

async fn run(
    context: &mut BrowserContext,
    command: Commands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::State { url, no_cache, text } => {
            if let Some(url) = url {
                context.navigate_to(&url).await?;
            }

            let state = context.get_state(!no_cache).await?;
            if text {
                println!(
                    "{}",
                    state.element_tree.clickable_elements_to_string(TEXT_ATTRIBUTES)
                );
            } else {
                println!("{}", serde_json::to_string_pretty(&state.without_screenshot())?);
            }
        }
        Commands::Tabs => {
            let tabs = context.get_tabs_info().await?;
            println!("{}", serde_json::to_string_pretty(&tabs)?);
        }
    }
    Ok(())
}

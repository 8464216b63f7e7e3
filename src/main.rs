//! herald - send one notification to many services.

use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use herald::cli::{Cli, LogFormat};
use herald::config::Config;
use herald::{Dispatcher, Registry, ReqwestTransport, Transport, register_metric_descriptions};

/// Initialize the tracing subscriber with the specified log format.
fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    match format {
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .flatten_event(true)
                .with_env_filter(filter)
                .init();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_format);
    register_metric_descriptions();

    let config = match cli.config_path() {
        Some(path) => {
            info!(config_path = %path.display(), "Loading configuration");
            match Config::load(&path) {
                Ok(c) => c,
                Err(e) => {
                    error!(error = %e, path = %path.display(), "Failed to load configuration");
                    std::process::exit(1);
                }
            }
        }
        None => Config::default(),
    };

    if let Err(errors) = config.validate() {
        for e in &errors {
            error!(error = %e, "Configuration validation error");
        }
        error!(error_count = errors.len(), "Configuration validation failed");
        std::process::exit(1);
    }

    let mut urls = match config.resolved_urls() {
        Ok(urls) => urls,
        Err(errors) => {
            for e in &errors {
                error!(error = %e, "Configuration validation error");
            }
            std::process::exit(1);
        }
    };
    urls.extend(cli.urls.iter().cloned());

    let transport: Arc<dyn Transport> = Arc::new(
        ReqwestTransport::new(config.defaults.timeout, &config.defaults.user_agent)
            .context("failed to build HTTP client")?,
    );
    let registry = Registry::new(transport)
        .with_throttle_interval(config.defaults.throttle)
        .with_include_image(config.asset.include_image);
    let mut dispatcher = Dispatcher::new(registry, Arc::new(config.asset.to_asset()));

    for url in &urls {
        dispatcher.add(url);
    }

    if cli.validate {
        println!("Configuration is valid");
        println!("  Identifiers: {} ({} usable)", urls.len(), dispatcher.len());
        return Ok(());
    }

    if dispatcher.is_empty() {
        error!("No usable service identifiers; pass URLs or configure `urls`");
        std::process::exit(1);
    }

    let body = match cli.body.clone() {
        Some(body) => body,
        None => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .context("failed to read body from stdin")?;
            body
        }
    };

    let notify_type = cli.notify_type();
    info!(
        notifiers = dispatcher.len(),
        notify_type = %notify_type,
        "herald sending"
    );

    if dispatcher.notify(&cli.title, body.trim_end(), notify_type) {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

mod cli;
mod commands;
mod error;
mod logging;
mod settings;

use clap::Parser;
use log::debug;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use pkgmux_backend::Context;
use pkgmux_core::Services;

use crate::cli::Cli;
use crate::error::AppError;
use crate::settings::AppSettings;

fn load_settings(cli: &Cli) -> Result<AppSettings, AppError> {
    match &cli.config {
        Some(path) => AppSettings::load_from(path),
        None => Ok(AppSettings::load()),
    }
}

async fn execute(cli: Cli, settings: &AppSettings) -> Result<String, AppError> {
    let registry = pkgmux_node::default_registry(
        &settings.disabled_managers,
        settings.probe_timeout(),
    );
    debug!("Registered managers: {:?}", registry.names());
    let services = Services::new(Arc::new(registry));

    let timeout = cli
        .timeout
        .map_or_else(|| settings.operation_timeout(), Duration::from_secs);
    let ctx = Context::with_timeout(timeout);

    let output = commands::run(&services, &ctx, settings, cli.command).await?;
    Ok(serde_json::to_string_pretty(&output)?)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init_logging(
        cli.debug || settings.debug_logging,
        settings.max_log_size_bytes,
    );

    match execute(cli, &settings).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            debug!("Command failed: {e:?}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

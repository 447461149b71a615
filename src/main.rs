use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands};
use crate::config::models::Settings;
use cups_client::models::JobQuery;
use log::{error, info};
use serde_derive::Serialize;
use snafu::{ResultExt, Whatever};
use web_server::gateway::Gateway;
use web_server::models::{JobPayload, PrinterPayload};

mod cli;
mod config;
mod cups_client;
mod history;
mod ipp_client;
mod web_server;

#[derive(Serialize)]
struct Dump {
    server: String,
    printers: Vec<PrinterPayload>,
    jobs: Vec<JobPayload>,
}

#[tokio::main]
async fn main() -> ExitCode {
    colog::init();
    let cli = Cli::parse();

    let settings = match crate::config::loading::load_config() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Could not load the configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let _sentry = init_sentry(&settings);

    let gateway = Arc::new(Gateway::from_settings(&settings));
    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => web_server::serve(gateway, &settings.http).await.whatever_context("HTTP server failed"),
        Commands::Dump => dump(&gateway).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", snafu::Report::from_error(e));
            ExitCode::FAILURE
        }
    }
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref().filter(|dsn| !dsn.trim().is_empty())?;
    info!("Reporting errors to Sentry");
    Some(sentry::init((
        dsn,
        sentry::ClientOptions { release: sentry::release_name!(), ..Default::default() },
    )))
}

async fn dump(gateway: &Gateway) -> Result<(), Whatever> {
    let printers = gateway.cups.printer_status().await.whatever_context("Could not fetch printer status")?;
    let jobs = gateway.cups.list_jobs(&JobQuery::all()).await.whatever_context("Could not list jobs")?;

    let dump = Dump {
        server: gateway.cups.server_url(),
        printers: printers.iter().map(PrinterPayload::from).collect(),
        jobs: jobs.iter().map(JobPayload::from).collect(),
    };
    let json = serde_json::to_string_pretty(&dump).whatever_context("Could not serialize the dump")?;
    println!("{}", json);
    Ok(())
}

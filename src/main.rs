use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use contrata::app::App;
use contrata::cli::Cli;
use contrata::config::ContrataConfig;
use contrata::ui::{self, Output};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let out = Output::new();
    let config = match ContrataConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            out.fatal(&e);
            return ExitCode::from(2);
        }
    };

    let app = match App::open(&config).await {
        Ok(app) => app,
        Err(e) => {
            out.fatal(&e);
            return ExitCode::from(2);
        }
    };

    let result = app.run(cli.command).await;

    if let Err(e) = app.shutdown().await {
        tracing::warn!(error = %e, "event spool not closed cleanly");
    }

    match result {
        Ok((title, outcome)) => match out.success(title, &outcome) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                out.fatal(&anyhow::Error::new(e).context("failed to render result"));
                ExitCode::from(2)
            }
        },
        Err(e) => {
            out.failure(&e);
            ExitCode::from(ui::exit_code(&e))
        }
    }
}

// Logs go to stderr; stdout carries only JSON results.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

//! `kav`: Kubernetes access viewer

mod app;
mod cli;
mod handlers;

use clap::Parser;
use kav::{IntoResponse, State, TracingConfig};

use crate::app::AppState;
use crate::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let tracing = TracingConfig::default()
        .with_verbosity(cli.verbose)
        .with_format(cli.log_format);
    if let Err(e) = kav::init_subscriber_with_config(tracing) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let response = match AppState::load(&cli) {
        Ok(app) => cli.command.execute(State::new(app)).await,
        Err(e) => e.into_response(),
    };

    response.emit();
    std::process::exit(response.exit_code);
}

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "formbind=info,formbind_forms=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let app = match commands::load_config(cli.config.as_deref()) {
        Ok(app) => app,
        Err(error) => {
            eprintln!("error: {error:#}");
            std::process::exit(2);
        }
    };
    tracing::debug!(forms = app.forms.len(), base_url = %app.api.base_url, "Configuration loaded");

    let result = match &cli.command {
        Command::Forms => {
            commands::run_forms(&app);
            Ok(true)
        }
        Command::Validate(args) => commands::run_validate(&app, args),
        Command::Submit(args) => commands::run_submit(app, args).await,
    };

    let exit_code = match result {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(error) => {
            eprintln!("error: {error:#}");
            2
        }
    };
    std::process::exit(exit_code);
}

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{advisory, AnalysisController, HttpPredictionService, SelectedFile};
use tracing::info;

mod config;
mod render;

#[derive(Parser, Debug)]
#[command(about = "Submit a leaf photo for disease classification")]
struct Cli {
    /// Prediction service base URL (overrides config and environment).
    #[arg(long, global = true)]
    server_url: Option<String>,
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one JPEG or PNG image (max 5 MiB).
    Analyze {
        path: PathBuf,
        /// Print the normalized diagnosis as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Check that the prediction service is up.
    Ping,
    /// List the labels with predefined advice.
    Labels,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut settings = config::load_settings(cli.config.as_deref());
    if let Some(server_url) = cli.server_url {
        settings.service_url = server_url;
    }

    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .with_writer(std::io::stderr)
        .init();
    settings.validate()?;

    match cli.command {
        Command::Analyze { path, json } => analyze(&settings, path, json).await,
        Command::Ping => {
            let service = HttpPredictionService::new(&settings.service_url)
                .context("failed to build prediction service client")?;
            let ping = service
                .ping()
                .await
                .with_context(|| format!("ping {} failed", settings.service_url))?;
            println!("{}: {}", ping.status, ping.message);
            Ok(ExitCode::SUCCESS)
        }
        Command::Labels => {
            for label in advisory::known_labels() {
                println!("{label}: {}", advisory::advisory_for(label).advice);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn analyze(settings: &config::Settings, path: PathBuf, json: bool) -> Result<ExitCode> {
    let file = SelectedFile::from_path(&path)
        .await
        .with_context(|| format!("cannot use '{}' for analysis", path.display()))?;

    let service = HttpPredictionService::new(&settings.service_url)
        .context("failed to build prediction service client")?;
    info!(service_url = %service.base_url(), "using prediction service");

    let mut controller = AnalysisController::new(Arc::new(service));
    controller.select_file(file);
    let state = controller.analyze().await;

    if let Some(result) = state.diagnosis() {
        if json {
            println!("{}", serde_json::to_string_pretty(result)?);
        } else {
            print!("{}", render::render_diagnosis(state.file(), result));
        }
        return Ok(ExitCode::SUCCESS);
    }

    match state.error() {
        Some(error) if json => println!("{}", serde_json::to_string_pretty(error)?),
        Some(error) => eprintln!("{}", render::render_error(error)),
        None => eprintln!("analysis ended in state '{}'", state.phase()),
    }
    Ok(ExitCode::FAILURE)
}

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use chase_winprob::api::{self, AppState};
use chase_winprob::config::{Command, Config};
use chase_winprob::engine::{LogisticModel, Predictor, WinClassifier};
use chase_winprob::models::MatchInput;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    config.validate()?;

    // Load the classifier once; every request shares it read-only.
    let model = LogisticModel::load(&config.model_path)
        .with_context(|| format!("loading model from {}", config.model_path))?;
    info!(
        "Model loaded: {} ({}) from {}",
        model.name(),
        model.version.as_deref().unwrap_or("unversioned"),
        config.model_path
    );
    let classifier: Arc<dyn WinClassifier> = Arc::new(model);
    let predictor = Predictor::new(classifier);

    match config.command() {
        Command::Predict(args) => {
            let input: MatchInput = args.into();
            let prediction = predictor.predict(&input)?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }
        Command::Serve => {
            let app = api::router(AppState { predictor });
            let addr = config.listen_addr()?;
            info!("Prediction API listening on http://{}", addr);
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            info!("Prediction API stopped");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
}

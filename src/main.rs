mod config;
mod error;
mod routes;
mod state;
mod translate;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use state::AppState;
use translate::TranslatorFactory;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("indic_mt=debug,tower_http=debug")),
        )
        .init();

    let (config, loaded_from) = Config::load()?;
    match loaded_from {
        Some(path) => info!("Loaded configuration from: {}", path.display()),
        None => info!("No configuration file found, using defaults and environment"),
    }

    // The model must be usable before the listener binds.
    let translator = TranslatorFactory::create_translator(&config.model)?;
    info!("Model {} ready", translator.model_id());

    let app = routes::app(AppState::new(translator));

    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("Starting server on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

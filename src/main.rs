//! Contract Assistant - question answering, risk analysis and paraphrasing
//! over uploaded legal documents, backed by a hosted generative model.

mod catalog;
mod config;
mod error;
mod extract;
mod gemini;
mod normalize;
mod pipeline;
mod prompt;
mod routes;
mod sentiment;
mod upload;

use config::Settings;
use gemini::{GeminiClient, LanguageModel};
use routes::AppState;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use upload::UploadLimits;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "contract_assistant=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    settings.log_summary();

    let model = GeminiClient::from_settings(&settings.model)
        .map(|client| Arc::new(client) as Arc<dyn LanguageModel>);
    if let Some(model) = &model {
        info!("Gemini client initialized ({})", model.name());
    }

    let state = AppState {
        model,
        uploads: UploadLimits::new(settings.upload_dir.clone()),
        data_dir: settings.data_dir.clone(),
    };

    let app = routes::router(state, settings.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(settings.bind_addr).await?;
    info!("Server listening on http://{}", settings.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

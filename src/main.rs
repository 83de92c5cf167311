//! Heritage Assistant
//!
//! A file assistant with two halves: `serve` runs the chat endpoint that
//! answers file commands and free-form questions, and `chat` runs a terminal
//! client that keeps a transcript of the conversation with that endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod conversation;
mod core;
mod providers;
mod routes;
mod terminal;
mod workspace;

use config::Config;
use conversation::TranscriptStore;
use crate::core::{CommandRouter, ExchangeController};
use providers::{HttpAssistant, Provider};
use workspace::FileWorkspace;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub commands: Arc<CommandRouter>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "heritage_assistant=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;

    match std::env::args().nth(1).as_deref() {
        None | Some("serve") => serve(config).await,
        Some("chat") => chat(config).await,
        Some(other) => anyhow::bail!("Unknown mode '{}'; expected 'serve' or 'chat'", other),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let workspace = Arc::new(FileWorkspace::new(
        config.workspace_dir.clone(),
        config.max_file_size,
    ));
    tokio::fs::create_dir_all(workspace.root()).await?;
    tracing::info!("📁 Serving files from {}", workspace.root().display());

    let model = Provider::from_name(&config.llm_provider, &config)?;
    tracing::info!("🤖 Model provider: {}", config.llm_provider);
    let state = AppState {
        commands: Arc::new(CommandRouter::new(workspace, model)),
    };

    let app = Router::new()
        .merge(routes::router())
        .layer(cors_layer(&config)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("🔥 Assistant API running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn chat(config: Config) -> anyhow::Result<()> {
    let remote = HttpAssistant::new(&config.assistant_url, config.request_timeout())?;
    tracing::info!("💬 Sending messages to {}", remote.endpoint());

    let controller = ExchangeController::new(Arc::new(TranscriptStore::new()), Arc::new(remote));
    terminal::run(controller).await
}

fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    match &config.cors_origin {
        Some(origin) => Ok(CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any)),
        None => Ok(CorsLayer::permissive()),
    }
}

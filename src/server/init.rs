//! Server initialization and run loop

use super::config::AppConfig;
use crate::api::{self, AppState};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use wayfarer_core::{AgentEngine, Concierge};
use wayfarer_llm::{GeminiConfig, GeminiProvider, LlmProvider};
use wayfarer_tools::{register_builtins, ToolRegistry, TravelSettings};

/// Assemble the Gemini-backed concierge from configuration and environment
pub fn build_concierge(config: &AppConfig) -> Result<Arc<Concierge>> {
    let gemini = GeminiConfig::from_env()
        .context("Gemini is not configured, set GEMINI_API_KEY or GOOGLE_API_KEY")?;
    let provider: Arc<dyn LlmProvider> =
        Arc::new(GeminiProvider::new(gemini).context("Failed to create Gemini provider")?);
    info!(
        provider = provider.name(),
        model = provider.resolve_model(&config.llm.model),
        "LLM provider ready"
    );

    let mut registry = ToolRegistry::new();
    register_builtins(&mut registry, &TravelSettings::from_env())
        .context("Failed to register travel tools")?;
    info!(tools = registry.len(), "Travel tools registered");

    let engine = Arc::new(AgentEngine::new(
        provider,
        &registry,
        config.agent_engine_config(),
    ));
    let concierge = Concierge::from_engine(engine, config.concierge_config())
        .context("Invalid concierge configuration")?;
    Ok(Arc::new(concierge))
}

/// Run the server
pub async fn run(config: AppConfig) -> Result<()> {
    let concierge = build_concierge(&config)?;
    let state = AppState::new(concierge, &config.server.app_name);

    let app = api::router(state).layer(TraceLayer::new_for_http());
    let app = if config.server.cors_permissive {
        app.layer(CorsLayer::permissive())
    } else {
        app
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Wayfarer shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}

// prompt-gateway-rs/src/main.rs
// Prompt Gateway - HTTP entry point
// Default port 5000 (PORT or PROMPT_GATEWAY_SERVICE_PORT override)
//
// Implements:
// - POST /generate: idea + platform -> template -> hosted LLM -> expanded prompt
// - Permissive CORS for browser clients
// - Request validation and payload size limits

use std::sync::Arc;

use config_rs::{ServiceConfig, DEFAULT_PORT};
use prompt_gateway::inference_client::{InferenceClient, InferenceConfig};
use prompt_gateway::logging::{init_logging, LoggingConfig};
use prompt_gateway::{create_router, AppState, SERVICE_NAME};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env before reading LOG_LEVEL, report the outcome once logging is up
    let dotenv = config_rs::load_dotenv();

    init_logging(LoggingConfig::from_env(SERVICE_NAME))?;

    match dotenv {
        Ok(Some(path)) => tracing::debug!("Loaded environment from {}", path.display()),
        Ok(None) => {}
        Err(err) => tracing::warn!("{}", err),
    }

    let inference_config = InferenceConfig::from_env().map_err(|err| {
        tracing::error!("Cannot start without an inference credential: {}", err);
        err
    })?;

    tracing::info!(
        api_url = %inference_config.api_url,
        model = %inference_config.model,
        timeout = ?inference_config.request_timeout,
        max_attempts = inference_config.retry.max_attempts,
        "Inference client configured"
    );

    let client = InferenceClient::new(inference_config)?;
    let state = AppState::new(Arc::new(client));

    let service_config = ServiceConfig::new(SERVICE_NAME);
    let port = service_config.get_service_port(DEFAULT_PORT);
    let addr = service_config.get_bind_address(port);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Prompt Gateway starting on {}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Prompt Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

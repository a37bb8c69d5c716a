//! pod-image-swap-webhook - rewrites Pod container images on admission.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Loads and validates the rule document (fatal on error)
//! - Starts the health server and the TLS webhook server

use std::sync::Arc;

use tokio::signal;
use tracing::{error, info, info_span};

use pod_image_swap_webhook::health::{HealthState, run_health_server};
use pod_image_swap_webhook::{Config, PodImageMutator, Settings, WebhookState, run_webhook_server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pod_image_swap_webhook=info".parse()?),
        )
        .json()
        .init();

    info!("Starting pod-image-swap-webhook");

    let settings = Settings::from_env()?;

    let config = Config::load(&settings.config_path).inspect_err(|e| {
        error!(path = %settings.config_path.display(), error = %e, "Failed to load webhook config");
    })?;
    info!(
        path = %settings.config_path.display(),
        exclude = config.exclusions().len(),
        replace = config.replacements().len(),
        "Loaded config"
    );

    let health_state = Arc::new(HealthState::new());
    let mutator = PodImageMutator::new(Arc::new(config), info_span!("mutator"));
    let webhook_state = Arc::new(WebhookState::new(mutator, health_state.clone()));

    // Probes should answer even before the webhook is serving
    let health_handle = {
        let health_state = health_state.clone();
        let port = settings.health_port;
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state, port).await {
                error!("Health server error: {}", e);
            }
        })
    };

    let webhook_handle = {
        let cert_path = settings.cert_path();
        let key_path = settings.key_path();
        let port = settings.webhook_port;
        tokio::spawn(
            async move { run_webhook_server(webhook_state, &cert_path, &key_path, port).await },
        )
    };

    tokio::select! {
        result = webhook_handle => {
            health_state.set_ready(false).await;
            if let Err(e) = result? {
                error!("Webhook server error: {}", e);
                return Err(e.into());
            }
        }
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task panicked: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, shutting down");
        }
    }

    health_state.set_ready(false).await;
    info!("Webhook stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Signal handler setup failures are fatal.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

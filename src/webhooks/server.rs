//! Admission webhook server.
//!
//! Provides the HTTPS endpoint Kubernetes calls for Pod admission.
//!
//! To enable the webhook:
//! 1. Deploy cert-manager (or any issuer) for TLS certificates
//! 2. Create a MutatingWebhookConfiguration pointing at `/mutate-v1-pod`
//! 3. Mount the TLS certificate secret into the pod at `PISW_CERT_DIR`

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use axum_server::tls_rustls::RustlsConfig;
use k8s_openapi::api::core::v1::Pod;
use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::health::{AdmissionOutcome, HealthState};
use crate::mutation::{MutationSummary, PodImageMutator};

/// Path the Pod mutation handler is served on
pub const MUTATE_POD_PATH: &str = "/mutate-v1-pod";

/// Shared state for webhook handlers
pub struct WebhookState {
    pub mutator: PodImageMutator,
    pub health: Arc<HealthState>,
}

impl WebhookState {
    pub fn new(mutator: PodImageMutator, health: Arc<HealthState>) -> Self {
        Self { mutator, health }
    }
}

/// Errors that can occur when running the webhook server
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("TLS configuration error: {0}")]
    TlsConfig(#[source] std::io::Error),

    #[error("Webhook server error: {0}")]
    Server(#[source] std::io::Error),
}

/// Create a denial response with reason embedded in message.
/// kube-rs deny() only sets status.message, so we format as "[reason] message"
fn deny_with_reason(
    request: &AdmissionRequest<Pod>,
    message: &str,
    reason: &str,
) -> AdmissionReview<DynamicObject> {
    let full_message = format!("[{}] {}", reason, message);
    AdmissionResponse::from(request)
        .deny(full_message)
        .into_review()
}

/// Compute the JSON Patch turning `original` into `mutated`.
pub fn pod_patch(original: &Pod, mutated: &Pod) -> Result<json_patch::Patch, serde_json::Error> {
    let original = serde_json::to_value(original)?;
    let mutated = serde_json::to_value(mutated)?;
    Ok(json_patch::diff(&original, &mutated))
}

/// Create the webhook router
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(MUTATE_POD_PATH, post(mutate_pod))
        .with_state(state)
}

async fn mutate_pod(
    State(state): State<Arc<WebhookState>>,
    Json(review): Json<AdmissionReview<Pod>>,
) -> impl IntoResponse {
    let started = Instant::now();
    let (status, outcome, summary, review) = admit(&state.mutator, review);
    state
        .health
        .metrics
        .record_admission(outcome, summary, started.elapsed().as_secs_f64());
    (status, Json(review))
}

type Admission = (
    StatusCode,
    AdmissionOutcome,
    MutationSummary,
    AdmissionReview<DynamicObject>,
);

fn admit(mutator: &PodImageMutator, review: AdmissionReview<Pod>) -> Admission {
    let request: AdmissionRequest<Pod> = match review.try_into() {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Failed to extract admission request");
            return (
                StatusCode::BAD_REQUEST,
                AdmissionOutcome::Invalid,
                MutationSummary::default(),
                AdmissionResponse::invalid(format!("Invalid AdmissionReview: {}", e)).into_review(),
            );
        }
    };

    let uid = &request.uid;
    debug!(
        uid = %uid,
        operation = ?request.operation,
        namespace = ?request.namespace,
        name = %request.name,
        "Processing admission request"
    );

    if request.operation == Operation::Delete {
        return (
            StatusCode::OK,
            AdmissionOutcome::Unchanged,
            MutationSummary::default(),
            AdmissionResponse::from(&request).into_review(),
        );
    }

    let Some(pod) = request.object.as_ref() else {
        warn!(uid = %uid, "Missing object in request");
        return (
            StatusCode::OK,
            AdmissionOutcome::Invalid,
            MutationSummary::default(),
            deny_with_reason(&request, "Missing object in request", "InvalidRequest"),
        );
    };

    let (mutated, summary) = mutator.mutate_pod_with_summary(pod);
    if !summary.changed() {
        debug!(uid = %uid, excluded = summary.excluded, "No container images to patch");
        return (
            StatusCode::OK,
            AdmissionOutcome::Unchanged,
            summary,
            AdmissionResponse::from(&request).into_review(),
        );
    }

    let response = pod_patch(pod, &mutated)
        .map_err(|e| e.to_string())
        .and_then(|patch| {
            AdmissionResponse::from(&request)
                .with_patch(patch)
                .map_err(|e| e.to_string())
        });

    match response {
        Ok(response) => {
            info!(
                uid = %uid,
                rewritten = summary.rewritten,
                excluded = summary.excluded,
                "Admission request patched"
            );
            (
                StatusCode::OK,
                AdmissionOutcome::Patched,
                summary,
                response.into_review(),
            )
        }
        Err(e) => {
            error!(uid = %uid, error = %e, "Failed to build patch");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                AdmissionOutcome::Invalid,
                summary,
                AdmissionResponse::invalid(format!("Failed to build patch: {}", e)).into_review(),
            )
        }
    }
}

/// Run the webhook server with TLS on `0.0.0.0:<port>`.
///
/// The readiness flag is set once the certificates are loaded.
pub async fn run_webhook_server(
    state: Arc<WebhookState>,
    cert_path: &Path,
    key_path: &Path,
    port: u16,
) -> Result<(), WebhookError> {
    let health = state.health.clone();
    let app = create_webhook_router(state);

    let config = RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(WebhookError::TlsConfig)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, path = MUTATE_POD_PATH, "Webhook server listening with TLS");
    health.set_ready(true).await;

    axum_server::bind_rustls(addr, config)
        .serve(app.into_make_service())
        .await
        .map_err(WebhookError::Server)?;

    Ok(())
}

//! Health server for Kubernetes probes and Prometheus metrics.
//!
//! Provides:
//! - `/healthz` - Liveness probe (always returns 200 if server is running)
//! - `/readyz` - Readiness probe (returns 200 once the webhook is serving)
//! - `/metrics` - Prometheus metrics endpoint

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabel, EncodeLabelSet, LabelSetEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use tokio::sync::RwLock;
use tracing::info;

use crate::mutation::MutationSummary;

/// Outcome of a single admission request
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// At least one image was rewritten
    Patched,
    /// Allowed without a patch
    Unchanged,
    /// The request could not be processed
    Invalid,
}

impl AdmissionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionOutcome::Patched => "patched",
            AdmissionOutcome::Unchanged => "unchanged",
            AdmissionOutcome::Invalid => "invalid",
        }
    }
}

/// Labels for admission request metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct OutcomeLabels {
    pub result: AdmissionOutcome,
}

impl EncodeLabelSet for OutcomeLabels {
    fn encode(&self, encoder: &mut LabelSetEncoder<'_>) -> Result<(), std::fmt::Error> {
        ("result", self.result.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Shared metrics for the webhook
pub struct Metrics {
    /// Admission requests by outcome
    pub admission_requests_total: Family<OutcomeLabels, Counter>,
    /// Container images rewritten by a replacement rule
    pub images_rewritten_total: Counter,
    /// Container images skipped because of an exclusion rule
    pub images_excluded_total: Counter,
    /// Admission handling duration
    pub admission_duration_seconds: Histogram,
    registry: Registry,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance with registered metrics
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let admission_requests_total = Family::<OutcomeLabels, Counter>::default();
        registry.register(
            "pisw_admission_requests",
            "Total number of admission requests",
            admission_requests_total.clone(),
        );

        let images_rewritten_total = Counter::default();
        registry.register(
            "pisw_images_rewritten",
            "Total number of container images rewritten",
            images_rewritten_total.clone(),
        );

        let images_excluded_total = Counter::default();
        registry.register(
            "pisw_images_excluded",
            "Total number of container images matched by an exclusion rule",
            images_excluded_total.clone(),
        );

        let admission_duration_seconds = Histogram::new(exponential_buckets(0.0001, 2.0, 15));
        registry.register(
            "pisw_admission_duration_seconds",
            "Duration of admission request handling in seconds",
            admission_duration_seconds.clone(),
        );

        Self {
            admission_requests_total,
            images_rewritten_total,
            images_excluded_total,
            admission_duration_seconds,
            registry,
        }
    }

    /// Record a handled admission request
    pub fn record_admission(
        &self,
        outcome: AdmissionOutcome,
        summary: MutationSummary,
        duration_secs: f64,
    ) {
        self.admission_requests_total
            .get_or_create(&OutcomeLabels { result: outcome })
            .inc();
        self.images_rewritten_total.inc_by(summary.rewritten);
        self.images_excluded_total.inc_by(summary.excluded);
        self.admission_duration_seconds.observe(duration_secs);
    }

    /// Encode metrics to Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if encode(&mut buffer, &self.registry).is_err() {
            tracing::error!("Failed to encode metrics");
            return "# Error encoding metrics".to_string();
        }
        buffer
    }
}

/// Shared state for the health server
pub struct HealthState {
    /// Whether the webhook server is serving
    ready: RwLock<bool>,
    /// Metrics registry
    pub metrics: Metrics,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    /// Create a new health state (starts as not ready)
    pub fn new() -> Self {
        Self {
            ready: RwLock::new(false),
            metrics: Metrics::new(),
        }
    }

    /// Mark the webhook as ready or not ready
    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Check if the webhook is ready
    pub async fn is_ready(&self) -> bool {
        *self.ready.read().await
    }
}

/// Liveness probe handler
async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness probe handler
///
/// Returns 503 Service Unavailable until the webhook server is up.
async fn readyz(State(state): State<Arc<HealthState>>) -> Response {
    if state.is_ready().await {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
    }
}

async fn metrics_handler(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let body = state.metrics.encode();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

/// Create the health server router
pub fn create_router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Run the health server on `0.0.0.0:<port>`.
pub async fn run_health_server(state: Arc<HealthState>, port: u16) -> Result<(), std::io::Error> {
    let app = create_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "Starting health server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

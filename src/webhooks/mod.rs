//! Mutating admission webhook for Pods.
//!
//! Decodes `AdmissionReview<Pod>` requests, rewrites container images with
//! the configured rules and answers with a JSON Patch.

mod server;

pub use server::{
    MUTATE_POD_PATH, WebhookError, WebhookState, create_webhook_router, pod_patch,
    run_webhook_server,
};

// Re-export kube-rs admission types for contract testing
pub use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};

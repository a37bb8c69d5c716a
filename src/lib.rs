//! pod-image-swap-webhook library crate
//!
//! Rewrites container images of admitted Pods according to exclusion and
//! replacement rules, typically to route pulls through a registry mirror.
//!
//! - [`config`]: rule document, patterns and rule evaluation
//! - [`image`]: image reference normalization
//! - [`mutation`]: Pod container rewriting
//! - [`webhooks`]: admission HTTP handler and TLS server
//! - [`health`]: probes and Prometheus metrics

pub mod config;
pub mod health;
pub mod image;
pub mod mutation;
pub mod settings;
pub mod webhooks;

pub use config::{Config, ConfigError, Decision, Pattern};
pub use health::HealthState;
pub use mutation::{MutationSummary, PodImageMutator};
pub use settings::Settings;
pub use webhooks::{WebhookError, WebhookState, run_webhook_server};

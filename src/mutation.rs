//! Pod image mutation.
//!
//! Applies the rule set to every container image of a Pod. The input Pod is
//! never modified; a new Pod with rebuilt container lists is returned so the
//! caller can diff the two.

use std::sync::Arc;

use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use tracing::{Span, debug, info};

use crate::config::{Config, Decision};

/// Per-Pod counts of what the rules did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationSummary {
    /// Images rewritten by a replacement rule
    pub rewritten: u64,
    /// Images vetoed by an exclusion rule
    pub excluded: u64,
}

impl MutationSummary {
    fn record(&mut self, decision: &Decision) {
        match decision {
            Decision::Replaced { .. } => self.rewritten += 1,
            Decision::Excluded { .. } => self.excluded += 1,
            Decision::Unchanged => {}
        }
    }

    /// True when at least one image was rewritten.
    pub fn changed(&self) -> bool {
        self.rewritten > 0
    }
}

/// Rewrites Pod container images according to a shared rule set.
#[derive(Debug, Clone)]
pub struct PodImageMutator {
    config: Arc<Config>,
    span: Span,
}

impl PodImageMutator {
    /// Create a mutator. Log events are emitted inside `span`.
    pub fn new(config: Arc<Config>, span: Span) -> Self {
        Self { config, span }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Return a copy of `pod` with rewritten init container and container images.
    pub fn mutate_pod(&self, pod: &Pod) -> Pod {
        self.mutate_pod_with_summary(pod).0
    }

    /// Like [`PodImageMutator::mutate_pod`], also returning what happened.
    pub fn mutate_pod_with_summary(&self, pod: &Pod) -> (Pod, MutationSummary) {
        let _entered = self.span.enter();
        debug!(
            namespace = ?pod.metadata.namespace,
            name = ?pod.metadata.name,
            generate_name = ?pod.metadata.generate_name,
            "Patching pod"
        );

        let mut summary = MutationSummary::default();
        let spec = pod.spec.as_ref().map(|spec| PodSpec {
            init_containers: spec
                .init_containers
                .as_deref()
                .map(|containers| self.rewrite_containers(containers, &mut summary)),
            containers: self.rewrite_containers(&spec.containers, &mut summary),
            ..spec.clone()
        });

        let mutated = Pod {
            metadata: pod.metadata.clone(),
            spec,
            status: pod.status.clone(),
        };
        (mutated, summary)
    }

    /// Return new containers with rewritten images, in the same order.
    pub fn mutate_containers(&self, containers: &[Container]) -> Vec<Container> {
        let _entered = self.span.enter();
        self.rewrite_containers(containers, &mut MutationSummary::default())
    }

    fn rewrite_containers(
        &self,
        containers: &[Container],
        summary: &mut MutationSummary,
    ) -> Vec<Container> {
        containers
            .iter()
            .map(|container| self.rewrite_container(container, summary))
            .collect()
    }

    fn rewrite_container(&self, container: &Container, summary: &mut MutationSummary) -> Container {
        let Some(image) = container.image.as_deref() else {
            return container.clone();
        };

        let config = self.config();
        let decision = config.decide(image);
        summary.record(&decision);

        let image = match decision {
            Decision::Excluded { rule } => {
                let pattern = config.exclusions().get(rule).map(|r| r.pattern.as_str());
                info!(
                    container = %container.name,
                    image = %image,
                    rule,
                    pattern = pattern.unwrap_or_default(),
                    "Image excluded from replacement via config, not patching"
                );
                image.to_string()
            }
            Decision::Replaced {
                rule,
                image: replaced,
            } => {
                let pattern = config.replacements().get(rule).map(|r| r.pattern.as_str());
                info!(
                    container = %container.name,
                    from = %image,
                    to = %replaced,
                    rule,
                    pattern = pattern.unwrap_or_default(),
                    "Patching container image"
                );
                replaced
            }
            Decision::Unchanged => image.to_string(),
        };

        Container {
            image: Some(image),
            ..container.clone()
        }
    }
}

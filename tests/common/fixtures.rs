//! Test fixtures and builder patterns for Pods.

use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Builder for creating Pod test fixtures.
///
/// # Example
/// ```
/// let pod = PodBuilder::new("test-pod")
///     .namespace("test-ns")
///     .init_container("init", "busybox:latest")
///     .container("app", "nginx:latest")
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct PodBuilder {
    name: String,
    namespace: Option<String>,
    labels: BTreeMap<String, String>,
    init_containers: Vec<Container>,
    containers: Vec<Container>,
}

impl PodBuilder {
    /// Create a new builder with the given Pod name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            labels: BTreeMap::new(),
            init_containers: Vec::new(),
            containers: Vec::new(),
        }
    }

    /// Set the namespace for the Pod.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Add a label to the Pod.
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Append an init container.
    pub fn init_container(mut self, name: &str, image: &str) -> Self {
        self.init_containers.push(container(name, image));
        self
    }

    /// Append a container.
    pub fn container(mut self, name: &str, image: &str) -> Self {
        self.containers.push(container(name, image));
        self
    }

    /// Append a fully specified container.
    pub fn with_container(mut self, container: Container) -> Self {
        self.containers.push(container);
        self
    }

    /// Build the Pod.
    pub fn build(self) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(self.name),
                namespace: self.namespace,
                labels: if self.labels.is_empty() {
                    None
                } else {
                    Some(self.labels)
                },
                ..Default::default()
            },
            spec: Some(PodSpec {
                init_containers: if self.init_containers.is_empty() {
                    None
                } else {
                    Some(self.init_containers)
                },
                containers: self.containers,
                ..Default::default()
            }),
            status: None,
        }
    }
}

impl Default for PodBuilder {
    fn default() -> Self {
        Self::new("test-pod")
    }
}

/// Create a container with only a name and an image.
pub fn container(name: &str, image: &str) -> Container {
    Container {
        name: name.to_string(),
        image: Some(image.to_string()),
        ..Default::default()
    }
}

/// Images of the init containers followed by the containers.
pub fn images(pod: &Pod) -> Vec<String> {
    let Some(spec) = pod.spec.as_ref() else {
        return Vec::new();
    };
    spec.init_containers
        .iter()
        .flatten()
        .chain(spec.containers.iter())
        .filter_map(|c| c.image.clone())
        .collect()
}

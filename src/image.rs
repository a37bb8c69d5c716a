//! Image reference normalization.
//!
//! Docker Hub references may omit the registry host and the `library`
//! namespace. Rules are matched against the fully qualified form so that a
//! rule for `docker.io` also covers `nginx:latest`.

/// Registry assumed for references without a registry host
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Namespace of official Docker Hub images
pub const OFFICIAL_NAMESPACE: &str = "library";

/// Expand a Docker Hub reference to its fully qualified form.
///
/// References whose first path component contains a `.` are taken to start
/// with a registry host and are returned unchanged.
///
/// ```
/// use pod_image_swap_webhook::image::normalize_image;
///
/// assert_eq!(normalize_image("nginx:latest"), "docker.io/library/nginx:latest");
/// assert_eq!(
///     normalize_image("goharbor/harbor-core:v2.4.2"),
///     "docker.io/goharbor/harbor-core:v2.4.2"
/// );
/// ```
pub fn normalize_image(image: &str) -> String {
    match image.split_once('/') {
        None => format!("{}/{}/{}", DEFAULT_REGISTRY, OFFICIAL_NAMESPACE, image),
        Some((first, _)) if first.contains('.') => image.to_string(),
        Some(_) => format!("{}/{}", DEFAULT_REGISTRY, image),
    }
}

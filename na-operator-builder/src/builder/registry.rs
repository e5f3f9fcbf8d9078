use k8s_openapi::api::core::v1::LocalObjectReference;

/// Registry whose images are pulled with an operator provided pull secret
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagedRegistry {
    pub prefix: &'static str,
    pub secret_name: &'static str,
}

pub static MANAGED_REGISTRIES: &[ManagedRegistry] = &[
    ManagedRegistry {
        prefix: "containers.nodeagent.dev",
        secret_name: "containers-nodeagent-dev",
    },
];

impl ManagedRegistry {
    /// Whether an image reference points into this registry. The prefix has
    /// to be a whole host name, `containers.nodeagent.dev.example.com/agent`
    /// does not match.
    pub fn serves(&self, image: &str) -> bool {
        image
            .strip_prefix(self.prefix)
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Find the managed registry an image is pulled from. Matching is on whole
/// host names, not on a bare string prefix.
pub fn managed_registry(image: &str) -> Option<&'static ManagedRegistry> {
    MANAGED_REGISTRIES.iter().find(|registry| registry.serves(image))
}

/// Resolve the pull secrets of an image
///
/// # Arguments
/// * `image` - The full image reference
/// * `user_secrets` - Pull secrets declared by the user
///
/// # Returns
/// The user's pull secrets followed by the managed registry secret when the
/// image comes from a managed registry, or `None` if there are none
pub fn image_pull_secrets(image: &str, user_secrets: &[String]) -> Option<Vec<LocalObjectReference>> {
    let secrets: Vec<LocalObjectReference> = user_secrets
        .iter()
        .map(String::as_str)
        .chain(
            managed_registry(image)
                .map(|registry| registry.secret_name)
                .filter(|secret| !user_secrets.iter().any(|s| s == secret))
        )
        .map(|secret| LocalObjectReference {
            name: secret.to_string(),
        })
        .collect();

    match secrets.is_empty() {
        true => None,
        false => Some(secrets),
    }
}

use k8s_openapi::api::core::v1::{
    Volume, VolumeMount, HostPathVolumeSource, EmptyDirVolumeSource, ConfigMapVolumeSource,
    SecretVolumeSource,
};

use crate::crd::v1::agent::NodeAgentSpec;
use crate::error::{BuilderError, Result};

pub static CONFIG_DIRECTORY: &str = "/opt/node-agent/etc/agent";
pub static TPL_FILES_TMP_DIRECTORY: &str = "/opt/node-agent/etc/tpl-tmp";
pub static CERTS_DIRECTORY: &str = "/opt/node-agent/etc/certs";
pub static REPO_DIRECTORY: &str = "/opt/node-agent/data/repo";

pub const DEV: &str = "dev";
pub const RUN: &str = "run";
pub const VAR_RUN: &str = "var-run";
pub const VAR_RUN_KUBO: &str = "var-run-kubo";
pub const VAR_RUN_CONTAINERD: &str = "var-run-containerd";
pub const VAR_CONTAINERD_CONFIG: &str = "var-containerd-config";
pub const SYS: &str = "sys";
pub const VAR_LOG: &str = "var-log";
pub const VAR_LIB: &str = "var-lib";
pub const VAR_DATA: &str = "var-data";
pub const MACHINE_ID: &str = "machine-id";
pub const CONFIG: &str = "config";
pub const TPL_FILES_TMP: &str = "tpl-files-tmp";
pub const TLS: &str = "tls";
pub const REPO: &str = "repo";

const HOST_TO_CONTAINER: Option<&str> = Some("HostToContainer");

/// Where the content of a registered volume comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeSourceKind {
    HostPath(&'static str),
    EmptyDir,
    // ConfigMap named after the NodeAgent
    AgentConfigMap,
    // Secret holding the agent's TLS material
    TlsSecret,
    // Host directory configured as the agent repository
    HostRepository,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeDefinition {
    pub name: &'static str,
    pub source: VolumeSourceKind,
    pub mount_path: &'static str,
    pub read_only: bool,
    pub mount_propagation: Option<&'static str>,
}

const fn host_volume(name: &'static str, path: &'static str) -> VolumeDefinition {
    VolumeDefinition {
        name,
        source: VolumeSourceKind::HostPath(path),
        mount_path: path,
        read_only: false,
        mount_propagation: HOST_TO_CONTAINER,
    }
}

/// Every volume an agent container may mount. The order here is the order
/// volumes and mounts are emitted in.
pub static VOLUMES: &[VolumeDefinition] = &[
    host_volume(DEV, "/dev"),
    host_volume(RUN, "/run"),
    host_volume(VAR_RUN, "/var/run"),
    host_volume(VAR_RUN_KUBO, "/var/vcap/sys/run/docker"),
    host_volume(VAR_RUN_CONTAINERD, "/var/vcap/sys/run/containerd"),
    host_volume(VAR_CONTAINERD_CONFIG, "/var/vcap/jobs/containerd/config"),
    host_volume(SYS, "/sys"),
    host_volume(VAR_LOG, "/var/log"),
    host_volume(VAR_LIB, "/var/lib"),
    host_volume(VAR_DATA, "/var/data"),
    VolumeDefinition {
        name: MACHINE_ID,
        source: VolumeSourceKind::HostPath("/etc/machine-id"),
        mount_path: "/etc/machine-id",
        read_only: true,
        mount_propagation: None,
    },
    VolumeDefinition {
        name: CONFIG,
        source: VolumeSourceKind::AgentConfigMap,
        mount_path: CONFIG_DIRECTORY,
        read_only: false,
        mount_propagation: None,
    },
    VolumeDefinition {
        name: TPL_FILES_TMP,
        source: VolumeSourceKind::EmptyDir,
        mount_path: TPL_FILES_TMP_DIRECTORY,
        read_only: false,
        mount_propagation: None,
    },
    VolumeDefinition {
        name: TLS,
        source: VolumeSourceKind::TlsSecret,
        mount_path: CERTS_DIRECTORY,
        read_only: true,
        mount_propagation: None,
    },
    VolumeDefinition {
        name: REPO,
        source: VolumeSourceKind::HostRepository,
        mount_path: REPO_DIRECTORY,
        read_only: false,
        mount_propagation: None,
    },
];

/// Position of a volume in the registry
pub fn position(name: &str) -> Option<usize> {
    VOLUMES.iter().position(|volume| volume.name == name)
}

pub struct VolumeBuilder<'a> {
    name: &'a str,
    spec: &'a NodeAgentSpec,
}

impl<'a> VolumeBuilder<'a> {
    pub fn new(name: &'a str, spec: &'a NodeAgentSpec) -> Self {
        Self { name, spec }
    }

    /// Resolve a set of registered volumes for one container
    ///
    /// # Arguments
    /// * `requested` - Names of the volumes the container mounts
    ///
    /// # Returns
    /// The volumes and their mounts, paired by position and in registry
    /// order, or an error if a name is not registered or its source is not
    /// configured on the NodeAgent
    pub fn build(&self, requested: &[&str]) -> Result<(Vec<Volume>, Vec<VolumeMount>)> {
        let mut indices = requested
            .iter()
            .map(|name| position(name).ok_or_else(|| BuilderError::UnregisteredVolume(name.to_string())))
            .collect::<Result<Vec<_>>>()?;
        indices.sort_unstable();
        indices.dedup();

        indices
            .into_iter()
            .map(|index| self.resolve(&VOLUMES[index]))
            .collect::<Result<Vec<_>>>()
            .map(|pairs| pairs.into_iter().unzip())
    }

    fn resolve(&self, definition: &VolumeDefinition) -> Result<(Volume, VolumeMount)> {
        let mut volume = Volume {
            name: definition.name.to_string(),
            ..Default::default()
        };

        match definition.source {
            VolumeSourceKind::HostPath(path) => {
                volume.host_path = Some(host_path_source(path));
            },
            VolumeSourceKind::EmptyDir => {
                volume.empty_dir = Some(EmptyDirVolumeSource::default());
            },
            VolumeSourceKind::AgentConfigMap => {
                volume.config_map = Some(ConfigMapVolumeSource {
                    name: self.name.to_string(),
                    ..Default::default()
                });
            },
            VolumeSourceKind::TlsSecret => {
                let secret_name = self.spec.agent.tls
                    .as_ref()
                    .and_then(|tls| tls.secret_name(self.name))
                    .ok_or(BuilderError::UnresolvedVolumeSource(definition.name))?;

                volume.secret = Some(SecretVolumeSource {
                    secret_name: Some(secret_name),
                    default_mode: Some(0o440),
                    ..Default::default()
                });
            },
            VolumeSourceKind::HostRepository => {
                let path = self.spec.agent.host
                    .repository()
                    .ok_or(BuilderError::UnresolvedVolumeSource(definition.name))?;

                volume.host_path = Some(host_path_source(path));
            },
        }

        let mount = VolumeMount {
            name: definition.name.to_string(),
            mount_path: definition.mount_path.to_string(),
            read_only: definition.read_only.then_some(true),
            mount_propagation: definition.mount_propagation.map(str::to_string),
            ..Default::default()
        };

        Ok((volume, mount))
    }
}

fn host_path_source(path: &str) -> HostPathVolumeSource {
    HostPathVolumeSource {
        path: path.to_string(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::v1::agent::TlsSpec;

    fn names(volumes: &[Volume]) -> Vec<&str> {
        volumes.iter().map(|v| v.name.as_str()).collect()
    }

    #[test]
    fn test_registry_names_are_unique() {
        for (index, volume) in VOLUMES.iter().enumerate() {
            assert_eq!(position(volume.name), Some(index), "duplicate volume {}", volume.name);
        }
    }

    #[test]
    fn test_output_follows_registry_order() {
        let spec = NodeAgentSpec::default();
        let builder = VolumeBuilder::new("agent", &spec);

        let (volumes, mounts) = builder.build(&[TPL_FILES_TMP, SYS, DEV, SYS]).unwrap();

        assert_eq!(names(&volumes), vec![DEV, SYS, TPL_FILES_TMP]);
        assert_eq!(
            mounts.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
            names(&volumes)
        );
    }

    #[test]
    fn test_sources_and_mounts() {
        let spec = NodeAgentSpec::default();
        let builder = VolumeBuilder::new("agent", &spec);

        let (volumes, mounts) = builder.build(&[DEV, MACHINE_ID, CONFIG, TPL_FILES_TMP]).unwrap();

        assert_eq!(volumes[0].host_path.as_ref().map(|h| h.path.as_str()), Some("/dev"));
        assert_eq!(mounts[0].mount_propagation.as_deref(), Some("HostToContainer"));
        assert_eq!(mounts[1].read_only, Some(true));
        assert_eq!(volumes[2].config_map.as_ref().map(|c| c.name.as_str()), Some("agent"));
        assert_eq!(mounts[2].mount_path, CONFIG_DIRECTORY);
        assert!(volumes[3].empty_dir.is_some());
        assert_eq!(mounts[3].read_only, None);
    }

    #[test]
    fn test_unregistered_volume_is_an_error() {
        let spec = NodeAgentSpec::default();
        let builder = VolumeBuilder::new("agent", &spec);

        assert!(matches!(
            builder.build(&[DEV, "docker-sock"]),
            Err(BuilderError::UnregisteredVolume(name)) if name == "docker-sock"
        ));
    }

    #[test]
    fn test_tls_volume_requires_tls_configuration() {
        let mut spec = NodeAgentSpec::default();

        assert!(matches!(
            VolumeBuilder::new("agent", &spec).build(&[TLS]),
            Err(BuilderError::UnresolvedVolumeSource(TLS))
        ));

        spec.agent.tls = Some(TlsSpec {
            certificate: Some("cert".to_string()),
            key: Some("key".to_string()),
            ..Default::default()
        });
        let (volumes, mounts) = VolumeBuilder::new("agent", &spec).build(&[TLS]).unwrap();

        let secret = volumes[0].secret.as_ref().unwrap();
        assert_eq!(secret.secret_name.as_deref(), Some("agent-tls"));
        assert_eq!(secret.default_mode, Some(0o440));
        assert_eq!(mounts[0].mount_path, CERTS_DIRECTORY);
    }

    #[test]
    fn test_repo_volume_uses_host_repository() {
        let mut spec = NodeAgentSpec::default();
        spec.agent.host.repository = Some("/srv/agent-repo".to_string());

        let (volumes, mounts) = VolumeBuilder::new("agent", &spec).build(&[REPO]).unwrap();

        assert_eq!(volumes[0].host_path.as_ref().map(|h| h.path.as_str()), Some("/srv/agent-repo"));
        assert_eq!(mounts[0].mount_path, REPO_DIRECTORY);
    }
}

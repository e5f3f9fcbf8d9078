use k8s_openapi::api::apps::v1::{DaemonSet, DaemonSetSpec};
use k8s_openapi::api::core::v1::{
    Container, HTTPGetAction, PodSpec, PodTemplateSpec, Probe, ResourceRequirements, SecurityContext,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

use na_operator_common::config::AppConfig;
use na_operator_common::telemetry::{debug, info};

use crate::builder::env::{EnvBuilder, EnvProvider};
use crate::builder::gate::{self, Gate};
use crate::builder::hash::ConfigHasher;
use crate::builder::labels::LabelComposer;
use crate::builder::ports::{self, PortsBuilder};
use crate::builder::registry::image_pull_secrets;
use crate::builder::synthesis::Synthesis;
use crate::builder::traits::FromAgent;
use crate::builder::volume::{self, VolumeBuilder, CONFIG_DIRECTORY, TPL_FILES_TMP_DIRECTORY};
use crate::crd::v1::agent::NodeAgent;
use crate::error::{BuilderError, Result};

pub static INIT_CONTAINER_NAME: &str = "copy-tpl-files";
pub static AGENT_CONTAINER_NAME: &str = "node-agent";
pub static AGENT_RUN_SCRIPT: &str = "/opt/node-agent/bin/run.sh";
pub static DEFAULT_SERVICE_ACCOUNT: &str = "default";

/// Environment of the agent container, in the order it is emitted
pub static AGENT_ENV: &[EnvProvider] = &[
    EnvProvider::AgentMode,
    EnvProvider::ZoneName,
    EnvProvider::ClusterName,
    EnvProvider::EndpointHost,
    EnvProvider::EndpointPort,
    EnvProvider::MavenRepoUrl,
    EnvProvider::ProxyHost,
    EnvProvider::ProxyPort,
    EnvProvider::ProxyProtocol,
    EnvProvider::ProxyUser,
    EnvProvider::ProxyPassword,
    EnvProvider::ProxyUseDns,
    EnvProvider::ListenAddress,
    EnvProvider::RedactK8sSecrets,
    EnvProvider::AgentKey,
    EnvProvider::DownloadKey,
    EnvProvider::KeysSecret,
    EnvProvider::PodName,
    EnvProvider::PodIp,
    EnvProvider::ServiceDomain,
];

static INIT_VOLUMES: &[&str] = &[volume::TPL_FILES_TMP];

static AGENT_VOLUMES: &[&str] = &[
    volume::DEV,
    volume::RUN,
    volume::VAR_RUN,
    volume::VAR_RUN_KUBO,
    volume::VAR_RUN_CONTAINERD,
    volume::VAR_CONTAINERD_CONFIG,
    volume::SYS,
    volume::VAR_LOG,
    volume::VAR_LIB,
    volume::VAR_DATA,
    volume::MACHINE_ID,
    volume::CONFIG,
    volume::TPL_FILES_TMP,
];

static AGENT_PORTS: &[&str] = &[
    ports::AGENT_APIS,
    ports::AGENT_SOCKET,
    ports::OTLP_LEGACY,
    ports::OTLP_GRPC,
    ports::OTLP_HTTP,
];

/// Composes the agent DaemonSet of a single NodeAgent
pub struct DaemonSetBuilder<'a> {
    agent: &'a NodeAgent,
    name: &'a str,
    namespace: &'a str,
    config: &'a AppConfig,
    hasher: ConfigHasher,
    labels: LabelComposer<'a>,
    env: EnvBuilder<'a>,
    volumes: VolumeBuilder<'a>,
    ports: PortsBuilder<'a>,
}

impl<'a> DaemonSetBuilder<'a> {
    pub fn new(agent: &'a NodeAgent, config: &'a AppConfig) -> Result<Self> {
        let name = agent.metadata.name
            .as_deref()
            .ok_or(BuilderError::MissingObjectKeyError(".metadata.name"))?;
        let namespace = agent.metadata.namespace
            .as_deref()
            .ok_or(BuilderError::MissingObjectKeyError(".metadata.namespace"))?;
        let spec = &agent.spec;

        Ok(Self {
            agent,
            name,
            namespace,
            config,
            hasher: ConfigHasher,
            labels: LabelComposer::new(name, spec),
            env: EnvBuilder::new(name, namespace, spec, config),
            volumes: VolumeBuilder::new(name, spec),
            ports: PortsBuilder::new(spec),
        })
    }

    /// Volumes of the agent container, including the optional ones the
    /// NodeAgent configures
    fn agent_volumes(&self) -> Vec<&'static str> {
        let agent = &self.agent.spec.agent;

        AGENT_VOLUMES
            .iter()
            .copied()
            .chain(
                agent.tls
                    .as_ref()
                    .and_then(|tls| tls.secret_name(self.name))
                    .map(|_| volume::TLS)
            )
            .chain(agent.host.repository().map(|_| volume::REPO))
            .collect()
    }

    fn service_account_name(&self) -> String {
        let service_account = &self.agent.spec.service_account;

        match (service_account.name.as_deref().filter(|n| !n.is_empty()), service_account.create) {
            (Some(name), _) => name.to_string(),
            (None, true) => self.name.to_string(),
            (None, false) => DEFAULT_SERVICE_ACCOUNT.to_string(),
        }
    }

    /// Synthesize the DaemonSet, or `Synthesis::Absent` when the NodeAgent
    /// lacks the identity to run agents
    pub fn build(&self) -> Result<Synthesis<DaemonSet>> {
        let spec = &self.agent.spec;

        if let Gate::Absent(reason) = gate::evaluate(spec) {
            info!(
                event = "SkippingDaemonSet",
                agent = self.name,
                namespace = self.namespace,
                reason = %reason,
            );
            return Ok(Synthesis::Absent);
        }

        let selector_labels = self.labels.selector_labels();
        let digest = self.hasher.digest(spec)?;
        let template_labels = self.labels.template_labels();
        let template_annotations = self.labels.template_annotations(&digest);

        let image = spec.agent.image(&self.config.builder);
        let pull_secrets = image_pull_secrets(&image, &spec.agent.image.pull_secrets);

        let env = self.env.build(AGENT_ENV)?;
        let (_, init_mounts) = self.volumes.build(INIT_VOLUMES)?;
        let (volumes, mounts) = self.volumes.build(&self.agent_volumes())?;
        let container_ports = self.ports.build(AGENT_PORTS)?;

        debug!(
            event = "SynthesizedDaemonSet",
            agent = self.name,
            namespace = self.namespace,
            digest = digest.as_str(),
        );

        Ok(Synthesis::Present(DaemonSet {
            metadata: ObjectMeta {
                name: Some(self.name.to_string()),
                namespace: Some(self.namespace.to_string()),
                labels: Some(self.labels.common_labels()),
                ..Default::default()
            },
            spec: Some(DaemonSetSpec {
                selector: LabelSelector {
                    match_labels: Some(selector_labels),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(template_labels),
                        annotations: Some(template_annotations),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        volumes: Some(volumes),
                        service_account_name: Some(self.service_account_name()),
                        node_selector: spec.agent.pod.node_selector.clone(),
                        host_network: Some(true),
                        host_pid: Some(true),
                        priority_class_name: spec.agent.pod.priority_class_name.clone(),
                        dns_policy: Some("ClusterFirstWithHostNet".to_string()),
                        image_pull_secrets: pull_secrets,
                        init_containers: Some(vec![
                            Container {
                                name: INIT_CONTAINER_NAME.to_string(),
                                image: Some(image.clone()),
                                image_pull_policy: spec.agent.image.pull_policy.clone(),
                                command: Some(vec!["bash".to_string()]),
                                args: Some(vec![
                                    "-c".to_string(),
                                    format!("cp {}/*.tpl {}", CONFIG_DIRECTORY, TPL_FILES_TMP_DIRECTORY),
                                ]),
                                volume_mounts: Some(init_mounts),
                                ..Default::default()
                            },
                        ]),
                        containers: vec![
                            Container {
                                name: AGENT_CONTAINER_NAME.to_string(),
                                image: Some(image),
                                image_pull_policy: spec.agent.image.pull_policy.clone(),
                                command: Some(vec!["bash".to_string()]),
                                args: Some(vec![
                                    "-c".to_string(),
                                    format!(
                                        "cp {}/*.tpl {} && {}",
                                        TPL_FILES_TMP_DIRECTORY, CONFIG_DIRECTORY, AGENT_RUN_SCRIPT
                                    ),
                                ]),
                                volume_mounts: Some(mounts),
                                env: Some(env),
                                security_context: Some(SecurityContext {
                                    privileged: Some(true),
                                    ..Default::default()
                                }),
                                liveness_probe: Some(liveness_probe()),
                                resources: Some(
                                    spec.agent.pod.resources
                                        .clone()
                                        .unwrap_or_else(default_resources)
                                ),
                                ports: Some(container_ports),
                                ..Default::default()
                            },
                        ],
                        tolerations: spec.agent.pod.tolerations.clone(),
                        affinity: spec.agent.pod.affinity.clone(),
                        ..Default::default()
                    }),
                },
                update_strategy: spec.agent.update_strategy.clone(),
                ..Default::default()
            }),
            ..Default::default()
        }))
    }
}

impl FromAgent for DaemonSet {
    /// Create the agent DaemonSet from a NodeAgent
    ///
    /// # Arguments
    /// * `agent` - The NodeAgent to synthesize from
    /// * `config` - The application configuration
    ///
    /// # Returns
    /// `Synthesis::Present` with the DaemonSet, `Synthesis::Absent` if the
    /// NodeAgent is incomplete, or an error if a builder invariant is broken
    fn from_agent(agent: &NodeAgent, config: &AppConfig) -> Result<Synthesis<Self>> {
        DaemonSetBuilder::new(agent, config)?.build()
    }
}

/// Synthesize the agent DaemonSet of a NodeAgent
pub fn synthesize(agent: &NodeAgent, config: &AppConfig) -> Result<Synthesis<DaemonSet>> {
    DaemonSet::from_agent(agent, config)
}

fn liveness_probe() -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            host: Some("127.0.0.1".to_string()),
            path: Some("/status".to_string()),
            port: IntOrString::String(ports::AGENT_APIS.to_string()),
            ..Default::default()
        }),
        initial_delay_seconds: Some(300),
        timeout_seconds: Some(3),
        period_seconds: Some(10),
        failure_threshold: Some(3),
        ..Default::default()
    }
}

fn default_resources() -> ResourceRequirements {
    ResourceRequirements {
        requests: Some(BTreeMap::from([
            ("cpu".to_string(), Quantity("0.5".to_string())),
            ("memory".to_string(), Quantity("512Mi".to_string())),
        ])),
        limits: Some(BTreeMap::from([
            ("cpu".to_string(), Quantity("1.5".to_string())),
            ("memory".to_string(), Quantity("768Mi".to_string())),
        ])),
        ..Default::default()
    }
}

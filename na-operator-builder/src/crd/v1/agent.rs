use kube::CustomResource;
use k8s_openapi::api::apps::v1::DaemonSetUpdateStrategy;
use k8s_openapi::api::core::v1::{Affinity, ResourceRequirements, Toleration};
use std::{fmt::{Display, Formatter, Result as FmtResult}, collections::BTreeMap};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use na_operator_common::config::BuilderConfig;

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    kind = "NodeAgent",
    group = "nodeagent.dev",
    version = "v1",
    doc = "NodeAgent is a specification for an agent running on every node of a Kubernetes cluster.",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Mode", "type":"string", "description":"Operating mode of the agent", "jsonPath":".spec.agent.mode"}"#,
    printcolumn = r#"{"name":"Cluster", "type":"string", "description":"Name the cluster is reported under", "jsonPath":".spec.cluster.name"}"#,
    printcolumn = r#"{"name":"Zone", "type":"string", "description":"Zone the agents are reported under", "jsonPath":".spec.zone.name"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct NodeAgentSpec {
    #[serde(default)]
    /// Zone the agents are reported under
    pub zone: Name,
    #[serde(default)]
    /// Name the cluster is reported under
    pub cluster: Name,
    #[serde(default)]
    /// Agent runtime configuration
    pub agent: AgentSpec,
    #[serde(default)]
    /// ServiceAccount the agent pods run as
    pub service_account: ServiceAccountSpec,
    #[serde(default)]
    /// OpenTelemetry ingestion configuration
    pub opentelemetry: OpenTelemetrySpec,
}

impl NodeAgentSpec {
    pub fn zone_name(&self) -> Option<&str> {
        self.zone.get()
    }

    pub fn cluster_name(&self) -> Option<&str> {
        self.cluster.get()
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Name {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Name {
    /// The configured name, with an empty string treated as unset
    pub fn get(&self) -> Option<&str> {
        non_empty(&self.name)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentMode {
    #[default]
    Apm,
    Infrastructure,
    Aws,
    Kubernetes,
}

impl AgentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentMode::Apm => "APM",
            AgentMode::Infrastructure => "INFRASTRUCTURE",
            AgentMode::Aws => "AWS",
            AgentMode::Kubernetes => "KUBERNETES",
        }
    }
}

impl Display for AgentMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Operating mode of the agent, APM when unset
    pub mode: Option<AgentMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Agent key, stored by the operator in a Secret named after the NodeAgent
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Download key, stored alongside the agent key
    pub download_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Name of an existing Secret holding `key` and optionally `downloadKey`
    pub keys_secret: Option<String>,
    /// Host of the backend the agents report to
    pub endpoint_host: String,
    /// Port of the backend the agents report to
    pub endpoint_port: u16,
    /// Image to use for the agent
    pub image: ImageSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Proxy the agents connect through
    pub proxy: Option<ProxySpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Address the agent HTTP server listens on
    pub listen_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Whether Kubernetes Secret values are redacted from collected data
    pub redact_kubernetes_secrets: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Maven repository the agent downloads its modules from
    pub maven_repo_url: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    /// Additional environment variables for the agent container
    pub env: BTreeMap<String, String>,
    /// Pod level configuration of the agent DaemonSet
    pub pod: AgentPodSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// TLS material served by the agent
    pub tls: Option<TlsSpec>,
    /// Host level configuration
    pub host: HostSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Update strategy of the agent DaemonSet
    pub update_strategy: Option<DaemonSetUpdateStrategy>,
}

impl Default for AgentSpec {
    fn default() -> Self {
        AgentSpec {
            mode: None,
            key: None,
            download_key: None,
            keys_secret: None,
            endpoint_host: "ingress.nodeagent.dev".to_string(),
            endpoint_port: 443,
            image: ImageSpec::default(),
            proxy: None,
            listen_address: None,
            redact_kubernetes_secrets: None,
            maven_repo_url: None,
            env: BTreeMap::new(),
            pod: AgentPodSpec::default(),
            tls: None,
            host: HostSpec::default(),
            update_strategy: None,
        }
    }
}

impl AgentSpec {
    pub fn key(&self) -> Option<&str> {
        non_empty(&self.key)
    }

    pub fn download_key(&self) -> Option<&str> {
        non_empty(&self.download_key)
    }

    pub fn keys_secret(&self) -> Option<&str> {
        non_empty(&self.keys_secret)
    }

    /// Full image reference of the agent, preferring a digest over a tag
    pub fn image(&self, defaults: &BuilderConfig) -> String {
        let name = non_empty(&self.image.name).unwrap_or(&defaults.default_image_name);

        match (non_empty(&self.image.digest), non_empty(&self.image.tag)) {
            (Some(digest), _) => format!("{}@{}", name, digest),
            (None, Some(tag)) => format!("{}:{}", name, tag),
            (None, None) => format!("{}:{}", name, defaults.default_image_tag),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Repository to pull the image from
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Tag to pull
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Digest to pull, takes precedence over the tag
    pub digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Image pull policy
    pub pull_policy: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    /// Secrets to use for pulling the image
    pub pull_secrets: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxySpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Whether the proxy resolves backend host names
    pub use_dns: Option<bool>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentPodSpec {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    /// Labels added to every agent pod
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    /// Annotations added to every agent pod
    pub annotations: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerations: Option<Vec<Toleration>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Affinity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Resources of the agent container, a conservative default is used when unset
    pub resources: Option<ResourceRequirements>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct TlsSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Name of an existing Secret of type kubernetes.io/tls
    pub secret_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// PEM encoded certificate, stored by the operator in `<name>-tls`
    pub certificate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// PEM encoded private key, stored by the operator in `<name>-tls`
    pub key: Option<String>,
}

impl TlsSpec {
    /// Name of the Secret holding the TLS material, if any is configured
    pub fn secret_name(&self, agent_name: &str) -> Option<String> {
        match (non_empty(&self.secret_name), non_empty(&self.certificate), non_empty(&self.key)) {
            (Some(secret_name), _, _) => Some(secret_name.to_string()),
            (None, Some(_), Some(_)) => Some(format!("{}-tls", agent_name)),
            _ => None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct HostSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Host directory shared with the agent as its local artifact repository
    pub repository: Option<String>,
}

impl HostSpec {
    pub fn repository(&self) -> Option<&str> {
        non_empty(&self.repository)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceAccountSpec {
    /// Whether the operator manages a ServiceAccount named after the NodeAgent
    pub create: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Name of the ServiceAccount, overrides the managed one
    pub name: Option<String>,
}

impl Default for ServiceAccountSpec {
    fn default() -> Self {
        ServiceAccountSpec {
            create: true,
            name: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenTelemetrySpec {
    /// OTLP over gRPC, also enables the legacy OTLP port
    pub grpc: Toggle,
    /// OTLP over HTTP
    pub http: Toggle,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Toggle {
    pub enabled: bool,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

use k8s_openapi::api::core::v1::{EnvVar, EnvVarSource, ObjectFieldSelector, SecretKeySelector};
use std::collections::BTreeSet;

use na_operator_common::config::AppConfig;
use na_operator_common::telemetry::warn;

use crate::crd::v1::agent::NodeAgentSpec;
use crate::error::{BuilderError, Result};

/// Value of an environment variable candidate
#[derive(Debug, Clone, PartialEq)]
pub enum EnvValue {
    Literal(String),
    FieldRef(&'static str),
    SecretKeyRef { secret: String, key: &'static str, optional: bool },
}

/// An environment variable a provider may or may not emit
#[derive(Debug, Clone, PartialEq)]
pub struct EnvCandidate {
    pub name: &'static str,
    pub value: Option<EnvValue>,
}

impl EnvCandidate {
    fn new(name: &'static str, value: Option<EnvValue>) -> Self {
        Self { name, value }
    }

    fn literal<T: ToString>(name: &'static str, value: Option<T>) -> Self {
        Self::new(name, value.map(|v| EnvValue::Literal(v.to_string())))
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    pub fn into_env_var(self) -> Option<EnvVar> {
        let name = self.name;

        self.value.map(|value| match value {
            EnvValue::Literal(value) => create_env_var(name, Some(value)),
            EnvValue::FieldRef(field_path) => create_field_env_var(name, field_path),
            EnvValue::SecretKeyRef { secret, key, optional } => create_secret_env_var(name, &secret, key, optional),
        })
    }
}

/// Environment variables the operator can set on an agent container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvProvider {
    AgentMode,
    ZoneName,
    ClusterName,
    EndpointHost,
    EndpointPort,
    MavenRepoUrl,
    ProxyHost,
    ProxyPort,
    ProxyProtocol,
    ProxyUser,
    ProxyPassword,
    ProxyUseDns,
    ListenAddress,
    RedactK8sSecrets,
    AgentKey,
    DownloadKey,
    KeysSecret,
    PodName,
    PodIp,
    ServiceDomain,
}

impl EnvProvider {
    pub fn name(&self) -> &'static str {
        match self {
            EnvProvider::AgentMode => "NODE_AGENT_MODE",
            EnvProvider::ZoneName => "NODE_AGENT_ZONE",
            EnvProvider::ClusterName => "NODE_AGENT_CLUSTER_NAME",
            EnvProvider::EndpointHost => "NODE_AGENT_ENDPOINT_HOST",
            EnvProvider::EndpointPort => "NODE_AGENT_ENDPOINT_PORT",
            EnvProvider::MavenRepoUrl => "NODE_AGENT_MVN_REPOSITORY_URL",
            EnvProvider::ProxyHost => "NODE_AGENT_PROXY_HOST",
            EnvProvider::ProxyPort => "NODE_AGENT_PROXY_PORT",
            EnvProvider::ProxyProtocol => "NODE_AGENT_PROXY_PROTOCOL",
            EnvProvider::ProxyUser => "NODE_AGENT_PROXY_USER",
            EnvProvider::ProxyPassword => "NODE_AGENT_PROXY_PASSWORD",
            EnvProvider::ProxyUseDns => "NODE_AGENT_PROXY_USE_DNS",
            EnvProvider::ListenAddress => "NODE_AGENT_HTTP_LISTEN",
            EnvProvider::RedactK8sSecrets => "NODE_AGENT_REDACT_K8S_SECRETS",
            EnvProvider::AgentKey => "NODE_AGENT_KEY",
            EnvProvider::DownloadKey => "NODE_AGENT_DOWNLOAD_KEY",
            EnvProvider::KeysSecret => "NODE_AGENT_KEYS_SECRET",
            EnvProvider::PodName => "NODE_AGENT_POD_NAME",
            EnvProvider::PodIp => "POD_IP",
            EnvProvider::ServiceDomain => "NODE_AGENT_SERVICE_DOMAIN",
        }
    }
}

pub struct EnvBuilder<'a> {
    name: &'a str,
    namespace: &'a str,
    spec: &'a NodeAgentSpec,
    config: &'a AppConfig,
}

impl<'a> EnvBuilder<'a> {
    pub fn new(name: &'a str, namespace: &'a str, spec: &'a NodeAgentSpec, config: &'a AppConfig) -> Self {
        Self { name, namespace, spec, config }
    }

    /// Name of the Secret holding the agent keys, either referenced by the
    /// user or managed by the operator under the NodeAgent's name
    pub fn keys_secret_name(&self) -> &str {
        self.spec.agent.keys_secret().unwrap_or(self.name)
    }

    /// Evaluate a single provider against the NodeAgent
    pub fn candidate(&self, provider: EnvProvider) -> EnvCandidate {
        let agent = &self.spec.agent;
        let proxy = agent.proxy.as_ref();
        let name = provider.name();

        match provider {
            EnvProvider::AgentMode => EnvCandidate::literal(name, agent.mode),
            EnvProvider::ZoneName => EnvCandidate::literal(name, self.spec.zone_name()),
            EnvProvider::ClusterName => EnvCandidate::literal(name, self.spec.cluster_name()),
            EnvProvider::EndpointHost => EnvCandidate::literal(name, Some(&agent.endpoint_host)),
            EnvProvider::EndpointPort => EnvCandidate::literal(name, Some(agent.endpoint_port)),
            EnvProvider::MavenRepoUrl => EnvCandidate::literal(name, agent.maven_repo_url.as_ref()),
            EnvProvider::ProxyHost => EnvCandidate::literal(name, proxy.and_then(|p| p.host.as_ref())),
            EnvProvider::ProxyPort => EnvCandidate::literal(name, proxy.and_then(|p| p.port)),
            EnvProvider::ProxyProtocol => EnvCandidate::literal(name, proxy.and_then(|p| p.protocol.as_ref())),
            EnvProvider::ProxyUser => EnvCandidate::literal(name, proxy.and_then(|p| p.user.as_ref())),
            EnvProvider::ProxyPassword => EnvCandidate::literal(name, proxy.and_then(|p| p.password.as_ref())),
            EnvProvider::ProxyUseDns => EnvCandidate::literal(name, proxy.and_then(|p| p.use_dns)),
            EnvProvider::ListenAddress => EnvCandidate::literal(name, agent.listen_address.as_ref()),
            EnvProvider::RedactK8sSecrets => EnvCandidate::literal(name, agent.redact_kubernetes_secrets),
            EnvProvider::AgentKey => EnvCandidate::new(name, Some(EnvValue::SecretKeyRef {
                secret: self.keys_secret_name().to_string(),
                key: "key",
                optional: false,
            })),
            EnvProvider::DownloadKey => EnvCandidate::new(
                name,
                match (agent.keys_secret(), agent.download_key()) {
                    // A user managed Secret may or may not carry a download key
                    (Some(secret), _) => Some(EnvValue::SecretKeyRef {
                        secret: secret.to_string(),
                        key: "downloadKey",
                        optional: true,
                    }),
                    (None, Some(_)) => Some(EnvValue::SecretKeyRef {
                        secret: self.name.to_string(),
                        key: "downloadKey",
                        optional: false,
                    }),
                    (None, None) => None,
                },
            ),
            EnvProvider::KeysSecret => EnvCandidate::literal(
                name,
                (agent.keys_secret().is_none() && agent.key().is_some()).then_some(self.name),
            ),
            EnvProvider::PodName => EnvCandidate::new(name, Some(EnvValue::FieldRef("metadata.name"))),
            EnvProvider::PodIp => EnvCandidate::new(name, Some(EnvValue::FieldRef("status.podIP"))),
            EnvProvider::ServiceDomain => EnvCandidate::literal(
                name,
                Some(format!("{}.{}.svc.{}", self.name, self.namespace, self.config.builder.cluster_domain)),
            ),
        }
    }

    /// Build the environment of a container
    ///
    /// Providers are evaluated in the given order and absent candidates are
    /// dropped. The user's variables follow in key order, except those whose
    /// name a provider already emitted.
    ///
    /// # Arguments
    /// * `providers` - The providers to evaluate, in order
    ///
    /// # Returns
    /// The environment variables, or `BuilderError::DuplicateEnvVar` if two
    /// providers emit the same variable
    pub fn build(&self, providers: &[EnvProvider]) -> Result<Vec<EnvVar>> {
        let mut seen = BTreeSet::new();
        let mut env = Vec::with_capacity(providers.len() + self.spec.agent.env.len());

        for provider in providers {
            let candidate = self.candidate(*provider);

            if !candidate.is_present() {
                continue;
            }
            if !seen.insert(candidate.name) {
                return Err(BuilderError::DuplicateEnvVar(candidate.name));
            }
            env.extend(candidate.into_env_var());
        }

        for (name, value) in &self.spec.agent.env {
            if seen.contains(name.as_str()) {
                warn!(
                    event = "DroppingUserEnvVar",
                    agent = self.name,
                    env = name.as_str(),
                );
                continue;
            }
            env.push(create_env_var(name, Some(value.clone())));
        }

        Ok(env)
    }
}

// Plain `name=value` entry, `None` leaves the value unset
fn create_env_var(name: &str, value: Option<String>) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value,
        ..Default::default()
    }
}

/// Create an environment variable from a key of a Secret
fn create_secret_env_var(name: &str, secret: &str, key: &str, optional: bool) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: secret.to_string(),
                key: key.to_string(),
                optional: optional.then_some(true),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Create an environment variable from a field of the pod
fn create_field_env_var(name: &str, field_path: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: field_path.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use crate::crd::v1::agent::{AgentMode, Name, ProxySpec};

    const PROXY_PROVIDERS: &[EnvProvider] = &[
        EnvProvider::ProxyHost,
        EnvProvider::ProxyPort,
        EnvProvider::ProxyProtocol,
        EnvProvider::ProxyUser,
        EnvProvider::ProxyPassword,
        EnvProvider::ProxyUseDns,
    ];

    fn make_spec() -> NodeAgentSpec {
        let mut spec = NodeAgentSpec::default();
        spec.agent.key = Some("secret-key".to_string());
        spec.cluster = Name { name: Some("prod".to_string()) };
        spec
    }

    fn names(env: &[EnvVar]) -> Vec<&str> {
        env.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_absent_candidates_are_dropped_in_order() {
        let spec = make_spec();
        let config = AppConfig::default();
        let builder = EnvBuilder::new("agent", "observability", &spec, &config);

        let env = builder.build(&[
            EnvProvider::AgentMode,
            EnvProvider::ZoneName,
            EnvProvider::ClusterName,
            EnvProvider::EndpointHost,
            EnvProvider::ProxyHost,
            EnvProvider::PodName,
        ]).unwrap();

        assert_eq!(names(&env), vec!["NODE_AGENT_CLUSTER_NAME", "NODE_AGENT_ENDPOINT_HOST", "NODE_AGENT_POD_NAME"]);
        assert_eq!(env[0].value.as_deref(), Some("prod"));
        assert_eq!(env[1].value.as_deref(), Some("ingress.nodeagent.dev"));
    }

    #[test]
    fn test_proxy_unset_emits_no_proxy_vars() {
        let spec = make_spec();
        let config = AppConfig::default();
        let builder = EnvBuilder::new("agent", "observability", &spec, &config);

        assert!(builder.build(PROXY_PROVIDERS).unwrap().is_empty());
    }

    #[test]
    fn test_proxy_fields_are_individually_optional() {
        let mut spec = make_spec();
        spec.agent.proxy = Some(ProxySpec {
            host: Some("proxy.internal".to_string()),
            port: Some(3128),
            use_dns: Some(true),
            ..Default::default()
        });
        let config = AppConfig::default();
        let builder = EnvBuilder::new("agent", "observability", &spec, &config);

        let env = builder.build(PROXY_PROVIDERS).unwrap();

        assert_eq!(names(&env), vec!["NODE_AGENT_PROXY_HOST", "NODE_AGENT_PROXY_PORT", "NODE_AGENT_PROXY_USE_DNS"]);
        assert_eq!(env[1].value.as_deref(), Some("3128"));
        assert_eq!(env[2].value.as_deref(), Some("true"));
    }

    #[test]
    fn test_mode_is_only_emitted_when_set() {
        let mut spec = make_spec();
        let config = AppConfig::default();

        assert!(!EnvBuilder::new("agent", "ns", &spec, &config).candidate(EnvProvider::AgentMode).is_present());

        spec.agent.mode = Some(AgentMode::Infrastructure);
        assert_eq!(
            EnvBuilder::new("agent", "ns", &spec, &config).candidate(EnvProvider::AgentMode).value,
            Some(EnvValue::Literal("INFRASTRUCTURE".to_string()))
        );
    }

    #[test]
    fn test_inline_key_uses_managed_secret() {
        let mut spec = make_spec();
        spec.agent.download_key = Some("download".to_string());
        let config = AppConfig::default();
        let builder = EnvBuilder::new("agent", "ns", &spec, &config);

        let env = builder.build(&[EnvProvider::AgentKey, EnvProvider::DownloadKey, EnvProvider::KeysSecret]).unwrap();

        let key_ref = env[0].value_from.as_ref().and_then(|v| v.secret_key_ref.as_ref()).unwrap();
        assert_eq!((key_ref.name.as_str(), key_ref.key.as_str(), key_ref.optional), ("agent", "key", None));

        let download_ref = env[1].value_from.as_ref().and_then(|v| v.secret_key_ref.as_ref()).unwrap();
        assert_eq!((download_ref.name.as_str(), download_ref.key.as_str()), ("agent", "downloadKey"));

        assert_eq!(env[2].name, "NODE_AGENT_KEYS_SECRET");
        assert_eq!(env[2].value.as_deref(), Some("agent"));
    }

    #[test]
    fn test_keys_secret_reference() {
        let mut spec = make_spec();
        spec.agent.key = None;
        spec.agent.keys_secret = Some("agent-keys".to_string());
        let config = AppConfig::default();
        let builder = EnvBuilder::new("agent", "ns", &spec, &config);

        let env = builder.build(&[EnvProvider::AgentKey, EnvProvider::DownloadKey, EnvProvider::KeysSecret]).unwrap();

        assert_eq!(names(&env), vec!["NODE_AGENT_KEY", "NODE_AGENT_DOWNLOAD_KEY"]);
        let download_ref = env[1].value_from.as_ref().and_then(|v| v.secret_key_ref.as_ref()).unwrap();
        assert_eq!(download_ref.name, "agent-keys");
        assert_eq!(download_ref.optional, Some(true));
    }

    #[test]
    fn test_no_download_key_without_source() {
        let spec = make_spec();
        let config = AppConfig::default();
        let builder = EnvBuilder::new("agent", "ns", &spec, &config);

        assert!(!builder.candidate(EnvProvider::DownloadKey).is_present());
    }

    #[test]
    fn test_field_refs_and_service_domain() {
        let spec = make_spec();
        let config = AppConfig::default();
        let builder = EnvBuilder::new("agent", "observability", &spec, &config);

        let env = builder.build(&[EnvProvider::PodIp, EnvProvider::ServiceDomain]).unwrap();

        let field = env[0].value_from.as_ref().and_then(|v| v.field_ref.as_ref()).unwrap();
        assert_eq!(field.field_path, "status.podIP");
        assert_eq!(env[1].value.as_deref(), Some("agent.observability.svc.cluster.local"));
    }

    #[test]
    fn test_duplicate_provider_is_an_error() {
        let spec = make_spec();
        let config = AppConfig::default();
        let builder = EnvBuilder::new("agent", "ns", &spec, &config);

        let result = builder.build(&[EnvProvider::PodName, EnvProvider::EndpointHost, EnvProvider::PodName]);

        assert!(matches!(result, Err(BuilderError::DuplicateEnvVar("NODE_AGENT_POD_NAME"))));
    }

    #[test]
    fn test_duplicate_absent_provider_is_ignored() {
        let spec = make_spec();
        let config = AppConfig::default();
        let builder = EnvBuilder::new("agent", "ns", &spec, &config);

        assert!(builder.build(&[EnvProvider::ProxyHost, EnvProvider::ProxyHost]).unwrap().is_empty());
    }

    #[test]
    fn test_user_env_appended_last_in_key_order() {
        let mut spec = make_spec();
        spec.agent.env = BTreeMap::from([
            ("ZETA".to_string(), "z".to_string()),
            ("ALPHA".to_string(), "a".to_string()),
        ]);
        let config = AppConfig::default();
        let builder = EnvBuilder::new("agent", "ns", &spec, &config);

        let env = builder.build(&[EnvProvider::ClusterName]).unwrap();

        assert_eq!(names(&env), vec!["NODE_AGENT_CLUSTER_NAME", "ALPHA", "ZETA"]);
    }

    #[test]
    fn test_user_env_cannot_shadow_provider() {
        let mut spec = make_spec();
        spec.agent.env = BTreeMap::from([
            ("NODE_AGENT_CLUSTER_NAME".to_string(), "spoofed".to_string()),
            ("NODE_AGENT_ZONE".to_string(), "passes".to_string()),
        ]);
        let config = AppConfig::default();
        let builder = EnvBuilder::new("agent", "ns", &spec, &config);

        let env = builder.build(&[EnvProvider::ZoneName, EnvProvider::ClusterName]).unwrap();

        assert_eq!(names(&env), vec!["NODE_AGENT_CLUSTER_NAME", "NODE_AGENT_ZONE"]);
        assert_eq!(env[0].value.as_deref(), Some("prod"));
        assert_eq!(env[1].value.as_deref(), Some("passes"));
    }
}

use k8s_openapi::api::core::v1::ContainerPort;

use crate::crd::v1::agent::NodeAgentSpec;
use crate::error::{BuilderError, Result};

pub const AGENT_APIS: &str = "agent-apis";
pub const AGENT_SOCKET: &str = "agent-socket";
pub const OTLP_LEGACY: &str = "otlp-legacy";
pub const OTLP_GRPC: &str = "otlp-grpc";
pub const OTLP_HTTP: &str = "otlp-http";

/// Feature a port is exposed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortGate {
    Always,
    OpenTelemetryGrpc,
    OpenTelemetryHttp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortDefinition {
    pub name: &'static str,
    pub port: i32,
    pub protocol: &'static str,
    pub gate: PortGate,
}

pub static PORTS: &[PortDefinition] = &[
    PortDefinition { name: AGENT_APIS, port: 42699, protocol: "TCP", gate: PortGate::Always },
    PortDefinition { name: AGENT_SOCKET, port: 42666, protocol: "TCP", gate: PortGate::Always },
    PortDefinition { name: OTLP_LEGACY, port: 55680, protocol: "TCP", gate: PortGate::OpenTelemetryGrpc },
    PortDefinition { name: OTLP_GRPC, port: 4317, protocol: "TCP", gate: PortGate::OpenTelemetryGrpc },
    PortDefinition { name: OTLP_HTTP, port: 4318, protocol: "TCP", gate: PortGate::OpenTelemetryHttp },
];

pub fn position(name: &str) -> Option<usize> {
    PORTS.iter().position(|port| port.name == name)
}

pub struct PortsBuilder<'a> {
    spec: &'a NodeAgentSpec,
}

impl<'a> PortsBuilder<'a> {
    pub fn new(spec: &'a NodeAgentSpec) -> Self {
        Self { spec }
    }

    fn is_enabled(&self, gate: PortGate) -> bool {
        match gate {
            PortGate::Always => true,
            PortGate::OpenTelemetryGrpc => self.spec.opentelemetry.grpc.enabled,
            PortGate::OpenTelemetryHttp => self.spec.opentelemetry.http.enabled,
        }
    }

    /// Resolve the container ports for a set of registered ports, dropping
    /// those whose feature is disabled
    pub fn build(&self, requested: &[&str]) -> Result<Vec<ContainerPort>> {
        let mut indices = requested
            .iter()
            .map(|name| position(name).ok_or_else(|| BuilderError::UnregisteredPort(name.to_string())))
            .collect::<Result<Vec<_>>>()?;
        indices.sort_unstable();
        indices.dedup();

        Ok(indices
            .into_iter()
            .map(|index| &PORTS[index])
            .filter(|definition| self.is_enabled(definition.gate))
            .map(|definition| ContainerPort {
                name: Some(definition.name.to_string()),
                container_port: definition.port,
                protocol: Some(definition.protocol.to_string()),
                ..Default::default()
            })
            .collect())
    }
}

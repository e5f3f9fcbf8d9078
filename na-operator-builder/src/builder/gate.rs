use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::crd::v1::agent::NodeAgentSpec;

/// Whether a NodeAgent carries the identity needed to run agents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Present,
    Absent(AbsentReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsentReason {
    // Neither an inline agent key nor a keys Secret is configured
    MissingCredentials,
    // Neither a zone nor a cluster name is configured
    MissingClusterIdentity,
}

impl Display for AbsentReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AbsentReason::MissingCredentials => write!(f, "no agent key or keys secret configured"),
            AbsentReason::MissingClusterIdentity => write!(f, "no zone or cluster name configured"),
        }
    }
}

/// Check the identity invariants of a NodeAgent before anything is built
///
/// # Arguments
/// * `spec` - The NodeAgent spec to check
///
/// # Returns
/// `Gate::Present` when an agent key (inline or by Secret) and a zone or
/// cluster name are configured, otherwise the first missing piece
pub fn evaluate(spec: &NodeAgentSpec) -> Gate {
    if spec.agent.key().is_none() && spec.agent.keys_secret().is_none() {
        return Gate::Absent(AbsentReason::MissingCredentials);
    }

    if spec.zone_name().is_none() && spec.cluster_name().is_none() {
        return Gate::Absent(AbsentReason::MissingClusterIdentity);
    }

    Gate::Present
}

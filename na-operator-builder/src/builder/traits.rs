use na_operator_common::config::AppConfig;

use crate::builder::synthesis::Synthesis;
use crate::crd::v1::agent::NodeAgent;
use crate::error::Result;

// Trait to synthesize a child Resource from a NodeAgent. An incomplete
// NodeAgent yields `Synthesis::Absent`, an `Err` is always a builder defect.
pub trait FromAgent: Sized {
    fn from_agent(agent: &NodeAgent, config: &AppConfig) -> Result<Synthesis<Self>>;
}

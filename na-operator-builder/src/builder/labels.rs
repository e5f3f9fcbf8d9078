use std::collections::BTreeMap;

use na_operator_common::constant;

use crate::builder::hash::ConfigDigest;
use crate::crd::v1::agent::NodeAgentSpec;

pub static K8S_NAME: &str = "app.kubernetes.io/name";
pub static K8S_INSTANCE: &str = "app.kubernetes.io/instance";
pub static K8S_COMPONENT: &str = "app.kubernetes.io/component";
pub static K8S_PART_OF: &str = "app.kubernetes.io/part-of";
pub static K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

pub static APP_NAME: &str = "node-agent";
pub static COMPONENT_NAME: &str = "node-agent";
pub static MANAGED_BY: &str = constant::APP_NAME;

pub static AGENT_MODE_LABEL: &str = "nodeagent.dev/agent-mode";
pub static CONFIG_HASH_ANNOTATION: &str = "nodeagent.dev/configuration-hash";

pub struct LabelComposer<'a> {
    name: &'a str,
    spec: &'a NodeAgentSpec,
}

impl<'a> LabelComposer<'a> {
    pub fn new(name: &'a str, spec: &'a NodeAgentSpec) -> Self {
        Self { name, spec }
    }

    /// Labels binding the DaemonSet to its pods.
    ///
    /// A DaemonSet selector can not be updated in place, so only values fixed
    /// for the lifetime of the NodeAgent may appear here.
    pub fn selector_labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (K8S_NAME.to_string(), APP_NAME.to_string()),
            (K8S_INSTANCE.to_string(), self.name.to_string()),
            (K8S_COMPONENT.to_string(), COMPONENT_NAME.to_string()),
        ])
    }

    /// Labels applied uniformly to every object and pod of the NodeAgent
    pub fn common_labels(&self) -> BTreeMap<String, String> {
        self.selector_labels()
            .into_iter()
            .chain([
                (K8S_PART_OF.to_string(), APP_NAME.to_string()),
                (K8S_MANAGED_BY.to_string(), MANAGED_BY.to_string()),
            ])
            .collect()
    }

    /// Pod template labels: user labels, overridden by the agent mode label,
    /// overridden by the common labels
    pub fn template_labels(&self) -> BTreeMap<String, String> {
        let mut labels = self.spec.agent.pod.labels.clone();
        labels.insert(
            AGENT_MODE_LABEL.to_string(),
            self.spec.agent.mode.unwrap_or_default().to_string(),
        );
        labels.extend(self.common_labels());
        labels
    }

    /// Pod template annotations: user annotations with the configuration
    /// digest on top
    pub fn template_annotations(&self, digest: &ConfigDigest) -> BTreeMap<String, String> {
        let mut annotations = self.spec.agent.pod.annotations.clone();
        annotations.insert(CONFIG_HASH_ANNOTATION.to_string(), digest.to_string());
        annotations
    }
}

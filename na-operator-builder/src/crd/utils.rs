use kube::CustomResourceExt;

use crate::crd::v1::agent::NodeAgent;
use crate::error::Result;


/// Render the CRDs for the operator as a multi-document YAML stream
pub fn generate_crds() -> Result<String> {
    let mut out = String::new();

    for crd in [NodeAgent::crd()] {
        out.push_str("---\n");
        out.push_str(&serde_norway::to_string(&crd)?);
    }

    Ok(out)
}

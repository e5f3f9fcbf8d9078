use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

use na_operator_common::utils::compute_object_hash;

use crate::error::Result;

/// Digest of a configuration subtree, stamped on the pod template so that a
/// configuration-only change rolls the agent pods
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigDigest(String);

impl ConfigDigest {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ConfigDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigHasher;

impl ConfigHasher {
    /// Compute the digest of a configuration subtree
    ///
    /// # Arguments
    /// * `subtree` - The configuration to digest
    ///
    /// # Returns
    /// The digest, or `BuilderError::HashError` if the subtree has no JSON
    /// representation
    pub fn digest<T>(&self, subtree: &T) -> Result<ConfigDigest>
    where
        T: Serialize + ?Sized,
    {
        Ok(ConfigDigest(compute_object_hash(subtree)?))
    }
}

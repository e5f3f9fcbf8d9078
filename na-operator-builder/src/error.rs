// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use std::result;
use thiserror::Error;

use na_operator_common::utils::HashError;

/// Invariant violations of the builders.
///
/// A NodeAgent whose spec is merely incomplete yields `Synthesis::Absent`
/// instead of any of these.
#[derive(Error, Debug)]
pub enum BuilderError {
    #[error("missing object key: {0}")]
    MissingObjectKeyError(&'static str),
    #[error("failed to hash configuration: {0}")]
    HashError(#[from] HashError),
    #[error("environment variable `{0}` is emitted by more than one provider")]
    DuplicateEnvVar(&'static str),
    #[error("volume `{0}` is not registered")]
    UnregisteredVolume(String),
    #[error("volume `{0}` was requested but its source is not configured")]
    UnresolvedVolumeSource(&'static str),
    #[error("port `{0}` is not registered")]
    UnregisteredPort(String),
    #[error("failed to serialize manifest: {0}")]
    ManifestError(#[from] serde_norway::Error),
}

pub type Result<T> = result::Result<T, BuilderError>;

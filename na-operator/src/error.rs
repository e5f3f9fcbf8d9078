// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use std::{io, result};
use thiserror::Error;

use na_operator_builder::error::BuilderError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("failed to read {path}: {source}")]
    ReadError { path: String, source: io::Error },
    #[error("failed to parse NodeAgent manifest: {0}")]
    ManifestError(#[from] serde_yaml::Error),
    #[error("failed to encode DaemonSet as YAML: {0}")]
    YamlEncodeError(serde_yaml::Error),
    #[error("failed to encode DaemonSet as JSON: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error(transparent)]
    BuilderError(#[from] BuilderError),
}

pub type Result<T> = result::Result<T, CliError>;

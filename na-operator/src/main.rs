// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

mod cli;
mod error;

use std::{fs, io, process};
use clap::Parser;
use clap::CommandFactory;
use serde::de::DeserializeOwned;
use k8s_openapi::api::apps::v1::DaemonSet;

use na_operator_common::config::{AppConfig, AppConfigBuilder};
use na_operator_common::telemetry::{error, info, setup_logging};
use na_operator_builder::builder::{daemonset::synthesize, synthesis::Synthesis};
use na_operator_builder::crd::{v1::agent::NodeAgent, utils as crd_utils};

use crate::cli::{CliArgs, Commands, OutputFormat, RenderArgs};
use crate::error::{CliError, Result};

fn main() {
    let args = CliArgs::parse();

    setup_logging();

    match &args.cmd {
        Some(Commands::Crds) => {
            let crds = crd_utils::generate_crds().unwrap_or_else(|e| {
                error!(
                    event = "Error",
                    error = %e,
                );
                process::exit(1);
            });
            print!("{}", crds);
        },
        Some(Commands::Render(render_args)) => {
            // Load configuration
            let mut builder = AppConfigBuilder::default();
            if let Some(path) = &render_args.config {
                builder.with_file(path);
            }
            let config = builder
                .with_env()
                .with_override_option("builder.cluster_domain", render_args.cluster_domain.as_deref())
                .build()
                .unwrap_or_else(|e| {
                    error!(
                        event = "Error",
                        error = %e,
                    );
                    process::exit(1);
                });

            match render(render_args, &config) {
                Ok(Some(manifest)) => print!("{}", manifest),
                Ok(None) => {},
                Err(e) => {
                    error!(
                        event = "Error",
                        file = render_args.file.as_str(),
                        error = %e,
                    );
                    process::exit(1);
                },
            }
        },
        None => {
            let mut cmd = CliArgs::command();
            if let Err(e) = cmd.print_help() {
                error!(
                    event = "Error",
                    error = %e,
                );
            }
            process::exit(1);
        },
    }
}

/// Synthesize the DaemonSet of the NodeAgent manifest named by the arguments
///
/// # Returns
/// The encoded DaemonSet, or `None` if the NodeAgent does not yield one
fn render(args: &RenderArgs, config: &AppConfig) -> Result<Option<String>> {
    let agent: NodeAgent = read_manifest(&args.file)?;

    match synthesize(&agent, config)?.map(|daemonset| encode(&daemonset, args.output)) {
        Synthesis::Present(encoded) => {
            info!(
                event = "RenderedDaemonSet",
                agent = agent.metadata.name.as_deref().unwrap_or_default(),
            );
            encoded.map(Some)
        },
        Synthesis::Absent => Ok(None),
    }
}

fn encode(daemonset: &DaemonSet, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(daemonset).map_err(CliError::YamlEncodeError),
        OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(daemonset)?)),
    }
}

fn read_manifest<T: DeserializeOwned>(path: &str) -> Result<T> {
    let contents = match path {
        "-" => io::read_to_string(io::stdin()),
        _ => fs::read_to_string(path),
    }
    .map_err(|source| CliError::ReadError { path: path.to_string(), source })?;

    Ok(serde_yaml::from_str(&contents)?)
}

// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[
    clap(
        name = "node-agent-operator",
        version,
        author,
        about = "Operator for managing node agents"
    )
]
pub struct CliArgs {
    #[clap(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[
        clap(
            name = "crds",
            about = "Generate Custom Resource Definitions (CRDs) for the operator"
        )
    ]
    Crds,
    #[
        clap(
            name = "render",
            about = "Render the agent DaemonSet of a NodeAgent manifest"
        )
    ]
    Render(RenderArgs),
}

#[derive(clap::Args, Debug)]
pub struct RenderArgs {
    /// Path to the NodeAgent manifest, `-` reads from stdin
    #[clap(short, long)]
    pub file: String,
    /// Path to an operator configuration file (YAML or JSON)
    #[clap(short, long, env = "NODE_AGENT_OPERATOR_CONFIG")]
    pub config: Option<String>,
    /// Cluster DNS domain, overrides the configuration
    #[clap(long)]
    pub cluster_domain: Option<String>,
    #[clap(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub output: OutputFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Yaml,
    Json,
}

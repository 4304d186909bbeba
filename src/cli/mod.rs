// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for agentflow.

pub mod contracts;
pub mod graph;
pub mod run;
pub mod validate;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use crate::config::OrchestratorConfig;
use crate::pipeline::PipelineSpec;

/// Default pipeline file looked up in the working directory
pub const PIPELINE_FILE: &str = ".agentflow.pipeline.yaml";

/// Multi-step agent pipeline orchestrator
///
/// Validate, plan and run pipelines of capability steps.
#[derive(Parser, Debug)]
#[clap(
    name = "agentflow",
    version,
    about = "Wave-scheduled orchestrator for multi-step agent pipelines",
    long_about = None,
    after_help = "Examples:\n\
        agentflow validate pipeline.yaml       Check a pipeline submission\n\
        agentflow graph pipeline.yaml          Show the wave plan\n\
        agentflow run pipeline.yaml --simulate Run against simulated capabilities\n\
        agentflow contracts                    List capability contracts\n\n\
        See 'agentflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Configuration file (YAML or TOML)
    #[clap(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a pipeline
    Run {
        /// Pipeline file
        #[clap(default_value = PIPELINE_FILE)]
        pipeline: PathBuf,

        /// Use simulated capabilities instead of configured commands
        #[clap(long)]
        simulate: bool,

        /// Cancel the run after this many seconds
        #[clap(long, env = "AGENTFLOW_TIMEOUT", value_name = "SECS")]
        timeout: Option<u64>,

        /// Steps allowed to run at once
        #[clap(long, env = "AGENTFLOW_MAX_CONCURRENCY", value_name = "N")]
        max_concurrency: Option<usize>,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Validate a pipeline submission
    Validate {
        /// Pipeline file to validate
        #[clap(default_value = PIPELINE_FILE)]
        pipeline: PathBuf,
    },

    /// Show a pipeline's waves and dependencies
    Graph {
        /// Pipeline file
        #[clap(default_value = PIPELINE_FILE)]
        pipeline: PathBuf,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = GraphFormat::Text)]
        format: GraphFormat,
    },

    /// List capability contracts
    Contracts {
        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// Output format for run and contracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

/// Load configuration from `--config` or the usual locations
pub fn load_config(explicit: Option<&Path>) -> miette::Result<OrchestratorConfig> {
    let cwd = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
    Ok(OrchestratorConfig::discover(explicit, &cwd)?)
}

/// Load a pipeline submission
pub fn load_pipeline(path: &Path) -> miette::Result<PipelineSpec> {
    Ok(PipelineSpec::from_file(path)?)
}

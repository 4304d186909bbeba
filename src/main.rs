// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! agentflow - Multi-step Agent Pipeline Orchestrator
//!
//! Validate, plan and run pipelines of capability steps.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agentflow::cli::run::RunOptions;
use agentflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "agentflow=debug"
    } else {
        "agentflow=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Run {
            pipeline,
            simulate,
            timeout,
            max_concurrency,
            format,
        } => {
            agentflow::cli::run::run(RunOptions {
                pipeline,
                simulate,
                timeout,
                max_concurrency,
                format,
                config: cli.config,
                verbose: cli.verbose,
            })
            .await
        }
        Commands::Validate { pipeline } => {
            agentflow::cli::validate::run(pipeline, cli.config, cli.verbose).await
        }
        Commands::Graph { pipeline, format } => {
            agentflow::cli::graph::run(pipeline, format, cli.config, cli.verbose).await
        }
        Commands::Contracts { format } => {
            agentflow::cli::contracts::run(format, cli.verbose).await
        }
    }
}

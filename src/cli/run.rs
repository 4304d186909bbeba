// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! Run command - execute a pipeline

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use super::OutputFormat;
use crate::capabilities::{create_command_capabilities, create_simulated_capabilities};
use crate::errors::PipelineError;
use crate::pipeline::{PipelineExecutor, PipelineResult, StepStatus};
use crate::utils::{create_spinner, print_header, print_warning, status_symbol};

/// Options of the run command
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub pipeline: PathBuf,
    pub simulate: bool,
    pub timeout: Option<u64>,
    pub max_concurrency: Option<usize>,
    pub format: OutputFormat,
    pub config: Option<PathBuf>,
    pub verbose: bool,
}

/// Run the pipeline
pub async fn run(options: RunOptions) -> Result<()> {
    let mut config = super::load_config(options.config.as_deref())?;
    if let Some(secs) = options.timeout {
        config.run_timeout = Some(secs);
    }
    if let Some(limit) = options.max_concurrency {
        config.max_concurrency = limit;
    }
    config.validate()?;

    let spec = super::load_pipeline(&options.pipeline)?;

    let registry = if options.simulate {
        create_simulated_capabilities()
    } else {
        create_command_capabilities(&config)
    };
    let executor = PipelineExecutor::new(registry).with_config(config);

    let plan = executor.plan(&spec)?;
    executor.check_registered(&plan)?;

    if !options.simulate {
        let unavailable = executor.registry().unavailable().await;
        if !unavailable.is_empty() {
            let names: Vec<_> = unavailable.iter().map(|k| k.as_str()).collect();
            return Err(miette::miette!(
                "Capabilities unavailable: {}\n\nCheck the configured commands or run with --simulate.",
                names.join(", ")
            ));
        }
    }

    let text = options.format == OutputFormat::Text;
    if text {
        println!();
        print_header(&format!("Pipeline: {}", spec.display_name()));
        println!(
            "Execution plan ({} step{}, {} wave{}):",
            plan.steps.len(),
            if plan.steps.len() == 1 { "" } else { "s" },
            plan.waves.total_waves(),
            if plan.waves.total_waves() == 1 { "" } else { "s" }
        );
        print!("{}", plan.waves.to_text(&plan.dag));
        for warning in &plan.warnings {
            print_warning(warning);
        }
        println!();
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling run");
            on_interrupt.cancel();
        }
    });

    let spinner = text.then(|| create_spinner("Running pipeline..."));
    let outcome = executor.execute_plan(&plan, cancel).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let result = outcome?;

    match options.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result).map_err(PipelineError::from)?;
            println!("{}", json);
        }
        OutputFormat::Text => print_report(&result, options.verbose),
    }

    if result.cancelled {
        return Err(miette::miette!("Pipeline was cancelled"));
    }
    if !result.success {
        return Err(miette::miette!(
            "Pipeline failed: {} of {} steps failed",
            result.count(StepStatus::Failed),
            result.steps.len()
        ));
    }

    Ok(())
}

fn print_report(result: &PipelineResult, verbose: bool) {
    for step in &result.steps {
        let line = format!(
            "[{}] {} ({:.2}s)",
            step.index,
            step.capability,
            step.duration.as_secs_f64()
        );

        match step.status {
            StepStatus::Completed => {
                println!("  {} {}", status_symbol(step.status), line.bold());
                if let Some(summary) = &step.summary {
                    println!("      {}", summary.dimmed());
                }
            }
            StepStatus::Failed => {
                println!("  {} {}", status_symbol(step.status), line.bold());
                if let Some(error) = &step.error {
                    println!("      {}", error.red());
                }
            }
            _ => {
                let reason = step.error.as_deref().unwrap_or(step.status.as_str());
                println!(
                    "  {} {} {}",
                    status_symbol(step.status),
                    line.dimmed(),
                    format!("({})", reason).dimmed()
                );
            }
        }

        if verbose {
            for value in &step.outputs {
                println!(
                    "      {} {}: {}",
                    "→".blue(),
                    value.name,
                    value.payload.describe()
                );
            }
        }
    }

    println!();
    let elapsed = result.total_duration.as_secs_f64();
    let waves = format!(
        "{} wave{}, {} tokens",
        result.total_waves,
        if result.total_waves == 1 { "" } else { "s" },
        result.token_usage.total()
    );

    if result.cancelled {
        println!(
            "{} {}",
            format!("Pipeline cancelled after {:.2}s", elapsed).yellow(),
            format!("({})", waves).dimmed()
        );
    } else if result.success {
        println!(
            "{} {}",
            format!("Pipeline completed successfully in {:.2}s", elapsed).green(),
            format!("({})", waves).dimmed()
        );
    } else {
        println!(
            "{} {}",
            format!("Pipeline failed after {:.2}s", elapsed).red(),
            format!("({})", waves).dimmed()
        );
    }

    if !result.errors.is_empty() {
        println!();
        println!("{}:", "Errors".red().bold());
        for error in &result.errors {
            println!("  {} {}", "✗".red(), error);
        }
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! Validate command - check a pipeline submission

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::capabilities::create_simulated_capabilities;
use crate::errors::PipelineError;
use crate::pipeline::PipelineExecutor;
use crate::utils::{print_error, print_success, print_warning};

/// Run the validate command
pub async fn run(pipeline_path: PathBuf, config: Option<PathBuf>, verbose: bool) -> Result<()> {
    println!("{}", "Validating pipeline...".bold());
    println!();

    let config = super::load_config(config.as_deref())?;

    let spec = match super::load_pipeline(&pipeline_path) {
        Ok(spec) => spec,
        Err(e) => {
            print_error("Failed to load pipeline");
            println!();
            return Err(e);
        }
    };
    print_success("Pipeline file is valid YAML");

    // Planning never invokes a capability
    let executor = PipelineExecutor::new(create_simulated_capabilities()).with_config(config);

    let plan = match executor.plan(&spec) {
        Ok(plan) => plan,
        Err(PipelineError::Validation { issues }) => {
            println!();
            println!("{}:", "Errors".red().bold());
            for issue in &issues {
                print_error(&issue.to_string());
            }
            println!();
            return Err(miette::miette!(
                "Pipeline validation failed with {} issue{}",
                issues.len(),
                if issues.len() == 1 { "" } else { "s" }
            ));
        }
        Err(e) => {
            print_error("Dependency graph could not be built");
            println!();
            return Err(e.into());
        }
    };

    print_success(&format!("{} steps validated", plan.steps.len()));
    print_success(&format!(
        "Dependencies resolved into {} wave{}",
        plan.waves.total_waves(),
        if plan.waves.total_waves() == 1 { "" } else { "s" }
    ));

    if !plan.warnings.is_empty() {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &plan.warnings {
            print_warning(warning);
        }
    }

    if verbose {
        println!();
        println!("{}:", "Pipeline summary".bold());
        println!("  Name: {}", spec.display_name());
        println!("  Steps: {}", plan.steps.len());
        for step in &plan.steps {
            let deps = plan.dag.dependencies(step.index);
            let wiring = if step.is_auto_wired() { "auto" } else { "explicit" };
            let deps = if deps.is_empty() {
                String::new()
            } else {
                let deps: Vec<String> = deps.iter().map(ToString::to_string).collect();
                format!(" [after {} ({})]", deps.join(", "), wiring)
            };
            println!("    {}. {}: {}{}", step.index, step.capability, step.intent, deps.dimmed());
        }
    }

    println!();
    if plan.warnings.is_empty() {
        println!("{}", "Pipeline is valid!".green().bold());
    } else {
        println!("{}", "Pipeline is valid but has warnings.".yellow().bold());
    }

    Ok(())
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! Contracts command - list what each capability consumes and produces

use colored::Colorize;
use miette::Result;

use super::OutputFormat;
use crate::capabilities::{CapabilityContract, ContractSet};
use crate::errors::PipelineError;
use crate::utils::{code, print_section};

/// Run the contracts command
pub async fn run(format: OutputFormat, verbose: bool) -> Result<()> {
    let contracts = ContractSet::builtin();

    match format {
        OutputFormat::Json => {
            let all: Vec<&CapabilityContract> = contracts.iter().collect();
            let json = serde_json::to_string_pretty(&all).map_err(PipelineError::from)?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            for contract in contracts.iter() {
                print_contract(contract, verbose);
            }
        }
    }

    Ok(())
}

fn print_contract(contract: &CapabilityContract, verbose: bool) {
    print_section(contract.kind.as_str());
    println!("  {}", contract.description.dimmed());

    if contract.inputs.is_empty() {
        println!("  inputs:  {}", "none".dimmed());
    } else {
        let inputs: Vec<String> = contract
            .inputs
            .iter()
            .map(|i| {
                let slot = format!("{}: {}", i.name, i.data_type);
                if i.required {
                    slot
                } else {
                    format!("{} (optional)", slot)
                }
            })
            .collect();
        println!("  inputs:  {}", inputs.join(", "));
    }

    let outputs: Vec<String> = contract
        .outputs
        .iter()
        .map(|o| format!("{}: {}", o.name, o.data_type))
        .collect();
    println!("  outputs: {}", outputs.join(", "));
    println!(
        "  timeout: {}s",
        contract.kind.class().default_timeout().as_secs()
    );

    if verbose {
        for intent in &contract.example_intents {
            println!("  e.g.     {}", code(intent));
        }
        if !contract.can_chain_with.is_empty() {
            let chains: Vec<&str> = contract.can_chain_with.iter().map(|k| k.as_str()).collect();
            println!("  chains:  {}", chains.join(", "));
        }
    }
}

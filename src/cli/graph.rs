// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! Graph command - show a pipeline's waves and dependencies

use miette::Result;
use std::path::PathBuf;

use super::GraphFormat;
use crate::capabilities::create_simulated_capabilities;
use crate::pipeline::PipelineExecutor;

/// Run the graph command
pub async fn run(
    pipeline_path: PathBuf,
    format: GraphFormat,
    config: Option<PathBuf>,
    _verbose: bool,
) -> Result<()> {
    let config = super::load_config(config.as_deref())?;
    let spec = super::load_pipeline(&pipeline_path)?;

    let executor = PipelineExecutor::new(create_simulated_capabilities()).with_config(config);
    let plan = executor.plan(&spec)?;

    let output = match format {
        GraphFormat::Text => {
            let mut out = plan.waves.to_text(&plan.dag);
            let edges = plan.dag.to_text();
            if !edges.is_empty() {
                out.push_str("\nedges:\n");
                out.push_str(&edges);
            }
            out
        }
        GraphFormat::Dot => plan.dag.to_dot(),
        GraphFormat::Mermaid => plan.dag.to_mermaid(),
    };

    print!("{}", output);

    Ok(())
}

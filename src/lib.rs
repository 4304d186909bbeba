// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! # agentflow - Multi-step Agent Pipeline Orchestrator
//!
//! `agentflow` runs declarative lists of capability steps (search, analysis,
//! synthesis, organization) as a dependency graph, one wave at a time.
//!
//! ## Features
//!
//! - **Typed data flow** - Steps are wired by the data types their contracts
//!   declare, or by explicit `depends_on` lists
//! - **Wave scheduling** - Independent steps run concurrently, bounded by a
//!   concurrency limit
//! - **Failure isolation** - A failing step only skips its dependents
//! - **Cancellation** - Runs stop cleanly on a signal or run timeout
//!
//! ## Quick Start
//!
//! ```bash
//! # Show the wave plan
//! agentflow graph pipeline.yaml
//!
//! # Run against simulated capabilities
//! agentflow run pipeline.yaml --simulate
//!
//! # List capability contracts
//! agentflow contracts
//! ```

pub mod capabilities;
pub mod cli;
pub mod config;
pub mod errors;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types
pub use capabilities::{
    create_command_capabilities, create_simulated_capabilities, Capability, CapabilityKind,
    CapabilityRegistry,
};
pub use config::OrchestratorConfig;
pub use errors::{AgentflowResult, CapabilityError, FailureReason, PipelineError};
pub use pipeline::{Pipeline, PipelineExecutor, PipelineResult, PipelineSpec, StepSpec, StepStatus};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! Pipelines
//!
//! Submission types, validation, the dependency graph and its wave plan,
//! output merging, execution and run results.

mod builder;
mod dag;
mod definition;
mod executor;
mod merger;
mod result;
mod scheduler;
mod validation;
mod values;

pub use builder::Pipeline;
pub use dag::{DependencyEdge, DependencyGraph, EdgeKind};
pub use definition::*;
pub use executor::{ExecutionPlan, PipelineExecutor};
pub use merger::{InputPool, MergeOutcome, OutputMerger};
pub use result::{PipelineResult, RunAggregator, StepResult, StepStatus};
pub use scheduler::WavePlan;
pub use validation::PipelineValidator;
pub use values::{DataType, Payload, PayloadKind, TypedValue};

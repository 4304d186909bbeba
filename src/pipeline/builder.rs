// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! Fluent pipeline builder
//!
//! ```no_run
//! # async fn demo() -> Result<(), agentflow::PipelineError> {
//! use agentflow::{create_simulated_capabilities, Pipeline, PipelineExecutor};
//!
//! let executor = PipelineExecutor::new(create_simulated_capabilities());
//! let result = Pipeline::named("poles")
//!     .search_images("utility poles")
//!     .search_documents("maintenance records")
//!     .assistant("summarize findings", Some(&[0, 1]))
//!     .run(&executor)
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::capabilities::CapabilityKind;
use crate::errors::PipelineError;
use crate::pipeline::{PipelineExecutor, PipelineResult, PipelineSpec, StepSpec};

/// Builder for [`PipelineSpec`]
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    spec: PipelineSpec,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        let mut pipeline = Self::new();
        pipeline.spec.name = Some(name.into());
        pipeline
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = Some(description.into());
        self
    }

    /// Seed image ids for steps with no image producer
    pub fn with_images<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.seeds.image_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Seed document ids for steps with no document producer
    pub fn with_documents<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.seeds.document_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Append a step; `depends_on` of `None` means auto-wired
    pub fn step(
        mut self,
        capability: CapabilityKind,
        intent: impl Into<String>,
        depends_on: Option<&[usize]>,
    ) -> Self {
        let mut step = StepSpec::new(capability.as_str(), intent);
        if let Some(deps) = depends_on {
            step = step.depends_on(deps.iter().copied());
        }
        self.spec.steps.push(step);
        self
    }

    pub fn search_images(self, intent: impl Into<String>) -> Self {
        self.step(CapabilityKind::ImageSearch, intent, None)
    }

    pub fn search_documents(self, intent: impl Into<String>) -> Self {
        self.step(CapabilityKind::DocumentSearch, intent, None)
    }

    pub fn search_links(self, intent: impl Into<String>) -> Self {
        self.step(CapabilityKind::LinkSearch, intent, None)
    }

    pub fn analyze(self, intent: impl Into<String>, depends_on: Option<&[usize]>) -> Self {
        self.step(CapabilityKind::ImageAnalysis, intent, depends_on)
    }

    pub fn analyze_documents(self, intent: impl Into<String>, depends_on: Option<&[usize]>) -> Self {
        self.step(CapabilityKind::DocumentAnalysis, intent, depends_on)
    }

    pub fn analyze_links(self, intent: impl Into<String>, depends_on: Option<&[usize]>) -> Self {
        self.step(CapabilityKind::LinkAnalysis, intent, depends_on)
    }

    pub fn synthesize(self, intent: impl Into<String>, depends_on: Option<&[usize]>) -> Self {
        self.step(CapabilityKind::Synthesis, intent, depends_on)
    }

    pub fn organize(self, intent: impl Into<String>, depends_on: Option<&[usize]>) -> Self {
        self.step(CapabilityKind::Folder, intent, depends_on)
    }

    pub fn cross_reference(self, intent: impl Into<String>, depends_on: Option<&[usize]>) -> Self {
        self.step(CapabilityKind::CrossReference, intent, depends_on)
    }

    pub fn assistant(self, intent: impl Into<String>, depends_on: Option<&[usize]>) -> Self {
        self.step(CapabilityKind::Assistant, intent, depends_on)
    }

    pub fn len(&self) -> usize {
        self.spec.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spec.steps.is_empty()
    }

    pub fn build(self) -> PipelineSpec {
        self.spec
    }

    /// Build and run on `executor`
    pub async fn run(self, executor: &PipelineExecutor) -> Result<PipelineResult, PipelineError> {
        executor.run(&self.spec).await
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! Run results
//!
//! The aggregator is the only writer of the step result table during a run.
//! Terminal statuses never change once reached.

use serde::{Serialize, Serializer};
use std::fmt;
use std::time::{Duration, Instant};

use crate::capabilities::{CapabilityKind, CapabilityOutput, TokenUsage};
use crate::errors::{CapabilityError, FailureReason};
use crate::pipeline::{StepDescriptor, TypedValue};

/// Lifecycle of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
    Cancelled,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Skipped | Self::Cancelled
        )
    }

    /// Whether a step in this status should block its dependents
    pub fn blocks_dependents(&self) -> bool {
        matches!(self, Self::Failed | Self::Skipped | Self::Cancelled)
    }

    fn can_become(&self, next: StepStatus) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Running | Self::Skipped | Self::Cancelled),
            Self::Running => matches!(next, Self::Completed | Self::Failed | Self::Cancelled),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Outcome of a single step
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub index: usize,
    pub capability: CapabilityKind,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub outputs: Vec<TypedValue>,
    /// Present iff the step failed, was skipped or was cancelled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
}

impl StepResult {
    fn pending(step: &StepDescriptor) -> Self {
        Self {
            index: step.index,
            capability: step.capability,
            status: StepStatus::Pending,
            summary: None,
            outputs: Vec::new(),
            error: None,
            failure: None,
            duration: Duration::ZERO,
            token_usage: None,
        }
    }

    /// Output value by name
    pub fn output(&self, name: &str) -> Option<&TypedValue> {
        self.outputs.iter().find(|v| v.name == name)
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// One entry per submitted step, in index order
    pub steps: Vec<StepResult>,
    #[serde(rename = "total_duration_ms", serialize_with = "as_millis")]
    pub total_duration: Duration,
    /// Waves actually started
    pub total_waves: usize,
    /// `step <i> (<capability>): <error>` for every unsuccessful step
    pub errors: Vec<String>,
    /// No step failed
    pub success: bool,
    /// The run was cancelled or hit its deadline
    pub cancelled: bool,
    pub token_usage: TokenUsage,
    /// Indices of the steps in the last planned wave
    pub final_wave: Vec<usize>,
}

impl PipelineResult {
    pub fn step(&self, index: usize) -> Option<&StepResult> {
        self.steps.get(index)
    }

    /// Results of the last planned wave
    pub fn final_results(&self) -> Vec<&StepResult> {
        self.final_wave
            .iter()
            .filter_map(|&i| self.steps.get(i))
            .collect()
    }

    /// Result of the last submitted step
    pub fn final_step(&self) -> Option<&StepResult> {
        self.steps.last()
    }

    pub fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }
}

/// Owner of the step result table for one run
#[derive(Debug)]
pub struct RunAggregator {
    steps: Vec<StepResult>,
    started: Instant,
    waves_started: usize,
    cancelled: bool,
}

impl RunAggregator {
    /// Every step starts out pending
    pub fn new(steps: &[StepDescriptor]) -> Self {
        Self {
            steps: steps.iter().map(StepResult::pending).collect(),
            started: Instant::now(),
            waves_started: 0,
            cancelled: false,
        }
    }

    pub fn status(&self, index: usize) -> Option<StepStatus> {
        self.steps.get(index).map(|s| s.status)
    }

    pub fn wave_started(&mut self) {
        self.waves_started += 1;
    }

    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    fn transition(&mut self, index: usize, next: StepStatus) -> Option<&mut StepResult> {
        let Some(step) = self.steps.get_mut(index) else {
            tracing::warn!(step = index, "status update for unknown step ignored");
            return None;
        };
        if !step.status.can_become(next) {
            tracing::warn!(
                step = index,
                from = %step.status,
                to = %next,
                "invalid status transition ignored"
            );
            return None;
        }
        step.status = next;
        Some(step)
    }

    /// `pending -> running`
    pub fn start(&mut self, index: usize) -> bool {
        self.transition(index, StepStatus::Running).is_some()
    }

    /// `running -> completed`
    pub fn complete(&mut self, index: usize, output: &CapabilityOutput, duration: Duration) {
        if let Some(step) = self.transition(index, StepStatus::Completed) {
            step.outputs = output.values.clone();
            step.summary = output.summary.clone();
            step.token_usage = output.token_usage;
            step.duration = duration;
        }
    }

    /// `running -> failed`, or `running -> cancelled` for a cancelled invocation
    pub fn fail(&mut self, index: usize, error: &CapabilityError, duration: Duration) {
        let next = match error.reason() {
            Some(_) => StepStatus::Failed,
            None => StepStatus::Cancelled,
        };
        if let Some(step) = self.transition(index, next) {
            step.error = Some(error.to_string());
            step.failure = error.reason();
            step.duration = duration;
        }
    }

    /// `pending -> skipped`
    pub fn skip(&mut self, index: usize, failed_dependency: usize) {
        if let Some(step) = self.transition(index, StepStatus::Skipped) {
            step.error = Some(format!("dependency failed: step {}", failed_dependency));
        }
    }

    /// `pending -> cancelled` for steps never started
    pub fn cancel_pending(&mut self, index: usize) {
        if let Some(step) = self.transition(index, StepStatus::Cancelled) {
            step.error = Some("pipeline cancelled".to_string());
        }
    }

    /// Close the table and build the run result
    pub fn finish(mut self, final_wave: &[usize]) -> PipelineResult {
        let unfinished: Vec<usize> = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Pending)
            .map(|s| s.index)
            .collect();
        for index in unfinished {
            self.cancel_pending(index);
        }

        let mut token_usage = TokenUsage::default();
        let mut errors = Vec::new();
        for step in &self.steps {
            if let Some(usage) = &step.token_usage {
                token_usage.add(usage);
            }
            if let Some(error) = &step.error {
                errors.push(format!("step {} ({}): {}", step.index, step.capability, error));
            }
        }

        let success = !self.steps.iter().any(|s| s.status == StepStatus::Failed);
        let cancelled = self.cancelled || self.steps.iter().any(|s| s.status == StepStatus::Cancelled);

        PipelineResult {
            steps: self.steps,
            total_duration: self.started.elapsed(),
            total_waves: self.waves_started,
            errors,
            success,
            cancelled,
            token_usage,
            final_wave: final_wave.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use crate::pipeline::SeedInputs;

    fn descriptors(kinds: &[CapabilityKind]) -> Vec<StepDescriptor> {
        kinds
            .iter()
            .enumerate()
            .map(|(index, &capability)| StepDescriptor {
                index,
                capability,
                intent: "test".to_string(),
                explicit_dependencies: Some(BTreeSet::new()),
                seed_inputs: SeedInputs::default(),
            })
            .collect()
    }

    #[test]
    fn test_terminal_status_is_immutable() {
        let mut aggregator = RunAggregator::new(&descriptors(&[CapabilityKind::ImageSearch]));

        assert!(aggregator.start(0));
        aggregator.fail(0, &CapabilityError::invocation("boom"), Duration::ZERO);
        aggregator.complete(0, &CapabilityOutput::default(), Duration::ZERO);

        assert_eq!(aggregator.status(0), Some(StepStatus::Failed));
        assert!(!aggregator.start(0));
    }

    #[test]
    fn test_cannot_complete_without_running() {
        let mut aggregator = RunAggregator::new(&descriptors(&[CapabilityKind::ImageSearch]));
        aggregator.complete(0, &CapabilityOutput::default(), Duration::ZERO);
        assert_eq!(aggregator.status(0), Some(StepStatus::Pending));
    }

    #[test]
    fn test_cancelled_invocation_is_not_a_failure() {
        let mut aggregator = RunAggregator::new(&descriptors(&[CapabilityKind::ImageSearch]));
        aggregator.start(0);
        aggregator.fail(0, &CapabilityError::Cancelled, Duration::ZERO);

        let result = aggregator.finish(&[0]);
        assert_eq!(result.steps[0].status, StepStatus::Cancelled);
        assert_eq!(result.steps[0].failure, None);
        assert!(result.success);
        assert!(result.cancelled);
    }

    #[test]
    fn test_errors_flattened_in_index_order() {
        let mut aggregator = RunAggregator::new(&descriptors(&[
            CapabilityKind::ImageSearch,
            CapabilityKind::DocumentSearch,
            CapabilityKind::Folder,
        ]));
        aggregator.start(1);
        aggregator.fail(1, &CapabilityError::Timeout(Duration::from_secs(30)), Duration::ZERO);
        aggregator.start(0);
        aggregator.complete(0, &CapabilityOutput::default(), Duration::ZERO);
        aggregator.skip(2, 1);

        let result = aggregator.finish(&[2]);

        assert!(!result.success);
        assert_eq!(result.steps[1].failure, Some(FailureReason::Timeout));
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].starts_with("step 1 (document_search): timeout"));
        assert_eq!(result.errors[1], "step 2 (folder): dependency failed: step 1");
        assert_eq!(result.final_results()[0].status, StepStatus::Skipped);
    }

    #[test]
    fn test_unstarted_steps_cancelled_on_finish() {
        let mut aggregator = RunAggregator::new(&descriptors(&[
            CapabilityKind::ImageSearch,
            CapabilityKind::ImageAnalysis,
        ]));
        aggregator.wave_started();
        aggregator.start(0);
        aggregator.complete(0, &CapabilityOutput::default(), Duration::ZERO);
        aggregator.mark_cancelled();

        let result = aggregator.finish(&[1]);

        assert_eq!(result.total_waves, 1);
        assert_eq!(result.steps[1].status, StepStatus::Cancelled);
        assert_eq!(result.steps[1].error.as_deref(), Some("pipeline cancelled"));
        assert!(result.cancelled);
        assert!(result.steps.iter().all(|s| s.status.is_terminal()));
    }

    #[test]
    fn test_token_usage_aggregated() {
        let mut aggregator = RunAggregator::new(&descriptors(&[
            CapabilityKind::ImageSearch,
            CapabilityKind::DocumentSearch,
        ]));
        for i in 0..2 {
            aggregator.start(i);
            let output = CapabilityOutput {
                token_usage: Some(TokenUsage { input_tokens: 10, output_tokens: 5 }),
                ..Default::default()
            };
            aggregator.complete(i, &output, Duration::ZERO);
        }

        let result = aggregator.finish(&[0, 1]);
        assert_eq!(result.token_usage.total(), 30);
        assert_eq!(result.count(StepStatus::Completed), 2);
    }
}

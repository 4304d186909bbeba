// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! Pipeline executor
//!
//! Runs validated pipelines wave by wave. Steps of a wave run concurrently,
//! each under its own timeout; the wave ends only once every step has
//! settled, then completed outputs are merged forward.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::capabilities::{CapabilityOutput, CapabilityRegistry, CapabilityRequest, ContractSet};
use crate::config::OrchestratorConfig;
use crate::errors::{CapabilityError, PipelineError};
use crate::pipeline::{
    DependencyGraph, OutputMerger, PipelineResult, PipelineSpec, PipelineValidator,
    RunAggregator, SeedInputs, StepDescriptor, StepStatus, TypedValue, WavePlan,
};

/// Everything decided before the first capability is invoked
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub name: String,
    pub steps: Vec<StepDescriptor>,
    pub seeds: SeedInputs,
    pub dag: DependencyGraph,
    pub waves: WavePlan,
    /// Non-fatal observations about the submission
    pub warnings: Vec<String>,
}

type TaskOutcome = (usize, Result<CapabilityOutput, CapabilityError>, Duration);

/// Pipeline executor
pub struct PipelineExecutor {
    registry: CapabilityRegistry,
    contracts: ContractSet,
    config: OrchestratorConfig,
}

impl PipelineExecutor {
    /// Create an executor with built-in contracts and default configuration
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self {
            registry,
            contracts: ContractSet::builtin(),
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_contracts(mut self, contracts: ContractSet) -> Self {
        self.contracts = contracts;
        self
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn contracts(&self) -> &ContractSet {
        &self.contracts
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Validate a submission, build its graph and lay out its waves
    pub fn plan(&self, spec: &PipelineSpec) -> Result<ExecutionPlan, PipelineError> {
        let steps = PipelineValidator::validate(spec, &self.config)?;
        let dag = DependencyGraph::build(&steps, &self.contracts, &spec.seeds)?;
        let waves = WavePlan::compute(&dag)?;
        let warnings = PipelineValidator::warnings(&steps, &self.contracts);

        Ok(ExecutionPlan {
            name: spec.display_name().to_string(),
            steps,
            seeds: spec.seeds.clone(),
            dag,
            waves,
            warnings,
        })
    }

    /// Every capability the plan uses must have an implementation
    pub fn check_registered(&self, plan: &ExecutionPlan) -> Result<(), PipelineError> {
        let missing: BTreeSet<_> = plan
            .steps
            .iter()
            .map(|s| s.capability)
            .filter(|kind| !self.registry.contains(*kind))
            .collect();

        match missing.into_iter().next() {
            Some(capability) => Err(PipelineError::CapabilityNotRegistered { capability }),
            None => Ok(()),
        }
    }

    /// Run a pipeline to completion
    pub async fn run(&self, spec: &PipelineSpec) -> Result<PipelineResult, PipelineError> {
        self.execute(spec, CancellationToken::new()).await
    }

    /// Run a pipeline until it completes or `cancel` fires
    ///
    /// Structural problems are returned as errors before anything runs.
    /// Once execution starts, every step outcome lands in the result.
    pub async fn execute(
        &self,
        spec: &PipelineSpec,
        cancel: CancellationToken,
    ) -> Result<PipelineResult, PipelineError> {
        let plan = self.plan(spec)?;
        self.execute_plan(&plan, cancel).await
    }

    /// Run a plan produced by [`plan`](Self::plan)
    pub async fn execute_plan(
        &self,
        plan: &ExecutionPlan,
        cancel: CancellationToken,
    ) -> Result<PipelineResult, PipelineError> {
        self.check_registered(plan)?;

        for warning in &plan.warnings {
            tracing::warn!("{}", warning);
        }

        let span = tracing::info_span!(
            "run",
            pipeline = %plan.name,
            steps = plan.steps.len(),
            waves = plan.waves.total_waves()
        );

        self.run_waves(plan, cancel).instrument(span).await
    }

    async fn run_waves(
        &self,
        plan: &ExecutionPlan,
        cancel: CancellationToken,
    ) -> Result<PipelineResult, PipelineError> {
        let run_token = cancel.child_token();
        let deadline = self.config.run_timeout().map(|limit| {
            let token = run_token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                tracing::warn!(timeout_secs = limit.as_secs(), "run timeout reached, cancelling");
                token.cancel();
            })
        });

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut merger = OutputMerger::new(&plan.dag, &self.contracts, &plan.seeds);
        let mut aggregator = RunAggregator::new(&plan.steps);

        tracing::info!("starting pipeline");

        for (n, wave) in plan.waves.waves().iter().enumerate() {
            if run_token.is_cancelled() {
                tracing::info!(wave = n + 1, "pipeline cancelled before wave");
                aggregator.mark_cancelled();
                break;
            }

            aggregator.wave_started();
            let span = tracing::info_span!("wave", wave = n + 1, steps = wave.len());
            let completed = self
                .run_wave(wave, &plan.dag, &merger, &mut aggregator, &semaphore, &run_token)
                .instrument(span)
                .await;

            merger.merge_wave(completed, &plan.dag, &self.contracts);
        }

        // Cancellation after the last wave settled leaves the run complete
        if let Some(handle) = deadline {
            handle.abort();
        }

        let result = aggregator.finish(plan.waves.final_wave());
        tracing::info!(
            success = result.success,
            cancelled = result.cancelled,
            waves = result.total_waves,
            duration_ms = result.total_duration.as_millis() as u64,
            "pipeline finished"
        );

        Ok(result)
    }

    /// Run one wave and return the outputs of its completed steps
    async fn run_wave(
        &self,
        wave: &[usize],
        dag: &DependencyGraph,
        merger: &OutputMerger,
        aggregator: &mut RunAggregator,
        semaphore: &Arc<Semaphore>,
        cancel: &CancellationToken,
    ) -> Vec<(usize, Vec<TypedValue>)> {
        let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();
        let mut spawned = Vec::new();

        for &index in wave {
            let Some(step) = dag.step(index) else { continue };

            let blocked_by = dag.dependencies(index).into_iter().find(|&dep| {
                aggregator
                    .status(dep)
                    .is_some_and(|status| status.blocks_dependents())
            });
            if let Some(dep) = blocked_by {
                tracing::info!(step = index, dependency = dep, "skipping step");
                aggregator.skip(index, dep);
                continue;
            }

            let Some(capability) = self.registry.get(step.capability) else {
                aggregator.start(index);
                aggregator.fail(
                    index,
                    &CapabilityError::invocation(format!("no capability registered for {}", step.capability)),
                    Duration::ZERO,
                );
                continue;
            };

            let request = CapabilityRequest {
                step: index,
                capability: step.capability,
                intent: step.intent.clone(),
                inputs: merger.snapshot(index),
            };
            let contract = self.contracts.get(step.capability).clone();
            let limit = self.config.step_timeout(step.capability);
            let semaphore = Arc::clone(semaphore);
            let cancel = cancel.clone();

            aggregator.start(index);
            spawned.push(index);

            let span = tracing::debug_span!("step", step = index, capability = %step.capability);
            tasks.spawn(
                async move {
                    let _permit = tokio::select! {
                        _ = cancel.cancelled() => {
                            return (index, Err(CapabilityError::Cancelled), Duration::ZERO);
                        }
                        permit = semaphore.acquire_owned() => permit.ok(),
                    };

                    tracing::debug!(inputs = request.inputs.len(), "invoking capability");
                    let started = Instant::now();
                    let invocation = capability.invoke(request, cancel.clone());

                    let outcome = tokio::select! {
                        _ = cancel.cancelled() => Err(CapabilityError::Cancelled),
                        result = tokio::time::timeout(limit, invocation) => match result {
                            Ok(Ok(output)) => output.conform_to(&contract),
                            Ok(Err(e)) => Err(e),
                            Err(_) => Err(CapabilityError::Timeout(limit)),
                        },
                    };

                    (index, outcome, started.elapsed())
                }
                .instrument(span),
            );
        }

        let mut completed = Vec::new();
        let mut settled = BTreeSet::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(output), elapsed)) => {
                    tracing::info!(
                        step = index,
                        duration_ms = elapsed.as_millis() as u64,
                        outputs = output.values.len(),
                        "step completed"
                    );
                    aggregator.complete(index, &output, elapsed);
                    completed.push((index, output.values));
                    settled.insert(index);
                }
                Ok((index, Err(error), elapsed)) => {
                    match error.reason() {
                        Some(reason) => tracing::warn!(step = index, %reason, %error, "step failed"),
                        None => tracing::info!(step = index, "step cancelled"),
                    }
                    aggregator.fail(index, &error, elapsed);
                    settled.insert(index);
                }
                Err(e) => {
                    tracing::error!(error = %e, "capability task did not finish");
                }
            }
        }

        // A task that panicked never reported back
        for index in spawned {
            if !settled.contains(&index) && aggregator.status(index) == Some(StepStatus::Running) {
                aggregator.fail(
                    index,
                    &CapabilityError::invocation("capability panicked"),
                    Duration::ZERO,
                );
            }
        }

        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::capabilities::{
        create_simulated_capabilities, Capability, CapabilityKind, SimulatedBehavior,
        SimulatedCapability,
    };
    use crate::errors::FailureReason;
    use crate::pipeline::{DataType, Payload, StepSpec};

    fn spec(steps: Vec<StepSpec>) -> PipelineSpec {
        PipelineSpec {
            steps,
            ..Default::default()
        }
    }

    fn simulated(kind: CapabilityKind) -> SimulatedCapability {
        SimulatedCapability::new(ContractSet::builtin().get(kind).clone())
    }

    fn registry_with(capability: impl Capability + 'static) -> CapabilityRegistry {
        create_simulated_capabilities().with(Arc::new(capability))
    }

    /// Records every request before delegating
    struct Recording {
        inner: SimulatedCapability,
        requests: Arc<Mutex<Vec<CapabilityRequest>>>,
    }

    #[async_trait]
    impl Capability for Recording {
        fn kind(&self) -> CapabilityKind {
            self.inner.kind()
        }

        async fn invoke(
            &self,
            request: CapabilityRequest,
            cancel: CancellationToken,
        ) -> Result<CapabilityOutput, CapabilityError> {
            self.requests.lock().unwrap().push(request.clone());
            self.inner.invoke(request, cancel).await
        }
    }

    struct Panicking;

    #[async_trait]
    impl Capability for Panicking {
        fn kind(&self) -> CapabilityKind {
            CapabilityKind::LinkSearch
        }

        async fn invoke(
            &self,
            _request: CapabilityRequest,
            _cancel: CancellationToken,
        ) -> Result<CapabilityOutput, CapabilityError> {
            panic!("capability blew up");
        }
    }

    /// Cancels `trigger` as soon as its own call has produced an output
    struct CancelsOnReturn {
        inner: SimulatedCapability,
        trigger: CancellationToken,
    }

    #[async_trait]
    impl Capability for CancelsOnReturn {
        fn kind(&self) -> CapabilityKind {
            self.inner.kind()
        }

        async fn invoke(
            &self,
            request: CapabilityRequest,
            cancel: CancellationToken,
        ) -> Result<CapabilityOutput, CapabilityError> {
            let output = self.inner.invoke(request, cancel).await;
            self.trigger.cancel();
            output
        }
    }

    /// Tracks the highest number of concurrent invocations
    struct Counting {
        kind: CapabilityKind,
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Capability for Counting {
        fn kind(&self) -> CapabilityKind {
            self.kind
        }

        async fn invoke(
            &self,
            request: CapabilityRequest,
            cancel: CancellationToken,
        ) -> Result<CapabilityOutput, CapabilityError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            simulated(self.kind).invoke(request, cancel).await
        }
    }

    #[tokio::test]
    async fn test_parallel_searches_feed_consumer() {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let executor = PipelineExecutor::new(registry_with(Recording {
            inner: simulated(CapabilityKind::Assistant),
            requests: Arc::clone(&requests),
        }));

        let result = executor
            .run(&spec(vec![
                StepSpec::new("image_search", "utility poles"),
                StepSpec::new("document_search", "maintenance records"),
                StepSpec::new("assistant", "combine").depends_on([0, 1]),
            ]))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.total_waves, 2);
        assert_eq!(result.final_wave, vec![2]);
        assert!(result.steps.iter().all(|s| s.status == StepStatus::Completed));

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let inputs = &requests[0].inputs;
        assert_eq!(
            inputs.get("image_ids").unwrap().payload.as_list().unwrap()[0],
            "img-utility-poles-1"
        );
        assert_eq!(
            inputs.get("document_ids").unwrap().payload.as_list().unwrap()[0],
            "doc-maintenance-records-1"
        );
    }

    #[tokio::test]
    async fn test_single_step() {
        let executor = PipelineExecutor::new(create_simulated_capabilities());
        let result = executor
            .run(&spec(vec![StepSpec::new("image_search", "poles")]))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.total_waves, 1);
        assert_eq!(
            result.final_step().unwrap().output("image_ids").unwrap().data_type,
            DataType::ImageIdList
        );
        assert!(result.token_usage.total() > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_skips_dependent() {
        let executor = PipelineExecutor::new(registry_with(
            simulated(CapabilityKind::ImageSearch).with_behavior(SimulatedBehavior::Hang),
        ));

        let result = executor
            .run(&spec(vec![
                StepSpec::new("image_search", "poles"),
                StepSpec::new("folder", "sort").depends_on([0]),
            ]))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.steps[0].status, StepStatus::Failed);
        assert_eq!(result.steps[0].failure, Some(FailureReason::Timeout));
        assert_eq!(result.steps[1].status, StepStatus::Skipped);
        assert_eq!(result.steps[1].error.as_deref(), Some("dependency failed: step 0"));
        assert_eq!(result.total_waves, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_kind_timeout_override() {
        let config = OrchestratorConfig {
            timeouts: BTreeMap::from([("image_search".to_string(), 2)]),
            ..Default::default()
        };
        let executor = PipelineExecutor::new(registry_with(
            simulated(CapabilityKind::ImageSearch).with_delay(Duration::from_secs(5)),
        ))
        .with_config(config);

        let result = executor
            .run(&spec(vec![StepSpec::new("image_search", "poles")]))
            .await
            .unwrap();

        assert_eq!(result.steps[0].failure, Some(FailureReason::Timeout));
        assert!(result.errors[0].contains("timeout"));
    }

    #[tokio::test]
    async fn test_forward_dependency_runs_nothing() {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let executor = PipelineExecutor::new(registry_with(Recording {
            inner: simulated(CapabilityKind::ImageSearch),
            requests: Arc::clone(&requests),
        }));

        let err = executor
            .run(&spec(vec![
                StepSpec::new("image_search", "poles").depends_on([1]),
                StepSpec::new("document_search", "records"),
            ]))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Validation { .. }));
        assert!(requests.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_first_wave() {
        let executor = PipelineExecutor::new(registry_with(
            simulated(CapabilityKind::ImageSearch).with_behavior(SimulatedBehavior::Hang),
        ));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        // waves: [0, 1], [2], [3]
        let result = executor
            .execute(
                &spec(vec![
                    StepSpec::new("image_search", "poles"),
                    StepSpec::new("document_search", "records"),
                    StepSpec::new("image_analysis", "categorize"),
                    StepSpec::new("synthesis", "report"),
                ]),
                cancel,
            )
            .await
            .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.total_waves, 1);
        assert_eq!(result.steps[0].status, StepStatus::Cancelled);
        assert_eq!(result.steps[1].status, StepStatus::Completed);
        for step in &result.steps[2..] {
            assert_eq!(step.status, StepStatus::Cancelled);
            assert_eq!(step.error.as_deref(), Some("pipeline cancelled"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_timeout_cancels() {
        let config = OrchestratorConfig {
            run_timeout: Some(1),
            ..Default::default()
        };
        let executor = PipelineExecutor::new(registry_with(
            simulated(CapabilityKind::ImageSearch).with_behavior(SimulatedBehavior::Hang),
        ))
        .with_config(config);

        let result = executor
            .run(&spec(vec![
                StepSpec::new("image_search", "poles"),
                StepSpec::new("folder", "sort"),
            ]))
            .await
            .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.steps[0].status, StepStatus::Cancelled);
        assert_eq!(result.steps[1].status, StepStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_after_last_wave_keeps_run_complete() {
        let cancel = CancellationToken::new();
        let executor = PipelineExecutor::new(registry_with(CancelsOnReturn {
            inner: simulated(CapabilityKind::ImageSearch),
            trigger: cancel.clone(),
        }));

        let result = executor
            .execute(&spec(vec![StepSpec::new("image_search", "poles")]), cancel.clone())
            .await
            .unwrap();

        assert!(cancel.is_cancelled());
        assert!(result.success);
        assert!(!result.cancelled);
        assert_eq!(result.steps[0].status, StepStatus::Completed);
    }

    #[tokio::test]
    async fn test_failure_skips_transitive_dependents() {
        let executor = PipelineExecutor::new(registry_with(
            simulated(CapabilityKind::ImageSearch)
                .with_behavior(SimulatedBehavior::Fail("quota exceeded".into())),
        ));

        let result = executor
            .run(&spec(vec![
                StepSpec::new("image_search", "poles"),
                StepSpec::new("image_analysis", "categorize"),
                StepSpec::new("synthesis", "report"),
                StepSpec::new("document_search", "records"),
            ]))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.steps[0].status, StepStatus::Failed);
        assert_eq!(result.steps[1].status, StepStatus::Skipped);
        assert_eq!(result.steps[1].error.as_deref(), Some("dependency failed: step 0"));
        assert_eq!(result.steps[2].status, StepStatus::Skipped);
        assert_eq!(result.steps[2].error.as_deref(), Some("dependency failed: step 1"));
        assert_eq!(result.steps[3].status, StepStatus::Completed);
    }

    #[tokio::test]
    async fn test_execute_existing_plan() {
        let executor = PipelineExecutor::new(create_simulated_capabilities());
        let submission = PipelineSpec {
            name: Some("sort".into()),
            seeds: SeedInputs {
                image_ids: vec!["img-a".into(), "img-b".into()],
                ..Default::default()
            },
            steps: vec![StepSpec::new("folder", "group by site")],
            ..Default::default()
        };

        let plan = executor.plan(&submission).unwrap();
        assert_eq!(plan.name, "sort");

        let result = executor
            .execute_plan(&plan, CancellationToken::new())
            .await
            .unwrap();

        assert!(result.success);
        let Payload::Structured(folder_plan) = &result.steps[0].output("folder_plan").unwrap().payload
        else {
            panic!("folder plan should be structured");
        };
        assert_eq!(folder_plan["files_moved"], 2);
    }

    #[tokio::test]
    async fn test_invalid_output_classified() {
        let executor = PipelineExecutor::new(registry_with(
            simulated(CapabilityKind::DocumentSearch).with_behavior(SimulatedBehavior::InvalidOutput),
        ));

        let result = executor
            .run(&spec(vec![StepSpec::new("document_search", "records")]))
            .await
            .unwrap();

        assert_eq!(result.steps[0].failure, Some(FailureReason::InvalidOutput));
        assert!(result.steps[0].outputs.is_empty());
    }

    #[tokio::test]
    async fn test_sibling_failure_is_isolated() {
        let executor = PipelineExecutor::new(registry_with(
            simulated(CapabilityKind::ImageSearch)
                .with_behavior(SimulatedBehavior::Fail("quota exceeded".into())),
        ));

        let result = executor
            .run(&spec(vec![
                StepSpec::new("image_search", "poles"),
                StepSpec::new("document_search", "records"),
                StepSpec::new("document_analysis", "summarize"),
            ]))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.steps[0].failure, Some(FailureReason::CapabilityError));
        assert_eq!(result.steps[1].status, StepStatus::Completed);
        assert_eq!(result.steps[2].status, StepStatus::Completed);
        assert_eq!(
            result.errors,
            vec!["step 0 (image_search): capability_error: quota exceeded".to_string()]
        );
    }

    #[tokio::test]
    async fn test_panic_is_capability_error() {
        let executor = PipelineExecutor::new(registry_with(Panicking));

        let result = executor
            .run(&spec(vec![
                StepSpec::new("link_search", "vendors"),
                StepSpec::new("image_search", "poles"),
            ]))
            .await
            .unwrap();

        assert_eq!(result.steps[0].status, StepStatus::Failed);
        assert_eq!(result.steps[0].failure, Some(FailureReason::CapabilityError));
        assert_eq!(result.steps[1].status, StepStatus::Completed);
    }

    #[tokio::test]
    async fn test_missing_capability_rejected() {
        let executor = PipelineExecutor::new(CapabilityRegistry::new());

        let err = executor
            .run(&spec(vec![StepSpec::new("image_search", "poles")]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::CapabilityNotRegistered {
                capability: CapabilityKind::ImageSearch
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_bounded() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let executor = PipelineExecutor::new(registry_with(Counting {
            kind: CapabilityKind::ImageSearch,
            active: Arc::clone(&active),
            peak: Arc::clone(&peak),
        }))
        .with_config(OrchestratorConfig {
            max_concurrency: 2,
            ..Default::default()
        });

        let result = executor
            .run(&spec(vec![StepSpec::new("image_search", "poles"); 5]))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.total_waves, 1);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_auto_wired_chain() {
        let executor = PipelineExecutor::new(create_simulated_capabilities());

        let result = executor
            .run(&spec(vec![
                StepSpec::new("image_search", "storm damage"),
                StepSpec::new("image_analysis", "categorize damage"),
                StepSpec::new("synthesis", "write summary"),
            ]))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.total_waves, 3);
        let report = result.final_step().unwrap().output("report").unwrap();
        assert!(report.payload.as_text().unwrap().contains("analysis"));
    }
}

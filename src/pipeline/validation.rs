// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! Pipeline validation
//!
//! Turns a submission into step descriptors, reporting every offending
//! field at once rather than stopping at the first.

use std::collections::BTreeSet;

use crate::capabilities::{CapabilityKind, ContractSet};
use crate::config::OrchestratorConfig;
use crate::errors::{PipelineError, ValidationIssue};
use crate::pipeline::{DataType, PipelineSpec, StepDescriptor};

/// Pipeline validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a submission and produce its step descriptors
    ///
    /// Pure: nothing is executed and no state is touched.
    pub fn validate(
        spec: &PipelineSpec,
        config: &OrchestratorConfig,
    ) -> Result<Vec<StepDescriptor>, PipelineError> {
        let mut issues = Vec::new();
        let total = spec.steps.len();

        if total == 0 {
            issues.push(ValidationIssue::pipeline("steps", "pipeline has no steps"));
        } else if total > config.max_steps {
            issues.push(ValidationIssue::pipeline(
                "steps",
                format!("{} steps submitted, at most {} allowed", total, config.max_steps),
            ));
        }

        let mut descriptors = Vec::with_capacity(total);

        for (index, step) in spec.steps.iter().enumerate() {
            let capability = match step.capability.parse::<CapabilityKind>() {
                Ok(kind) => Some(kind),
                Err(_) => {
                    issues.push(ValidationIssue::step(
                        index,
                        "capability",
                        format!("unknown capability '{}'", step.capability),
                    ));
                    None
                }
            };

            let intent = step.intent.trim();
            let len = intent.chars().count();
            if len < config.min_intent_len {
                issues.push(ValidationIssue::step(
                    index,
                    "intent",
                    format!("intent is {} chars, at least {} required", len, config.min_intent_len),
                ));
            } else if len > config.max_intent_len {
                issues.push(ValidationIssue::step(
                    index,
                    "intent",
                    format!("intent is {} chars, at most {} allowed", len, config.max_intent_len),
                ));
            }

            let explicit_dependencies = step.depends_on.as_ref().map(|deps| {
                let mut set = BTreeSet::new();
                for &dep in deps {
                    if dep >= total {
                        issues.push(ValidationIssue::step(
                            index,
                            "depends_on",
                            format!("index {} is out of range (pipeline has {} steps)", dep, total),
                        ));
                    } else if dep >= index {
                        issues.push(ValidationIssue::step(
                            index,
                            "depends_on",
                            format!("index {} does not refer to an earlier step", dep),
                        ));
                    } else {
                        set.insert(dep);
                    }
                }
                set
            });

            if let Some(capability) = capability {
                descriptors.push(StepDescriptor {
                    index,
                    capability,
                    intent: intent.to_string(),
                    explicit_dependencies,
                    seed_inputs: step.seeds.clone(),
                });
            }
        }

        if issues.is_empty() {
            Ok(descriptors)
        } else {
            Err(PipelineError::Validation { issues })
        }
    }

    /// Non-fatal observations about validated steps
    pub fn warnings(steps: &[StepDescriptor], contracts: &ContractSet) -> Vec<String> {
        let mut warnings = Vec::new();

        for step in steps {
            let contract = contracts.get(step.capability);

            for data_type in [DataType::ImageIdList, DataType::DocumentIdList, DataType::LinkIdList] {
                if step.seed_inputs.provides(data_type)
                    && contract.inputs_of_type(data_type).next().is_none()
                {
                    warnings.push(format!(
                        "Step {} ({}): seeded {} is not an input of this capability and will be ignored",
                        step.index, step.capability, data_type
                    ));
                }
            }

            let Some(deps) = &step.explicit_dependencies else {
                continue;
            };
            for &dep in deps {
                let producer = contracts.get(steps[dep].capability);
                let feeds = producer
                    .outputs
                    .iter()
                    .any(|o| contract.inputs_of_type(o.data_type).next().is_some());
                if !feeds {
                    warnings.push(format!(
                        "Step {} ({}): depends on step {} ({}) but consumes none of its outputs; it only waits for it",
                        step.index, step.capability, dep, steps[dep].capability
                    ));
                }
            }
        }

        warnings
    }
}

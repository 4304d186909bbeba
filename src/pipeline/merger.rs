// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! Output merger
//!
//! Keeps one input pool per step and routes completed steps' outputs into
//! the pools of their direct dependents. Only ever called between waves,
//! by the single task driving the run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::capabilities::ContractSet;
use crate::pipeline::{DependencyGraph, Payload, SeedInputs, TypedValue};

/// What merging a value into a pool did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Slot was empty
    Inserted,
    /// Both values mergeable lists; payloads unioned
    Unioned,
    /// Previous value overwritten (last wins)
    Replaced,
}

/// Named input values available to one step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputPool {
    values: BTreeMap<String, TypedValue>,
}

impl InputPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TypedValue)> {
        self.values.iter()
    }

    /// Put a value in place, replacing whatever was there
    pub fn insert(&mut self, value: TypedValue) {
        self.values.insert(value.name.clone(), value);
    }

    /// Merge a value into the pool under its own name
    ///
    /// Two mergeable list payloads are unioned, keeping first-seen order and
    /// dropping duplicates. Anything else is last-wins.
    pub fn merge(&mut self, value: TypedValue) -> MergeOutcome {
        let Some(existing) = self.values.get_mut(&value.name) else {
            self.insert(value);
            return MergeOutcome::Inserted;
        };

        if existing.mergeable && value.mergeable && existing.data_type == value.data_type {
            if let (Payload::List(current), Payload::List(incoming)) =
                (&mut existing.payload, &value.payload)
            {
                for item in incoming {
                    if !current.contains(item) {
                        current.push(item.clone());
                    }
                }
                return MergeOutcome::Unioned;
            }
        }

        *existing = value;
        MergeOutcome::Replaced
    }
}

/// Per-step input pools for one run
#[derive(Debug, Clone)]
pub struct OutputMerger {
    pools: Vec<InputPool>,
}

impl OutputMerger {
    /// Seed every step's pool
    ///
    /// A step's own seeds always land in its pool. Pipeline-level seeds only
    /// fill input slots no incoming edge can feed.
    pub fn new(dag: &DependencyGraph, contracts: &ContractSet, seeds: &SeedInputs) -> Self {
        let pools = dag
            .steps()
            .iter()
            .map(|step| {
                let contract = contracts.get(step.capability);
                let fed = dag.fed_types(step.index, contracts);
                let mut pool = InputPool::new();

                for slot in &contract.inputs {
                    if let Some(value) = step.seed_inputs.value(&slot.name, slot.data_type) {
                        pool.merge(value);
                    } else if !fed.contains(&slot.data_type) {
                        if let Some(value) = seeds.value(&slot.name, slot.data_type) {
                            pool.merge(value);
                        }
                    }
                }

                pool
            })
            .collect();

        Self { pools }
    }

    /// Private copy of a step's inputs, taken at wave start
    pub fn snapshot(&self, index: usize) -> InputPool {
        self.pools.get(index).cloned().unwrap_or_default()
    }

    pub fn pool(&self, index: usize) -> Option<&InputPool> {
        self.pools.get(index)
    }

    /// Route one completed step's outputs to its direct dependents
    ///
    /// Each value goes into every input slot of the dependent with the same
    /// data type, renamed to that slot. Values no slot accepts are dropped.
    pub fn route(
        &mut self,
        producer: usize,
        outputs: &[TypedValue],
        dag: &DependencyGraph,
        contracts: &ContractSet,
    ) {
        for consumer in dag.dependents(producer) {
            let Some(capability) = dag.capability(consumer) else {
                continue;
            };
            let contract = contracts.get(capability);

            for value in outputs {
                let mut accepted = false;
                for slot in contract.inputs_of_type(value.data_type) {
                    let mut routed = value.clone();
                    routed.name = slot.name.clone();
                    let outcome = self.pools[consumer].merge(routed);
                    accepted = true;
                    tracing::trace!(
                        producer,
                        consumer,
                        slot = %slot.name,
                        ?outcome,
                        "routed output"
                    );
                }
                if !accepted {
                    tracing::trace!(
                        producer,
                        consumer,
                        output = %value.name,
                        "no input slot accepts output"
                    );
                }
            }
        }
    }

    /// Route every completed step of a wave, in ascending step order
    pub fn merge_wave(
        &mut self,
        mut completed: Vec<(usize, Vec<TypedValue>)>,
        dag: &DependencyGraph,
        contracts: &ContractSet,
    ) {
        completed.sort_by_key(|(index, _)| *index);
        for (index, outputs) in &completed {
            self.route(*index, outputs, dag, contracts);
        }
    }
}

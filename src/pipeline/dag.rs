// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! Dependency graph builder
//!
//! Builds the step DAG once per run. Edges come from explicit `depends_on`
//! lists or, for steps without one, are auto-wired: each required input is
//! fed by the most recent earlier step whose contract produces its type.

use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::BTreeSet;

use crate::capabilities::{CapabilityKind, ContractSet};
use crate::errors::PipelineError;
use crate::pipeline::{DataType, SeedInputs, StepDescriptor};

/// How an edge came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EdgeKind {
    /// Declared in `depends_on`
    Explicit,
    /// Inferred from a required input's data type
    AutoWired,
}

/// `producer -> consumer`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DependencyEdge {
    pub producer: usize,
    pub consumer: usize,
    pub kind: EdgeKind,
}

/// Step dependency DAG
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<usize, EdgeKind>,
    steps: Vec<StepDescriptor>,
}

impl DependencyGraph {
    /// Build the graph for validated steps
    ///
    /// `seeds` are the pipeline-level seed inputs; a required input with no
    /// producer must be covered by them or by the step's own seeds.
    pub fn build(
        steps: &[StepDescriptor],
        contracts: &ContractSet,
        seeds: &SeedInputs,
    ) -> Result<Self, PipelineError> {
        let mut graph = DiGraph::with_capacity(steps.len(), steps.len());

        for (position, step) in steps.iter().enumerate() {
            if step.index != position {
                return Err(PipelineError::Graph {
                    reason: format!("step at position {} carries index {}", position, step.index),
                });
            }
            graph.add_node(step.index);
        }

        for step in steps {
            let contract = contracts.get(step.capability);
            let consumer = NodeIndex::new(step.index);
            let seeded = |data_type: DataType| {
                step.seed_inputs.provides(data_type) || seeds.provides(data_type)
            };

            match &step.explicit_dependencies {
                Some(deps) => {
                    for &dep in deps {
                        if dep >= step.index {
                            return Err(PipelineError::Graph {
                                reason: format!(
                                    "step {} depends on step {} which does not precede it",
                                    step.index, dep
                                ),
                            });
                        }
                        graph.add_edge(NodeIndex::new(dep), consumer, EdgeKind::Explicit);
                    }

                    for slot in contract.required_inputs() {
                        let produced = deps
                            .iter()
                            .any(|&dep| contracts.get(steps[dep].capability).produces(slot.data_type));
                        if !produced && !seeded(slot.data_type) {
                            return Err(PipelineError::UnsatisfiedDependency {
                                step: step.index,
                                capability: step.capability,
                                data_type: slot.data_type,
                            });
                        }
                    }
                }
                None => {
                    for slot in contract.required_inputs() {
                        let producer = steps[..step.index]
                            .iter()
                            .rev()
                            .find(|prior| contracts.get(prior.capability).produces(slot.data_type));

                        match producer {
                            Some(prior) => {
                                let from = NodeIndex::new(prior.index);
                                if !graph.contains_edge(from, consumer) {
                                    graph.add_edge(from, consumer, EdgeKind::AutoWired);
                                }
                            }
                            None if seeded(slot.data_type) => {}
                            None => {
                                return Err(PipelineError::UnsatisfiedDependency {
                                    step: step.index,
                                    capability: step.capability,
                                    data_type: slot.data_type,
                                });
                            }
                        }
                    }
                }
            }
        }

        let dag = Self {
            graph,
            steps: steps.to_vec(),
        };
        dag.validate_acyclic()?;

        Ok(dag)
    }

    /// Backward-only edges make cycles impossible; checked anyway
    fn validate_acyclic(&self) -> Result<(), PipelineError> {
        toposort(&self.graph, None).map(|_| ()).map_err(|cycle| PipelineError::Graph {
            reason: format!("cycle through step {}", self.graph[cycle.node_id()]),
        })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[StepDescriptor] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&StepDescriptor> {
        self.steps.get(index)
    }

    pub fn capability(&self, index: usize) -> Option<CapabilityKind> {
        self.steps.get(index).map(|s| s.capability)
    }

    /// Direct producers of a step, ascending
    pub fn dependencies(&self, index: usize) -> Vec<usize> {
        self.neighbors(index, Direction::Incoming)
    }

    /// Direct consumers of a step, ascending
    pub fn dependents(&self, index: usize) -> Vec<usize> {
        self.neighbors(index, Direction::Outgoing)
    }

    fn neighbors(&self, index: usize, direction: Direction) -> Vec<usize> {
        if index >= self.steps.len() {
            return Vec::new();
        }
        let set: BTreeSet<usize> = self
            .graph
            .neighbors_directed(NodeIndex::new(index), direction)
            .map(|n| self.graph[n])
            .collect();
        set.into_iter().collect()
    }

    /// Check if step `a` depends (directly or transitively) on step `b`
    pub fn depends_on(&self, a: usize, b: usize) -> bool {
        if a >= self.steps.len() || b >= self.steps.len() || a == b {
            return false;
        }
        has_path_connecting(&self.graph, NodeIndex::new(b), NodeIndex::new(a), None)
    }

    /// Every edge, ordered by producer then consumer
    pub fn edges(&self) -> Vec<DependencyEdge> {
        let mut edges: Vec<_> = self
            .graph
            .edge_references()
            .map(|e| DependencyEdge {
                producer: self.graph[e.source()],
                consumer: self.graph[e.target()],
                kind: *e.weight(),
            })
            .collect();
        edges.sort();
        edges
    }

    /// Data types reaching `index` through its incoming edges
    ///
    /// Pipeline-level seeds only fill input slots not fed by a producer.
    pub fn fed_types(&self, index: usize, contracts: &ContractSet) -> BTreeSet<DataType> {
        let Some(step) = self.steps.get(index) else {
            return BTreeSet::new();
        };
        let consumer = contracts.get(step.capability);

        self.dependencies(index)
            .into_iter()
            .flat_map(|dep| contracts.get(self.steps[dep].capability).outputs.iter())
            .map(|o| o.data_type)
            .filter(|t| consumer.inputs_of_type(*t).next().is_some())
            .collect()
    }

    fn label(&self, index: usize) -> String {
        format!("{}: {}", index, self.steps[index].capability)
    }

    /// One line per edge, `producer -> consumer`
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        for edge in self.edges() {
            let kind = match edge.kind {
                EdgeKind::Explicit => "explicit",
                EdgeKind::AutoWired => "auto-wired",
            };
            out.push_str(&format!(
                "{} -> {} ({})\n",
                self.label(edge.producer),
                self.label(edge.consumer),
                kind
            ));
        }

        out
    }

    /// Generate Mermaid diagram of the DAG
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for step in &self.steps {
            out.push_str(&format!("    s{}[\"{}\"]\n", step.index, self.label(step.index)));
        }

        for edge in self.edges() {
            let arrow = match edge.kind {
                EdgeKind::Explicit => "-->",
                EdgeKind::AutoWired => "-.->",
            };
            out.push_str(&format!("    s{} {} s{}\n", edge.producer, arrow, edge.consumer));
        }

        out
    }

    /// Generate DOT diagram of the DAG
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph pipeline {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for step in &self.steps {
            out.push_str(&format!("    s{} [label=\"{}\"];\n", step.index, self.label(step.index)));
        }

        for edge in self.edges() {
            let style = match edge.kind {
                EdgeKind::Explicit => "",
                EdgeKind::AutoWired => " [style=dashed]",
            };
            out.push_str(&format!("    s{} -> s{}{};\n", edge.producer, edge.consumer, style));
        }

        out.push_str("}\n");
        out
    }
}

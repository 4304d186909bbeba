// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! Wave scheduler
//!
//! Layers the dependency graph by repeated peeling. Wave 0 holds every step
//! without dependencies; wave k holds every step whose producers all sit in
//! earlier waves. Steps inside a wave are ordered by ascending index.

use crate::errors::PipelineError;
use crate::pipeline::DependencyGraph;

/// Ordered partition of the steps into waves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavePlan {
    waves: Vec<Vec<usize>>,
    wave_of: Vec<usize>,
}

impl WavePlan {
    /// Compute the waves of a graph
    pub fn compute(dag: &DependencyGraph) -> Result<Self, PipelineError> {
        let total = dag.len();
        let mut wave_of: Vec<Option<usize>> = vec![None; total];
        let mut waves: Vec<Vec<usize>> = Vec::new();
        let mut placed = 0;

        // Each round places at least one step of a DAG, so `total` rounds suffice
        for _ in 0..total {
            if placed == total {
                break;
            }

            let wave: Vec<usize> = (0..total)
                .filter(|&i| wave_of[i].is_none())
                .filter(|&i| {
                    dag.dependencies(i)
                        .iter()
                        .all(|&d| wave_of[d].is_some())
                })
                .collect();

            if wave.is_empty() {
                break;
            }

            for &i in &wave {
                wave_of[i] = Some(waves.len());
            }
            placed += wave.len();
            waves.push(wave);
        }

        if placed != total {
            let stuck: Vec<String> = (0..total)
                .filter(|&i| wave_of[i].is_none())
                .map(|i| i.to_string())
                .collect();
            return Err(PipelineError::Graph {
                reason: format!("steps {} could not be scheduled", stuck.join(", ")),
            });
        }

        Ok(Self {
            waves,
            wave_of: wave_of.into_iter().flatten().collect(),
        })
    }

    pub fn waves(&self) -> &[Vec<usize>] {
        &self.waves
    }

    pub fn total_waves(&self) -> usize {
        self.waves.len()
    }

    /// Wave a step was placed in
    pub fn wave_of(&self, index: usize) -> Option<usize> {
        self.wave_of.get(index).copied()
    }

    /// Steps of the last wave
    pub fn final_wave(&self) -> &[usize] {
        self.waves.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Human-readable execution plan
    pub fn to_text(&self, dag: &DependencyGraph) -> String {
        let mut out = String::new();

        for (n, wave) in self.waves.iter().enumerate() {
            out.push_str(&format!("wave {}:\n", n + 1));
            for &i in wave {
                let Some(step) = dag.step(i) else { continue };
                out.push_str(&format!("  [{}] {}: {}", i, step.capability, step.intent));

                let deps = dag.dependencies(i);
                if !deps.is_empty() {
                    let deps: Vec<String> = deps.iter().map(ToString::to_string).collect();
                    out.push_str(&format!(" [after {}]", deps.join(", ")));
                }
                out.push('\n');
            }
        }

        out
    }
}

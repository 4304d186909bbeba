// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! Capabilities
//!
//! This module provides the capability trait the executor invokes once per
//! step, the contracts capabilities advertise, and the built-in
//! implementations (external command, simulated).

mod command;
mod contracts;
mod simulated;

pub use command::CommandCapability;
pub use contracts::{
    CapabilityClass, CapabilityContract, CapabilityKind, ContractSet, InputSlot, OutputSlot,
};
pub use simulated::{SimulatedBehavior, SimulatedCapability};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::OrchestratorConfig;
use crate::errors::CapabilityError;
use crate::pipeline::{InputPool, TypedValue};

/// Everything a capability receives for one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityRequest {
    /// Index of the step in the submitted list
    pub step: usize,
    pub capability: CapabilityKind,
    pub intent: String,
    /// Merged input snapshot taken at wave start
    pub inputs: InputPool,
}

/// Token accounting reported by a capability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Successful result of an invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilityOutput {
    #[serde(default)]
    pub values: Vec<TypedValue>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub token_usage: Option<TokenUsage>,
}

impl CapabilityOutput {
    pub fn new(values: Vec<TypedValue>) -> Self {
        Self {
            values,
            summary: None,
            token_usage: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Check returned values against the contract
    ///
    /// Every value must name a declared output with the declared data type
    /// and a payload of the right shape, and every declared output must be
    /// present. The `mergeable` flag is taken from the contract.
    pub fn conform_to(mut self, contract: &CapabilityContract) -> Result<Self, CapabilityError> {
        for value in &mut self.values {
            let Some(slot) = contract.output(&value.name) else {
                return Err(CapabilityError::invalid_output(format!(
                    "'{}' is not a declared output of {}",
                    value.name, contract.kind
                )));
            };
            if slot.data_type != value.data_type {
                return Err(CapabilityError::invalid_output(format!(
                    "output '{}' has type {} but {} declares {}",
                    value.name, value.data_type, contract.kind, slot.data_type
                )));
            }
            if !value.is_well_formed() {
                return Err(CapabilityError::invalid_output(format!(
                    "output '{}' carries a {} payload, expected {}",
                    value.name,
                    value.payload.kind(),
                    value.data_type.payload_kind()
                )));
            }
            value.mergeable = slot.mergeable;
        }

        for slot in &contract.outputs {
            if !self.values.iter().any(|v| v.name == slot.name) {
                return Err(CapabilityError::invalid_output(format!(
                    "declared output '{}' is missing",
                    slot.name
                )));
            }
        }

        Ok(self)
    }
}

/// Trait for pluggable capabilities
#[async_trait]
pub trait Capability: Send + Sync {
    /// Kind this implementation serves
    fn kind(&self) -> CapabilityKind;

    /// Invoke the capability for one step
    ///
    /// # Arguments
    /// * `request` - Intent and merged inputs for the step
    /// * `cancel` - Fired when the run is cancelled; implementations that can
    ///   abort early should watch it
    async fn invoke(
        &self,
        request: CapabilityRequest,
        cancel: CancellationToken,
    ) -> Result<CapabilityOutput, CapabilityError>;

    /// Check if the capability can be reached
    async fn check_available(&self) -> bool {
        true
    }
}

/// Capability implementations by kind
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<CapabilityKind, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an implementation under its own kind
    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        self.capabilities.insert(capability.kind(), capability);
    }

    pub fn with(mut self, capability: Arc<dyn Capability>) -> Self {
        self.register(capability);
        self
    }

    pub fn get(&self, kind: CapabilityKind) -> Option<Arc<dyn Capability>> {
        self.capabilities.get(&kind).cloned()
    }

    pub fn contains(&self, kind: CapabilityKind) -> bool {
        self.capabilities.contains_key(&kind)
    }

    pub fn kinds(&self) -> Vec<CapabilityKind> {
        let mut kinds: Vec<_> = self.capabilities.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Kinds whose capability reports itself unavailable
    pub async fn unavailable(&self) -> Vec<CapabilityKind> {
        let mut missing = Vec::new();
        for kind in self.kinds() {
            if let Some(capability) = self.capabilities.get(&kind) {
                if !capability.check_available().await {
                    missing.push(kind);
                }
            }
        }
        missing
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// Registry with a simulated capability for every kind
pub fn create_simulated_capabilities() -> CapabilityRegistry {
    let contracts = ContractSet::builtin();
    let mut registry = CapabilityRegistry::new();
    for contract in contracts.iter() {
        registry.register(Arc::new(SimulatedCapability::new(contract.clone())));
    }
    registry
}

/// Registry with an external command for every kind configured
pub fn create_command_capabilities(config: &OrchestratorConfig) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    for (kind, command) in config.command_specs() {
        registry.register(Arc::new(CommandCapability::new(kind, command)));
    }
    registry
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! Orchestrator configuration
//!
//! Loaded from `.agentflow.yaml` (or a TOML file), falling back to the
//! user config directory and finally to built-in defaults.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capabilities::CapabilityKind;
use crate::errors::PipelineError;

/// Default config file looked up in the working directory
pub const CONFIG_FILE: &str = ".agentflow.yaml";

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Largest accepted step list
    pub max_steps: usize,

    /// Shortest accepted intent (characters, after trimming)
    pub min_intent_len: usize,

    /// Longest accepted intent (characters, after trimming)
    pub max_intent_len: usize,

    /// Steps allowed to run at once within a wave
    pub max_concurrency: usize,

    /// Step timeout in seconds applied to every capability without an override
    pub default_step_timeout: Option<u64>,

    /// Per-capability step timeouts in seconds
    pub timeouts: BTreeMap<String, u64>,

    /// Whole-run timeout in seconds
    pub run_timeout: Option<u64>,

    /// External commands backing capabilities
    pub commands: BTreeMap<String, CommandSpec>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_steps: 50,
            min_intent_len: 1,
            max_intent_len: 2000,
            max_concurrency: 8,
            default_step_timeout: None,
            timeouts: BTreeMap::new(),
            run_timeout: None,
            commands: BTreeMap::new(),
        }
    }
}

/// External command line for a capability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Command line, run through `shell -c`
    pub command: String,

    /// Shell to use
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Extra environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,
}

fn default_shell() -> String {
    "bash".to_string()
}

impl OrchestratorConfig {
    /// Load configuration from a YAML or TOML file
    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Find and load configuration
    ///
    /// Order: `explicit`, `<dir>/.agentflow.yaml`, the user config
    /// directory, defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, PipelineError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let local = dir.join(CONFIG_FILE);
        if local.exists() {
            return Self::from_file(&local);
        }

        if let Some(user) = user_config_path() {
            if user.exists() {
                tracing::debug!(path = %user.display(), "using user configuration");
                return Self::from_file(&user);
            }
        }

        Ok(Self::default())
    }

    /// Check values and capability names
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_steps == 0 {
            return Err(invalid("max_steps must be at least 1", None));
        }
        if self.max_concurrency == 0 {
            return Err(invalid("max_concurrency must be at least 1", None));
        }
        if self.min_intent_len > self.max_intent_len {
            return Err(invalid(
                &format!(
                    "min_intent_len ({}) exceeds max_intent_len ({})",
                    self.min_intent_len, self.max_intent_len
                ),
                None,
            ));
        }
        if self.default_step_timeout == Some(0) || self.run_timeout == Some(0) {
            return Err(invalid("timeouts must be at least 1 second", None));
        }

        for (name, secs) in &self.timeouts {
            parse_kind(name)?;
            if *secs == 0 {
                return Err(invalid(&format!("timeout for '{}' must be at least 1 second", name), None));
            }
        }
        for name in self.commands.keys() {
            parse_kind(name)?;
        }

        Ok(())
    }

    /// Timeout applied to one step of `kind`
    pub fn step_timeout(&self, kind: CapabilityKind) -> Duration {
        self.timeouts
            .iter()
            .find(|(name, _)| name.parse::<CapabilityKind>().ok() == Some(kind))
            .map(|(_, secs)| Duration::from_secs(*secs))
            .or_else(|| self.default_step_timeout.map(Duration::from_secs))
            .unwrap_or_else(|| kind.class().default_timeout())
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout.map(Duration::from_secs)
    }

    /// Configured commands keyed by capability kind
    pub fn command_specs(&self) -> Vec<(CapabilityKind, CommandSpec)> {
        self.commands
            .iter()
            .filter_map(|(name, spec)| Some((name.parse().ok()?, spec.clone())))
            .collect()
    }
}

/// `<config dir>/agentflow/config.yaml`
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "agentflow").map(|dirs| dirs.config_dir().join("config.yaml"))
}

fn parse_kind(name: &str) -> Result<CapabilityKind, PipelineError> {
    name.parse().map_err(|e: String| {
        invalid(
            &e,
            Some(format!(
                "Known capabilities: {}",
                CapabilityKind::ALL.map(|k| k.as_str()).join(", ")
            )),
        )
    })
}

fn invalid(reason: &str, help: Option<String>) -> PipelineError {
    PipelineError::Config {
        reason: reason.to_string(),
        help,
    }
}

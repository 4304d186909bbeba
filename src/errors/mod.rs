// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! Error types
//!
//! Two layers of errors exist. [`PipelineError`] covers structural
//! problems with a submission (and IO around loading one); these abort a
//! run before anything executes. [`CapabilityError`] covers a single
//! step's invocation; it never escapes the executor and is recorded on
//! that step's result instead.

use miette::Diagnostic;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::capabilities::CapabilityKind;
use crate::pipeline::DataType;

/// Result type for agentflow operations
pub type AgentflowResult<T> = Result<T, PipelineError>;

/// A single problem found while validating a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Offending step index, `None` for pipeline-level problems
    pub step: Option<usize>,
    /// Offending field
    pub field: String,
    /// What is wrong with it
    pub message: String,
}

impl ValidationIssue {
    pub fn pipeline(field: &str, message: impl Into<String>) -> Self {
        Self {
            step: None,
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn step(step: usize, field: &str, message: impl Into<String>) -> Self {
        Self {
            step: Some(step),
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step {
            Some(step) => write!(f, "step {} `{}`: {}", step, self.field, self.message),
            None => write!(f, "`{}`: {}", self.field, self.message),
        }
    }
}

fn describe_issues(issues: &[ValidationIssue]) -> String {
    let listed = issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    format!(
        "{} issue{} ({})",
        issues.len(),
        if issues.len() == 1 { "" } else { "s" },
        listed
    )
}

/// Main error type for agentflow
#[derive(Error, Debug, Diagnostic)]
pub enum PipelineError {
    // ─────────────────────────────────────────────────────────────────────────
    // Submission Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid pipeline submission: {}", describe_issues(.issues))]
    #[diagnostic(
        code(agentflow::validation),
        help("Every offending field is listed; fix them all and resubmit")
    )]
    Validation { issues: Vec<ValidationIssue> },

    #[error("Step {step} ({capability}) needs an input of type '{data_type}' but no earlier step produces it and no seed provides it")]
    #[diagnostic(
        code(agentflow::unsatisfied_dependency),
        help("Add a step that produces '{data_type}', declare it in depends_on, or seed the pipeline with it")
    )]
    UnsatisfiedDependency {
        step: usize,
        capability: CapabilityKind,
        data_type: DataType,
    },

    #[error("Dependency graph is invalid: {reason}")]
    #[diagnostic(code(agentflow::graph))]
    Graph { reason: String },

    #[error("No capability registered for '{capability}'")]
    #[diagnostic(
        code(agentflow::capability_not_registered),
        help("Register an implementation for '{capability}' or run with --simulate")
    )]
    CapabilityNotRegistered { capability: CapabilityKind },

    // ─────────────────────────────────────────────────────────────────────────
    // Loading Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipeline file not found: {path}")]
    #[diagnostic(
        code(agentflow::pipeline_not_found),
        help("Pass a pipeline file explicitly or create .agentflow.pipeline.yaml")
    )]
    PipelineNotFound { path: PathBuf },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(agentflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Invalid configuration: {reason}")]
    #[diagnostic(code(agentflow::config))]
    Config {
        reason: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(agentflow::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(agentflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(agentflow::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(agentflow::toml_error))]
    Toml { message: String },
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for PipelineError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl PipelineError {
    /// Issues carried by a validation error, empty for every other variant
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Self::Validation { issues } => issues,
            _ => &[],
        }
    }

    /// Whether the error was raised before any step could run
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::UnsatisfiedDependency { .. }
                | Self::Graph { .. }
                | Self::CapabilityNotRegistered { .. }
        )
    }
}

/// Classified reason a step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Timeout,
    CapabilityError,
    InvalidOutput,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::CapabilityError => write!(f, "capability_error"),
            Self::InvalidOutput => write!(f, "invalid_output"),
        }
    }
}

/// Error raised by a single capability invocation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("timeout: no response within {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("capability_error: {0}")]
    Invocation(String),

    #[error("invalid_output: {0}")]
    InvalidOutput(String),

    #[error("cancelled")]
    Cancelled,
}

impl CapabilityError {
    pub fn invocation(message: impl Into<String>) -> Self {
        Self::Invocation(message.into())
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    /// Failure classification, `None` for cancellation (not a failure)
    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            Self::Timeout(_) => Some(FailureReason::Timeout),
            Self::Invocation(_) => Some(FailureReason::CapabilityError),
            Self::InvalidOutput(_) => Some(FailureReason::InvalidOutput),
            Self::Cancelled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_every_issue() {
        let err = PipelineError::Validation {
            issues: vec![
                ValidationIssue::step(0, "capability", "unknown capability 'x'"),
                ValidationIssue::step(2, "depends_on", "index 5 is not an earlier step"),
            ],
        };

        let msg = err.to_string();
        assert!(msg.contains("2 issues"));
        assert!(msg.contains("step 0 `capability`"));
        assert!(msg.contains("step 2 `depends_on`"));
        assert_eq!(err.issues().len(), 2);
        assert!(err.is_structural());
    }

    #[test]
    fn test_capability_error_classification() {
        assert_eq!(
            CapabilityError::Timeout(Duration::from_secs(3)).reason(),
            Some(FailureReason::Timeout)
        );
        assert_eq!(
            CapabilityError::invocation("boom").reason(),
            Some(FailureReason::CapabilityError)
        );
        assert_eq!(
            CapabilityError::invalid_output("bad").reason(),
            Some(FailureReason::InvalidOutput)
        );
        assert_eq!(CapabilityError::Cancelled.reason(), None);
        assert!(CapabilityError::invocation("boom").to_string().starts_with("capability_error"));
    }
}

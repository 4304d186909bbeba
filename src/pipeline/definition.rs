// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! Pipeline definition structures
//!
//! [`PipelineSpec`] is the submission as a caller writes it (and the schema
//! of pipeline YAML files). [`StepDescriptor`] is a step after validation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::capabilities::CapabilityKind;
use crate::errors::PipelineError;
use crate::pipeline::{DataType, TypedValue};

/// Pipeline submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Pipeline name
    #[serde(default)]
    pub name: Option<String>,

    /// Pipeline description
    #[serde(default)]
    pub description: Option<String>,

    /// Data available to any step whose input has no producer
    #[serde(default, skip_serializing_if = "SeedInputs::is_empty")]
    pub seeds: SeedInputs,

    /// Steps in submission order
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

impl PipelineSpec {
    /// Load a submission from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::PipelineNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::from_yaml(&content)
    }

    /// Parse a submission from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, PipelineError> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Serialize the submission to YAML
    pub fn to_yaml(&self) -> Result<String, PipelineError> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("pipeline")
    }
}

/// A step as submitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSpec {
    /// Capability name, e.g. `image_search`
    #[serde(alias = "agent")]
    pub capability: String,

    /// Instruction passed to the capability
    pub intent: String,

    /// Explicit dependencies (earlier step indices); auto-wired when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<usize>>,

    /// Data supplied directly to this step
    #[serde(default, skip_serializing_if = "SeedInputs::is_empty")]
    pub seeds: SeedInputs,
}

impl StepSpec {
    pub fn new(capability: impl Into<String>, intent: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            intent: intent.into(),
            depends_on: None,
            seeds: SeedInputs::default(),
        }
    }

    pub fn depends_on(mut self, deps: impl IntoIterator<Item = usize>) -> Self {
        self.depends_on = Some(deps.into_iter().collect());
        self
    }
}

/// Directly supplied identifier sets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedInputs {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub document_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link_ids: Vec<String>,
}

impl SeedInputs {
    pub fn is_empty(&self) -> bool {
        self.image_ids.is_empty() && self.document_ids.is_empty() && self.link_ids.is_empty()
    }

    /// Whether a non-empty seed of `data_type` exists
    pub fn provides(&self, data_type: DataType) -> bool {
        self.ids(data_type).is_some_and(|ids| !ids.is_empty())
    }

    fn ids(&self, data_type: DataType) -> Option<&Vec<String>> {
        match data_type {
            DataType::ImageIdList => Some(&self.image_ids),
            DataType::DocumentIdList => Some(&self.document_ids),
            DataType::LinkIdList => Some(&self.link_ids),
            _ => None,
        }
    }

    /// Seeded value of `data_type`, named `name`
    pub fn value(&self, name: &str, data_type: DataType) -> Option<TypedValue> {
        let ids = self.ids(data_type)?;
        if ids.is_empty() {
            return None;
        }
        Some(TypedValue::id_list(name, data_type, ids.clone()))
    }
}

/// A validated step; immutable once created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDescriptor {
    /// Position in the submitted list
    pub index: usize,
    pub capability: CapabilityKind,
    pub intent: String,
    /// `None` means auto-wire by data type
    pub explicit_dependencies: Option<BTreeSet<usize>>,
    pub seed_inputs: SeedInputs,
}

impl StepDescriptor {
    pub fn is_auto_wired(&self) -> bool {
        self.explicit_dependencies.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pipeline_yaml() {
        let yaml = r#"
name: "inspection"
seeds:
  image_ids: ["img-1", "img-2"]
steps:
  - capability: image_search
    intent: "damaged utility poles"
  - agent: document_search
    intent: "maintenance records"
  - capability: cross_reference
    intent: "Cross-reference images with maintenance records"
    depends_on: [0, 1]
    seeds:
      document_ids: ["doc-9"]
"#;

        let spec = PipelineSpec::from_yaml(yaml).unwrap();
        assert_eq!(spec.display_name(), "inspection");
        assert_eq!(spec.steps.len(), 3);
        assert_eq!(spec.steps[1].capability, "document_search");
        assert_eq!(spec.steps[2].depends_on, Some(vec![0, 1]));
        assert_eq!(spec.steps[2].seeds.document_ids, vec!["doc-9".to_string()]);
        assert!(spec.seeds.provides(DataType::ImageIdList));
        assert!(!spec.seeds.provides(DataType::DocumentIdList));
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineSpec::from_file(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, PipelineError::PipelineNotFound { .. }));
    }

    #[test]
    fn test_seed_values_are_mergeable_lists() {
        let seeds = SeedInputs {
            image_ids: vec!["img-1".into()],
            ..Default::default()
        };

        let value = seeds.value("image_ids", DataType::ImageIdList).unwrap();
        assert!(value.mergeable);
        assert!(seeds.value("document_ids", DataType::DocumentIdList).is_none());
        assert!(seeds.value("report", DataType::TextReport).is_none());
    }

    #[test]
    fn test_yaml_round_trip_keeps_dependencies() {
        let spec = PipelineSpec {
            name: Some("dag".into()),
            steps: vec![
                StepSpec::new("image_search", "poles"),
                StepSpec::new("folder", "sort").depends_on([0]),
            ],
            ..Default::default()
        };

        let parsed = PipelineSpec::from_yaml(&spec.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed.steps[1].depends_on, Some(vec![0]));
        assert_eq!(parsed.steps[0].depends_on, None);
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! Capability contracts
//!
//! Each capability kind declares the named, typed inputs it accepts and the
//! outputs it produces. The dependency graph is wired from these
//! declarations and returned outputs are checked against them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::pipeline::DataType;

/// Agent kinds a step can invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    ImageSearch,
    DocumentSearch,
    LinkSearch,
    #[serde(alias = "analysis")]
    ImageAnalysis,
    DocumentAnalysis,
    LinkAnalysis,
    Synthesis,
    #[serde(alias = "organize")]
    Folder,
    CrossReference,
    Assistant,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 10] = [
        CapabilityKind::ImageSearch,
        CapabilityKind::DocumentSearch,
        CapabilityKind::LinkSearch,
        CapabilityKind::ImageAnalysis,
        CapabilityKind::DocumentAnalysis,
        CapabilityKind::LinkAnalysis,
        CapabilityKind::Synthesis,
        CapabilityKind::Folder,
        CapabilityKind::CrossReference,
        CapabilityKind::Assistant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImageSearch => "image_search",
            Self::DocumentSearch => "document_search",
            Self::LinkSearch => "link_search",
            Self::ImageAnalysis => "image_analysis",
            Self::DocumentAnalysis => "document_analysis",
            Self::LinkAnalysis => "link_analysis",
            Self::Synthesis => "synthesis",
            Self::Folder => "folder",
            Self::CrossReference => "cross_reference",
            Self::Assistant => "assistant",
        }
    }

    /// Timeout class of this capability
    pub fn class(&self) -> CapabilityClass {
        match self {
            Self::ImageSearch | Self::DocumentSearch | Self::LinkSearch => CapabilityClass::Search,
            Self::ImageAnalysis | Self::DocumentAnalysis | Self::LinkAnalysis => {
                CapabilityClass::Analysis
            }
            Self::Folder | Self::CrossReference => CapabilityClass::Organization,
            Self::Synthesis | Self::Assistant => CapabilityClass::Synthesis,
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapabilityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        match normalized.as_str() {
            "image_search" => Ok(Self::ImageSearch),
            "document_search" => Ok(Self::DocumentSearch),
            "link_search" => Ok(Self::LinkSearch),
            "image_analysis" | "analysis" => Ok(Self::ImageAnalysis),
            "document_analysis" => Ok(Self::DocumentAnalysis),
            "link_analysis" => Ok(Self::LinkAnalysis),
            "synthesis" => Ok(Self::Synthesis),
            "folder" | "organize" => Ok(Self::Folder),
            "cross_reference" => Ok(Self::CrossReference),
            "assistant" => Ok(Self::Assistant),
            _ => Err(format!("Unknown capability: {}", s)),
        }
    }
}

/// Broad class of a capability, used to pick a default timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityClass {
    Search,
    Analysis,
    Organization,
    Synthesis,
}

impl CapabilityClass {
    pub fn default_timeout(&self) -> Duration {
        match self {
            Self::Search => Duration::from_secs(30),
            Self::Analysis => Duration::from_secs(120),
            Self::Organization => Duration::from_secs(120),
            Self::Synthesis => Duration::from_secs(300),
        }
    }
}

/// A declared input of a capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSlot {
    pub name: String,
    pub data_type: DataType,
    pub required: bool,
}

/// A declared output of a capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSlot {
    pub name: String,
    pub data_type: DataType,
    pub mergeable: bool,
}

/// Static declaration of what a capability consumes and produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityContract {
    pub kind: CapabilityKind,
    pub description: String,
    pub inputs: Vec<InputSlot>,
    pub outputs: Vec<OutputSlot>,
    /// Always true; steps of one wave run concurrently
    pub can_run_parallel: bool,
    /// Nominal duration, informational only
    #[serde(with = "duration_ms")]
    pub typical_duration: Duration,
    #[serde(default)]
    pub example_intents: Vec<String>,
    #[serde(default)]
    pub can_chain_with: Vec<CapabilityKind>,
}

impl CapabilityContract {
    pub fn required_inputs(&self) -> impl Iterator<Item = &InputSlot> {
        self.inputs.iter().filter(|i| i.required)
    }

    pub fn input(&self, name: &str) -> Option<&InputSlot> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputSlot> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Input slots accepting values of `data_type`
    pub fn inputs_of_type(&self, data_type: DataType) -> impl Iterator<Item = &InputSlot> {
        self.inputs.iter().filter(move |i| i.data_type == data_type)
    }

    pub fn produces(&self, data_type: DataType) -> bool {
        self.outputs.iter().any(|o| o.data_type == data_type)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

fn input(name: &str, data_type: DataType, required: bool) -> InputSlot {
    InputSlot {
        name: name.to_string(),
        data_type,
        required,
    }
}

fn output(name: &str, data_type: DataType) -> OutputSlot {
    OutputSlot {
        name: name.to_string(),
        data_type,
        mergeable: data_type.supports_merge(),
    }
}

/// The contracts of every capability kind
#[derive(Debug, Clone)]
pub struct ContractSet {
    contracts: BTreeMap<CapabilityKind, CapabilityContract>,
}

impl ContractSet {
    /// Contracts of the built-in capability kinds
    pub fn builtin() -> Self {
        use CapabilityKind as K;
        use DataType as T;

        let mut contracts = BTreeMap::new();
        let mut add = |kind: CapabilityKind,
                       description: &str,
                       inputs: Vec<InputSlot>,
                       outputs: Vec<OutputSlot>,
                       typical_ms: u64,
                       examples: &[&str],
                       chains: &[CapabilityKind]| {
            contracts.insert(
                kind,
                CapabilityContract {
                    kind,
                    description: description.to_string(),
                    inputs,
                    outputs,
                    can_run_parallel: true,
                    typical_duration: Duration::from_millis(typical_ms),
                    example_intents: examples.iter().map(|s| s.to_string()).collect(),
                    can_chain_with: chains.to_vec(),
                },
            );
        };

        add(
            K::ImageSearch,
            "Find images matching a natural-language query",
            vec![],
            vec![output("image_ids", T::ImageIdList)],
            3_000,
            &["damaged utility poles"],
            &[K::ImageAnalysis, K::Folder, K::CrossReference, K::Synthesis],
        );
        add(
            K::DocumentSearch,
            "Find documents by semantic match",
            vec![],
            vec![output("document_ids", T::DocumentIdList)],
            3_000,
            &["safety inspection reports"],
            &[K::DocumentAnalysis, K::CrossReference, K::Synthesis],
        );
        add(
            K::LinkSearch,
            "Find saved links matching a query",
            vec![],
            vec![output("link_ids", T::LinkIdList)],
            3_000,
            &["vendor documentation"],
            &[K::LinkAnalysis],
        );
        add(
            K::ImageAnalysis,
            "Analyze and categorize a set of images",
            vec![input("image_ids", T::ImageIdList, true)],
            vec![output("analysis", T::AnalysisResult)],
            15_000,
            &["Categorize damage types and severity"],
            &[K::Synthesis, K::Assistant],
        );
        add(
            K::DocumentAnalysis,
            "Extract findings from a set of documents",
            vec![input("document_ids", T::DocumentIdList, true)],
            vec![output("analysis", T::AnalysisResult)],
            15_000,
            &["Summarize key findings"],
            &[K::Synthesis, K::Assistant],
        );
        add(
            K::LinkAnalysis,
            "Analyze the content behind a set of links",
            vec![input("link_ids", T::LinkIdList, true)],
            vec![output("analysis", T::AnalysisResult)],
            15_000,
            &["Compare vendor offerings"],
            &[K::Synthesis, K::Assistant],
        );
        add(
            K::Synthesis,
            "Write a report from prior analysis",
            vec![
                input("analysis", T::AnalysisResult, true),
                input("image_ids", T::ImageIdList, false),
                input("document_ids", T::DocumentIdList, false),
            ],
            vec![output("report", T::TextReport)],
            30_000,
            &["Write an executive summary of findings"],
            &[],
        );
        add(
            K::Folder,
            "Propose a folder layout for a set of files",
            vec![
                input("image_ids", T::ImageIdList, true),
                input("document_ids", T::DocumentIdList, false),
            ],
            vec![output("folder_plan", T::FolderPlan)],
            10_000,
            &["Sort by damage severity"],
            &[],
        );
        add(
            K::CrossReference,
            "Relate images to documents",
            vec![
                input("image_ids", T::ImageIdList, true),
                input("document_ids", T::DocumentIdList, true),
            ],
            vec![
                output("cross_reference", T::CrossReference),
                output("report", T::TextReport),
            ],
            20_000,
            &["Cross-reference images with maintenance records"],
            &[K::Synthesis, K::Assistant],
        );
        add(
            K::Assistant,
            "Answer free-form requests using whatever context is available",
            vec![
                input("image_ids", T::ImageIdList, false),
                input("document_ids", T::DocumentIdList, false),
                input("link_ids", T::LinkIdList, false),
                input("analysis", T::AnalysisResult, false),
                input("report", T::TextReport, false),
            ],
            vec![output("report", T::TextReport)],
            20_000,
            &["What do these have in common?"],
            &[],
        );

        Self { contracts }
    }

    pub fn get(&self, kind: CapabilityKind) -> &CapabilityContract {
        // builtin() covers every kind
        &self.contracts[&kind]
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapabilityContract> {
        self.contracts.values()
    }
}

impl Default for ContractSet {
    fn default() -> Self {
        Self::builtin()
    }
}

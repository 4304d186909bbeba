// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! Typed values flowing between steps
//!
//! Every value exchanged between steps carries a [`DataType`] from a closed
//! vocabulary. Each data type fixes the shape of its payload, so contract
//! checks can be done when the graph is built and when outputs come back.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Data type tags understood by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Image identifiers
    ImageIdList,
    /// Document identifiers
    DocumentIdList,
    /// Link identifiers
    LinkIdList,
    /// Free-text report
    TextReport,
    /// Structured analysis (summary, findings)
    AnalysisResult,
    /// Relationships between images and documents
    CrossReference,
    /// Proposed folder layout
    FolderPlan,
}

impl DataType {
    pub const ALL: [DataType; 7] = [
        DataType::ImageIdList,
        DataType::DocumentIdList,
        DataType::LinkIdList,
        DataType::TextReport,
        DataType::AnalysisResult,
        DataType::CrossReference,
        DataType::FolderPlan,
    ];

    /// Payload shape values of this type must have
    pub fn payload_kind(&self) -> PayloadKind {
        match self {
            Self::ImageIdList | Self::DocumentIdList | Self::LinkIdList => PayloadKind::List,
            Self::TextReport => PayloadKind::Text,
            Self::AnalysisResult | Self::CrossReference | Self::FolderPlan => {
                PayloadKind::Structured
            }
        }
    }

    /// Whether values of this type can ever be unioned
    ///
    /// Text and structured payloads are never mergeable; multiple producers
    /// of those resolve last-wins.
    pub fn supports_merge(&self) -> bool {
        self.payload_kind() == PayloadKind::List
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImageIdList => "image_id_list",
            Self::DocumentIdList => "document_id_list",
            Self::LinkIdList => "link_id_list",
            Self::TextReport => "text_report",
            Self::AnalysisResult => "analysis_result",
            Self::CrossReference => "cross_reference",
            Self::FolderPlan => "folder_plan",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    List,
    Text,
    Structured,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Text => write!(f, "text"),
            Self::Structured => write!(f, "structured"),
        }
    }
}

/// Payload carried by a typed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    List(Vec<String>),
    Text(String),
    Structured(serde_json::Value),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::List(_) => PayloadKind::List,
            Self::Text(_) => PayloadKind::Text,
            Self::Structured(_) => PayloadKind::Structured,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Short human-readable description, used in reports and logs
    pub fn describe(&self) -> String {
        match self {
            Self::List(items) => format!("{} item{}", items.len(), if items.len() == 1 { "" } else { "s" }),
            Self::Text(text) => format!("{} chars", text.chars().count()),
            Self::Structured(_) => "structured".to_string(),
        }
    }
}

/// A named, typed unit of data exchanged between steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub mergeable: bool,
    pub payload: Payload,
}

impl TypedValue {
    pub fn new(name: impl Into<String>, data_type: DataType, payload: Payload) -> Self {
        Self {
            name: name.into(),
            data_type,
            mergeable: false,
            payload,
        }
    }

    /// Identifier list value, mergeable
    pub fn id_list(name: impl Into<String>, data_type: DataType, ids: Vec<String>) -> Self {
        Self {
            name: name.into(),
            data_type,
            mergeable: true,
            payload: Payload::List(ids),
        }
    }

    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, DataType::TextReport, Payload::Text(text.into()))
    }

    pub fn structured(name: impl Into<String>, data_type: DataType, value: serde_json::Value) -> Self {
        Self::new(name, data_type, Payload::Structured(value))
    }

    pub fn with_mergeable(mut self, mergeable: bool) -> Self {
        self.mergeable = mergeable;
        self
    }

    /// Whether the payload shape agrees with the declared data type
    pub fn is_well_formed(&self) -> bool {
        self.payload.kind() == self.data_type.payload_kind()
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! Simulated capability
//!
//! Produces deterministic, contract-conforming outputs derived from the
//! intent and inputs. Backs `--simulate` runs and the test suite, and can
//! be told to misbehave (fail, hang, return garbage).

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{Capability, CapabilityContract, CapabilityKind, CapabilityOutput, CapabilityRequest, TokenUsage};
use crate::errors::CapabilityError;
use crate::pipeline::{DataType, InputPool, Payload, TypedValue};

/// How a simulated capability behaves when invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedBehavior {
    Succeed,
    /// Return an invocation error with this message
    Fail(String),
    /// Never answer (until cancelled or timed out)
    Hang,
    /// Return a value the contract does not declare
    InvalidOutput,
}

/// Simulated capability
pub struct SimulatedCapability {
    contract: CapabilityContract,
    delay: Duration,
    behavior: SimulatedBehavior,
}

impl SimulatedCapability {
    pub fn new(contract: CapabilityContract) -> Self {
        Self {
            contract,
            delay: Duration::ZERO,
            behavior: SimulatedBehavior::Succeed,
        }
    }

    /// Wait this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_behavior(mut self, behavior: SimulatedBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    fn respond(&self, request: &CapabilityRequest) -> Result<CapabilityOutput, CapabilityError> {
        match &self.behavior {
            SimulatedBehavior::Fail(message) => Err(CapabilityError::invocation(message.clone())),
            SimulatedBehavior::InvalidOutput => Ok(CapabilityOutput::new(vec![TypedValue::text(
                "unexpected",
                "not part of any contract",
            )])),
            SimulatedBehavior::Succeed | SimulatedBehavior::Hang => {
                let values: Vec<TypedValue> = self
                    .contract
                    .outputs
                    .iter()
                    .map(|slot| {
                        TypedValue::new(
                            slot.name.clone(),
                            slot.data_type,
                            synthesize(slot.data_type, request),
                        )
                        .with_mergeable(slot.mergeable)
                    })
                    .collect();

                let summary = format!(
                    "{} handled \"{}\" with {}",
                    self.contract.kind,
                    request.intent,
                    describe_inputs(&request.inputs)
                );
                let token_usage = TokenUsage {
                    input_tokens: request.intent.split_whitespace().count() as u64 * 4
                        + request.inputs.len() as u64 * 16,
                    output_tokens: values.len() as u64 * 32,
                };

                Ok(CapabilityOutput {
                    values,
                    summary: Some(summary),
                    token_usage: Some(token_usage),
                })
            }
        }
    }
}

#[async_trait]
impl Capability for SimulatedCapability {
    fn kind(&self) -> CapabilityKind {
        self.contract.kind
    }

    async fn invoke(
        &self,
        request: CapabilityRequest,
        cancel: CancellationToken,
    ) -> Result<CapabilityOutput, CapabilityError> {
        if self.behavior == SimulatedBehavior::Hang {
            cancel.cancelled().await;
            return Err(CapabilityError::Cancelled);
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(CapabilityError::Cancelled),
            _ = tokio::time::sleep(self.delay) => {}
        }

        self.respond(&request)
    }
}

fn describe_inputs(inputs: &InputPool) -> String {
    if inputs.is_empty() {
        return "no inputs".to_string();
    }
    inputs
        .iter()
        .map(|(name, value)| format!("{} ({})", name, value.payload.describe()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn slug(intent: &str) -> String {
    let words: Vec<String> = intent
        .split_whitespace()
        .take(2)
        .map(|w| {
            w.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();

    if words.is_empty() {
        "item".to_string()
    } else {
        words.join("-")
    }
}

fn input_ids(inputs: &InputPool, data_type: DataType) -> Vec<String> {
    inputs
        .iter()
        .filter(|(_, v)| v.data_type == data_type)
        .filter_map(|(_, v)| v.payload.as_list())
        .flat_map(|ids| ids.iter().cloned())
        .collect()
}

fn synthesize(data_type: DataType, request: &CapabilityRequest) -> Payload {
    let inputs = &request.inputs;
    match data_type {
        DataType::ImageIdList | DataType::DocumentIdList | DataType::LinkIdList => {
            let prefix = match data_type {
                DataType::ImageIdList => "img",
                DataType::DocumentIdList => "doc",
                _ => "link",
            };
            let base = slug(&request.intent);
            Payload::List((1..=3).map(|n| format!("{prefix}-{base}-{n}")).collect())
        }
        DataType::AnalysisResult => {
            let items: Vec<String> = [DataType::ImageIdList, DataType::DocumentIdList, DataType::LinkIdList]
                .into_iter()
                .flat_map(|t| input_ids(inputs, t))
                .collect();
            Payload::Structured(json!({
                "summary": format!("{} across {} item(s)", request.intent, items.len()),
                "findings": items.iter().map(|id| format!("{id}: reviewed")).collect::<Vec<_>>(),
            }))
        }
        DataType::TextReport => Payload::Text(format!(
            "{}: {} (drawing on {})",
            request.capability,
            request.intent,
            describe_inputs(inputs)
        )),
        DataType::CrossReference => {
            let images = input_ids(inputs, DataType::ImageIdList);
            let documents = input_ids(inputs, DataType::DocumentIdList);
            let relationships: Vec<_> = images
                .iter()
                .zip(documents.iter())
                .map(|(image, document)| json!({ "image": image, "document": document }))
                .collect();
            Payload::Structured(json!({
                "relationships": relationships,
                "source_files": images,
                "target_files": documents,
            }))
        }
        DataType::FolderPlan => {
            let images = input_ids(inputs, DataType::ImageIdList);
            let documents = input_ids(inputs, DataType::DocumentIdList);
            Payload::Structured(json!({
                "folders_created": [{ "name": request.intent, "file_ids": images, "document_ids": documents }],
                "files_moved": images.len(),
                "documents_moved": documents.len(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::ContractSet;

    fn make_capability(kind: CapabilityKind) -> SimulatedCapability {
        SimulatedCapability::new(ContractSet::builtin().get(kind).clone())
    }

    fn make_request(kind: CapabilityKind, intent: &str, inputs: InputPool) -> CapabilityRequest {
        CapabilityRequest {
            step: 0,
            capability: kind,
            intent: intent.into(),
            inputs,
        }
    }

    #[tokio::test]
    async fn test_search_output_conforms_to_contract() {
        let capability = make_capability(CapabilityKind::ImageSearch);
        let contract = ContractSet::builtin().get(CapabilityKind::ImageSearch).clone();

        let output = capability
            .invoke(
                make_request(CapabilityKind::ImageSearch, "Utility poles!", InputPool::default()),
                CancellationToken::new(),
            )
            .await
            .unwrap()
            .conform_to(&contract)
            .unwrap();

        assert_eq!(
            output.values[0].payload,
            Payload::List(vec![
                "img-utility-poles-1".into(),
                "img-utility-poles-2".into(),
                "img-utility-poles-3".into(),
            ])
        );
        assert!(output.token_usage.is_some());
    }

    #[tokio::test]
    async fn test_analysis_reads_inputs() {
        let capability = make_capability(CapabilityKind::ImageAnalysis);
        let mut inputs = InputPool::default();
        inputs.insert(TypedValue::id_list(
            "image_ids",
            DataType::ImageIdList,
            vec!["a".into(), "b".into()],
        ));

        let output = capability
            .invoke(
                make_request(CapabilityKind::ImageAnalysis, "categorize", inputs),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        let Payload::Structured(value) = &output.values[0].payload else {
            panic!("expected structured analysis");
        };
        assert_eq!(value["findings"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_behavior() {
        let capability = make_capability(CapabilityKind::Folder)
            .with_behavior(SimulatedBehavior::Fail("quota exceeded".into()));

        let err = capability
            .invoke(
                make_request(CapabilityKind::Folder, "sort", InputPool::default()),
                CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err, CapabilityError::invocation("quota exceeded"));
    }

    #[tokio::test]
    async fn test_hang_returns_on_cancel() {
        let capability =
            make_capability(CapabilityKind::Synthesis).with_behavior(SimulatedBehavior::Hang);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let handle = tokio::spawn(async move {
            capability
                .invoke(
                    make_request(CapabilityKind::Synthesis, "report", InputPool::default()),
                    cancel,
                )
                .await
        });
        trigger.cancel();

        assert_eq!(handle.await.unwrap().unwrap_err(), CapabilityError::Cancelled);
    }

    #[test]
    fn test_slug_falls_back_for_symbols() {
        assert_eq!(slug("!!! ???"), "item");
        assert_eq!(slug("Damaged utility poles"), "damaged-utility");
    }
}

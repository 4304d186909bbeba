// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

//! External command capability
//!
//! Runs a shell command per invocation. The request is written to the
//! command's stdin as JSON and a [`CapabilityOutput`] is read back from its
//! stdout.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::{Capability, CapabilityKind, CapabilityOutput, CapabilityRequest};
use crate::config::CommandSpec;
use crate::errors::CapabilityError;

/// Capability backed by an external command
pub struct CommandCapability {
    kind: CapabilityKind,
    spec: CommandSpec,
}

impl CommandCapability {
    pub fn new(kind: CapabilityKind, spec: CommandSpec) -> Self {
        Self { kind, spec }
    }

    async fn run(&self, request: &CapabilityRequest) -> Result<CapabilityOutput, CapabilityError> {
        let body = serde_json::to_vec(request)
            .map_err(|e| CapabilityError::invocation(format!("failed to encode request: {e}")))?;

        let mut cmd = Command::new(&self.spec.shell);
        cmd.arg("-c").arg(&self.spec.command);
        cmd.envs(&self.spec.env);
        cmd.env("AGENTFLOW_CAPABILITY", self.kind.as_str());
        cmd.env("AGENTFLOW_STEP", request.step.to_string());
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // Dropping the invocation future (timeout, cancellation) kills the child
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            CapabilityError::invocation(format!(
                "failed to start '{}' via {}: {e}",
                self.spec.command, self.spec.shell
            ))
        })?;

        // Feed stdin while stdout and stderr drain so neither pipe can fill up
        let stdin = child.stdin.take();
        let write_request = async move {
            let Some(mut stdin) = stdin else { return Ok(()) };
            match stdin.write_all(&body).await {
                // Command exited without reading its input; its status decides
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
                Err(e) => Err(CapabilityError::invocation(format!(
                    "failed to write request: {e}"
                ))),
                // stdin closes on drop so the command sees EOF
                Ok(()) => Ok(()),
            }
        };

        let (written, output) = tokio::join!(write_request, child.wait_with_output());
        let output = output.map_err(|e| CapabilityError::invocation(e.to_string()))?;
        written?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let code = output.status.code().unwrap_or(-1);
            return Err(CapabilityError::invocation(format!(
                "command exited with code {code}: {}",
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            CapabilityError::invalid_output(format!("stdout is not a capability output: {e}"))
        })
    }
}

#[async_trait]
impl Capability for CommandCapability {
    fn kind(&self) -> CapabilityKind {
        self.kind
    }

    async fn invoke(
        &self,
        request: CapabilityRequest,
        cancel: CancellationToken,
    ) -> Result<CapabilityOutput, CapabilityError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(CapabilityError::Cancelled),
            result = self.run(&request) => result,
        }
    }

    async fn check_available(&self) -> bool {
        Command::new(&self.spec.shell)
            .arg("-c")
            .arg("true")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

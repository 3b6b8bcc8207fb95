// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use burrow_config::StepSettings;
use tracing::{info, instrument};

use crate::command::CommandRunner;
use crate::error::StepError;

/// Unit of host setup run while the tunnel is down. Opaque to the
/// orchestrator beyond success or failure.
#[async_trait]
pub trait ProvisionStep: Send + Sync {
	fn name(&self) -> &str;
	async fn run(&self) -> Result<(), StepError>;
}

/// Step backed by an external command.
pub struct CommandStep {
	name: String,
	command: Vec<String>,
	runner: Arc<dyn CommandRunner>,
}

impl CommandStep {
	pub fn new(name: impl Into<String>, command: Vec<String>, runner: Arc<dyn CommandRunner>) -> Self {
		Self {
			name: name.into(),
			command,
			runner,
		}
	}

	pub fn from_settings(settings: &StepSettings, runner: Arc<dyn CommandRunner>) -> Self {
		Self::new(settings.name.clone(), settings.command.clone(), runner)
	}
}

#[async_trait]
impl ProvisionStep for CommandStep {
	fn name(&self) -> &str {
		&self.name
	}

	#[instrument(skip(self), fields(step = %self.name))]
	async fn run(&self) -> Result<(), StepError> {
		let Some((program, rest)) = self.command.split_first() else {
			return Err(StepError::Failed {
				name: self.name.clone(),
				code: "none".to_string(),
				stderr: "empty command".to_string(),
			});
		};
		let args: Vec<&str> = rest.iter().map(String::as_str).collect();

		let output = self.runner.run(program, &args).await?;
		if !output.success() {
			return Err(StepError::Failed {
				name: self.name.clone(),
				code: output.code_label(),
				stderr: output.stderr,
			});
		}
		info!("step finished");
		Ok(())
	}
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{trace, warn};

use crate::error::CommandError;

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
	/// `None` when the process was killed by a signal.
	pub code: Option<i32>,
	pub stdout: String,
	pub stderr: String,
}

impl CommandOutput {
	pub fn success(&self) -> bool {
		self.code == Some(0)
	}

	/// Exit code for messages, `signal` when there was none.
	pub fn code_label(&self) -> String {
		self.code
			.map(|c| c.to_string())
			.unwrap_or_else(|| "signal".to_string())
	}
}

/// Seam over process execution. A non-zero exit is not an error at this
/// level; callers decide what a failure means.
#[async_trait]
pub trait CommandRunner: Send + Sync {
	async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError>;
}

/// Runs commands on the host with stdin closed.
pub struct SystemCommandRunner;

impl SystemCommandRunner {
	pub fn new() -> Self {
		Self
	}
}

impl Default for SystemCommandRunner {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
	async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
		trace!(cmd = %format!("{program} {}", args.join(" ")), "running command");

		let output = Command::new(program)
			.args(args)
			.stdin(Stdio::null())
			.kill_on_drop(true)
			.output()
			.await
			.map_err(|e| {
				if e.kind() == std::io::ErrorKind::NotFound {
					warn!(program, "program not found in PATH");
					CommandError::NotFound {
						program: program.to_string(),
					}
				} else {
					CommandError::Io {
						program: program.to_string(),
						source: e,
					}
				}
			})?;

		Ok(CommandOutput {
			code: output.status.code(),
			stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
			stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
		})
	}
}

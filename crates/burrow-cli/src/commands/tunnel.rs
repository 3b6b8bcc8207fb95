// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use anyhow::Result;
use burrow_config::ProvisionConfig;
use burrow_provision::{RunLock, ServiceState};
use clap::Subcommand;
use console::style;
use tracing::instrument;

use super::{controller, system_runner};

#[derive(Debug, Clone, Subcommand)]
pub enum TunnelCommands {
	/// Enable and start the tunnel unit, waiting until it is active
	Up,
	/// Disable and stop the tunnel unit, waiting until it is inactive
	Down,
	/// Show whether the unit is enabled and running
	Status,
}

#[instrument(skip(cfg))]
pub async fn handle(command: TunnelCommands, cfg: &ProvisionConfig) -> Result<()> {
	let controller = controller(cfg, system_runner());

	match command {
		TunnelCommands::Up => {
			let _lock = RunLock::acquire(&cfg.run.lock_file)?;
			controller.start_tunnel().await?;
			println!("{} {} is up", style("✓").green().bold(), controller.unit());
		}
		TunnelCommands::Down => {
			let _lock = RunLock::acquire(&cfg.run.lock_file)?;
			controller.stop_tunnel().await?;
			println!("{} {} is down", style("✓").green().bold(), controller.unit());
		}
		TunnelCommands::Status => {
			let state = controller.state().await?;
			let shown = match state {
				ServiceState::EnabledRunning => style(state.to_string()).green(),
				ServiceState::Unknown => style(state.to_string()).red(),
				_ => style(state.to_string()).yellow(),
			};
			println!("{}: {}", controller.unit(), shown);
		}
	}
	Ok(())
}

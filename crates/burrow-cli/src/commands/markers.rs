// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use anyhow::Result;
use burrow_config::ProvisionConfig;
use burrow_provision::{Marker, RunLock, RunMarkers, RunOutcome};
use clap::Subcommand;
use console::style;

#[derive(Debug, Clone, Subcommand)]
pub enum MarkerCommands {
	/// Create all run markers, as a first-boot hook would
	Init,
	/// Classify the last run from the markers and the run lock
	Status,
}

pub async fn handle(command: MarkerCommands, cfg: &ProvisionConfig) -> Result<()> {
	let markers = RunMarkers::new(&cfg.run.marker_dir);

	match command {
		MarkerCommands::Init => {
			markers.create_all().await?;
			println!(
				"{} Run markers created in {}",
				style("✓").green().bold(),
				markers.dir().display()
			);
		}
		MarkerCommands::Status => {
			let running = RunLock::is_held(&cfg.run.lock_file)?;
			let outcome = markers.outcome(running).await?;
			let shown = match outcome {
				RunOutcome::Succeeded => style(outcome.to_string()).green(),
				RunOutcome::Failed | RunOutcome::Interrupted => style(outcome.to_string()).red(),
				_ => style(outcome.to_string()).yellow(),
			};
			println!("Last run: {shown}");
			for marker in Marker::ALL {
				let present = markers.exists(marker).await?;
				println!(
					"  {} {}",
					if present { style("present").dim() } else { style("cleared").dim() },
					marker.file_name()
				);
			}
		}
	}
	Ok(())
}

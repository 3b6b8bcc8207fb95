// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use anyhow::Result;
use burrow_config::ProvisionConfig;
use burrow_provision::{
	CommandStep, HttpOracle, HttpStatusReporter, LoginNotice, NoopStatusReporter, ProvisionPlan,
	ProvisionStep, Provisioner, RunLock, RunMarkers, RunReport, StatusReporter,
};
use console::style;
use tracing::{info, warn};

use super::{controller, system_runner};

const HOSTNAME_FILE: &str = "/proc/sys/kernel/hostname";

async fn host_name() -> String {
	match tokio::fs::read_to_string(HOSTNAME_FILE).await {
		Ok(name) if !name.trim().is_empty() => name.trim().to_string(),
		Ok(_) => "unknown".to_string(),
		Err(e) => {
			warn!(error = %e, "cannot read hostname");
			"unknown".to_string()
		}
	}
}

async fn reporter(cfg: &ProvisionConfig) -> Result<Arc<dyn StatusReporter>> {
	match &cfg.status {
		Some(settings) => {
			let host = host_name().await;
			Ok(Arc::new(HttpStatusReporter::from_settings(settings, &host)?))
		}
		None => Ok(Arc::new(NoopStatusReporter)),
	}
}

/// Runs the full state machine under the run lock. Returns the process exit
/// code.
pub async fn handle(cfg: &ProvisionConfig) -> Result<u8> {
	let _lock = RunLock::acquire(&cfg.run.lock_file)?;
	info!(unit = %cfg.service.unit(), "starting provisioning run");

	let runner = system_runner();
	let steps: Vec<Arc<dyn ProvisionStep>> = cfg
		.steps
		.iter()
		.map(|s| Arc::new(CommandStep::from_settings(s, runner.clone())) as Arc<dyn ProvisionStep>)
		.collect();

	let provisioner = Provisioner::new(
		ProvisionPlan::from_config(cfg)?,
		runner.clone(),
		controller(cfg, runner),
		Arc::new(HttpOracle::new(cfg.oracle.url.clone())?),
		RunMarkers::new(&cfg.run.marker_dir),
		LoginNotice::new(&cfg.run.login_notice),
	)
	.with_reporter(reporter(cfg).await?)
	.with_steps(steps);

	let report = provisioner.run().await;
	print_report(&report, cfg);
	Ok(report.exit_code())
}

fn print_report(report: &RunReport, cfg: &ProvisionConfig) {
	let trail = report
		.trail
		.iter()
		.map(ToString::to_string)
		.collect::<Vec<_>>()
		.join(" -> ");

	match report.failure_message() {
		None => {
			println!("{} Provisioning finished", style("✓").green().bold());
			println!("  {}", style(trail).dim());
		}
		Some(message) => {
			eprintln!("{} Provisioning failed", style("✗").red().bold());
			eprintln!("  {}", style(trail).dim());
			eprintln!("  {}", style(message).red());
			if let Some(log) = &cfg.run.log_file {
				eprintln!("  Log: {}", log.display());
			}
		}
	}
}

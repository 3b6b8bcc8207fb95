// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The provisioning run: precondition, tunnel down, reconfigure, other
//! setup, then tunnel up and verification on every exit path.

use std::any::Any;
use std::fmt;
use std::net::IpAddr;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use burrow_config::{ConfigError, ProvisionConfig};
use burrow_wg::{render_config, write_config, TableRegistry, TunnelConfig};
use futures::FutureExt;
use tracing::{error, info, instrument, warn};

use crate::command::CommandRunner;
use crate::error::{ProvisionError, Result};
use crate::markers::{Marker, RunMarkers};
use crate::notice::LoginNotice;
use crate::oracle::NetworkProbe;
use crate::precondition::check_direct_connectivity;
use crate::routing::detect_routing;
use crate::service::TunnelServiceController;
use crate::status::{NoopStatusReporter, RunStatus, StatusReporter};
use crate::steps::ProvisionStep;
use crate::verify::verify_tunneled;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
	Init,
	PreconditionChecked,
	TunnelStopped,
	ConfiguredAndOtherSetupApplied,
	TunnelStarted,
	Verified,
	Done,
	Failed(String),
}

impl fmt::Display for RunState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Init => f.write_str("init"),
			Self::PreconditionChecked => f.write_str("precondition_checked"),
			Self::TunnelStopped => f.write_str("tunnel_stopped"),
			Self::ConfiguredAndOtherSetupApplied => f.write_str("configured"),
			Self::TunnelStarted => f.write_str("tunnel_started"),
			Self::Verified => f.write_str("verified"),
			Self::Done => f.write_str("done"),
			Self::Failed(reason) => write!(f, "failed: {reason}"),
		}
	}
}

/// Inputs of one run, taken from a validated [`ProvisionConfig`].
#[derive(Debug, Clone)]
pub struct ProvisionPlan {
	pub tunnel: TunnelConfig,
	pub config_path: PathBuf,
	pub rt_tables: PathBuf,
	pub probe_host: String,
	/// Direct-path identity: the precondition expects it, the verifier
	/// expects anything else.
	pub expected_ip: IpAddr,
	pub expected_country: String,
	pub log_file: Option<PathBuf>,
}

impl ProvisionPlan {
	pub fn from_config(cfg: &ProvisionConfig) -> std::result::Result<Self, ConfigError> {
		let (expected_ip, expected_country) = cfg.oracle.expected().ok_or_else(|| {
			ConfigError::missing_field("oracle.expected_ip / oracle.expected_country")
		})?;
		Ok(Self {
			tunnel: cfg.tunnel.clone(),
			config_path: cfg.service.config_path.clone(),
			rt_tables: cfg.rt_tables.clone(),
			probe_host: cfg.oracle.probe_host.clone(),
			expected_ip,
			expected_country: expected_country.to_string(),
			log_file: cfg.run.log_file.clone(),
		})
	}
}

/// What happened during a run. `error` comes from the main phase,
/// `cleanup_error` from restarting or verifying the tunnel.
#[derive(Debug)]
pub struct RunReport {
	pub trail: Vec<RunState>,
	pub error: Option<ProvisionError>,
	pub cleanup_error: Option<ProvisionError>,
}

impl RunReport {
	pub fn succeeded(&self) -> bool {
		self.error.is_none() && self.cleanup_error.is_none()
	}

	pub fn exit_code(&self) -> u8 {
		if self.succeeded() {
			0
		} else {
			1
		}
	}

	pub fn failure_message(&self) -> Option<String> {
		match (&self.error, &self.cleanup_error) {
			(None, None) => None,
			(Some(e), None) | (None, Some(e)) => Some(e.to_string()),
			(Some(e), Some(c)) => Some(format!("{e}; then: {c}")),
		}
	}

	pub fn reached(&self, state: &RunState) -> bool {
		self.trail.contains(state)
	}
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		(*s).to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"non-string panic payload".to_string()
	}
}

fn advance(trail: &mut Vec<RunState>, state: RunState) {
	info!(state = %state, "provisioning state");
	trail.push(state);
}

pub struct Provisioner {
	plan: ProvisionPlan,
	runner: Arc<dyn CommandRunner>,
	controller: TunnelServiceController,
	probe: Arc<dyn NetworkProbe>,
	reporter: Arc<dyn StatusReporter>,
	steps: Vec<Arc<dyn ProvisionStep>>,
	markers: RunMarkers,
	notice: LoginNotice,
}

impl Provisioner {
	pub fn new(
		plan: ProvisionPlan,
		runner: Arc<dyn CommandRunner>,
		controller: TunnelServiceController,
		probe: Arc<dyn NetworkProbe>,
		markers: RunMarkers,
		notice: LoginNotice,
	) -> Self {
		Self {
			plan,
			runner,
			controller,
			probe,
			reporter: Arc::new(NoopStatusReporter),
			steps: Vec::new(),
			markers,
			notice,
		}
	}

	pub fn with_reporter(mut self, reporter: Arc<dyn StatusReporter>) -> Self {
		self.reporter = reporter;
		self
	}

	pub fn with_steps(mut self, steps: Vec<Arc<dyn ProvisionStep>>) -> Self {
		self.steps = steps;
		self
	}

	/// Runs the whole state machine. Never returns early: the tunnel is
	/// started and checked whatever happened before.
	#[instrument(skip(self), fields(unit = %self.controller.unit()))]
	pub async fn run(&self) -> RunReport {
		let mut trail = vec![RunState::Init];

		if let Err(e) = self.markers.clear(Marker::Started).await {
			warn!(error = %e, "could not clear started marker");
		}
		self.reporter.report(RunStatus::Running, None).await;

		let error = match AssertUnwindSafe(self.apply(&mut trail)).catch_unwind().await {
			Ok(Ok(())) => None,
			Ok(Err(e)) => Some(e),
			Err(payload) => Some(ProvisionError::Panicked(panic_message(payload))),
		};
		if let Some(e) = &error {
			error!(error = %e, "provisioning failed, restoring tunnel");
		}

		let cleanup_error = self.restore(&mut trail).await.err();
		if let Some(e) = &cleanup_error {
			error!(error = %e, "tunnel restore or verification failed");
		}

		if let Err(e) = self.markers.clear(Marker::Finished).await {
			warn!(error = %e, "could not clear finished marker");
		}

		let mut report = RunReport {
			trail,
			error,
			cleanup_error,
		};
		match report.failure_message() {
			None => {
				if let Err(e) = self.markers.clear(Marker::Success).await {
					warn!(error = %e, "could not clear success marker");
				}
				if let Err(e) = self.notice.clear().await {
					warn!(error = %e, "could not remove login notice");
				}
				self.reporter.report(RunStatus::Done, None).await;
				advance(&mut report.trail, RunState::Done);
			}
			Some(message) => {
				if let Err(e) = self
					.notice
					.write_failure(&message, self.plan.log_file.as_deref())
					.await
				{
					warn!(error = %e, "could not write login notice");
				}
				self.reporter.report(RunStatus::Failed, Some(&message)).await;
				advance(&mut report.trail, RunState::Failed(message));
			}
		}
		report
	}

	/// Main phase. Stops at the first error.
	async fn apply(&self, trail: &mut Vec<RunState>) -> Result<()> {
		let plan = &self.plan;

		check_direct_connectivity(
			self.probe.as_ref(),
			&plan.probe_host,
			plan.expected_ip,
			&plan.expected_country,
		)
		.await?;
		if let Some(endpoint) = &plan.tunnel.peer_endpoint {
			self.probe.resolve(endpoint.host()).await?;
		}
		advance(trail, RunState::PreconditionChecked);

		self.controller.stop_tunnel().await?;
		advance(trail, RunState::TunnelStopped);

		let snapshot = detect_routing(self.runner.as_ref()).await?;
		let policy = &plan.tunnel.routing;
		TableRegistry::new(&plan.rt_tables)
			.ensure(policy.table_id, &policy.table_name)
			.await?;
		let text = render_config(&snapshot, &plan.tunnel)?;
		write_config(&plan.config_path, &text).await?;
		info!(path = %plan.config_path.display(), "tunnel config written");

		for step in &self.steps {
			info!(step = step.name(), "running provisioning step");
			step.run().await?;
		}
		advance(trail, RunState::ConfiguredAndOtherSetupApplied);
		Ok(())
	}

	/// Cleanup phase. A failed start is terminal; verification is skipped.
	async fn restore(&self, trail: &mut Vec<RunState>) -> Result<()> {
		self.controller.start_tunnel().await?;
		advance(trail, RunState::TunnelStarted);

		verify_tunneled(
			self.probe.as_ref(),
			self.plan.expected_ip,
			&self.plan.expected_country,
		)
		.await?;
		advance(trail, RunState::Verified);
		Ok(())
	}
}

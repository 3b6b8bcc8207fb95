// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tunnel service control.
//!
//! `systemctl enable`/`start` return before the interface is actually up, so
//! every transition is confirmed by re-querying the manager within a fixed
//! poll budget instead of being trusted on return.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use burrow_config::ServiceSettings;
use tracing::{debug, info, instrument, warn};

use crate::command::{CommandOutput, CommandRunner};
use crate::error::ServiceError;

/// Seam over the host's service manager.
#[async_trait]
pub trait ServiceManager: Send + Sync {
	async fn is_enabled(&self, unit: &str) -> Result<bool, ServiceError>;
	async fn is_active(&self, unit: &str) -> Result<bool, ServiceError>;
	async fn enable(&self, unit: &str) -> Result<(), ServiceError>;
	async fn disable(&self, unit: &str) -> Result<(), ServiceError>;
	async fn start(&self, unit: &str) -> Result<(), ServiceError>;
	async fn stop(&self, unit: &str) -> Result<(), ServiceError>;
	/// True while a job for `unit` is queued or a tunnel control process is
	/// running. Jobs for other units do not count.
	async fn is_busy(&self, unit: &str) -> Result<bool, ServiceError>;
}

/// Whether a `list-jobs` line (`JOB UNIT TYPE STATE`) belongs to `unit`.
fn job_is_for(line: &str, unit: &str) -> bool {
	match line.split_whitespace().nth(1) {
		Some(name) => name == unit || name.strip_suffix(".service") == Some(unit),
		None => false,
	}
}

/// `systemctl` plus a check for a running `wg-quick` control process.
pub struct SystemdServiceManager {
	runner: Arc<dyn CommandRunner>,
}

impl SystemdServiceManager {
	pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
		Self { runner }
	}

	async fn systemctl(&self, args: &[&str]) -> Result<CommandOutput, ServiceError> {
		Ok(self.runner.run("systemctl", args).await?)
	}

	async fn mutate(&self, action: &'static str, unit: &str) -> Result<(), ServiceError> {
		let out = self.systemctl(&[action, unit]).await?;
		if !out.success() {
			return Err(ServiceError::CommandFailed {
				action,
				unit: unit.to_string(),
				stderr: out.stderr,
			});
		}
		debug!(action, unit, "systemctl succeeded");
		Ok(())
	}
}

#[async_trait]
impl ServiceManager for SystemdServiceManager {
	async fn is_enabled(&self, unit: &str) -> Result<bool, ServiceError> {
		Ok(self.systemctl(&["is-enabled", "--quiet", unit]).await?.success())
	}

	async fn is_active(&self, unit: &str) -> Result<bool, ServiceError> {
		Ok(self.systemctl(&["is-active", "--quiet", unit]).await?.success())
	}

	async fn enable(&self, unit: &str) -> Result<(), ServiceError> {
		self.mutate("enable", unit).await
	}

	async fn disable(&self, unit: &str) -> Result<(), ServiceError> {
		self.mutate("disable", unit).await
	}

	async fn start(&self, unit: &str) -> Result<(), ServiceError> {
		self.mutate("start", unit).await
	}

	async fn stop(&self, unit: &str) -> Result<(), ServiceError> {
		self.mutate("stop", unit).await
	}

	async fn is_busy(&self, unit: &str) -> Result<bool, ServiceError> {
		let jobs = self.systemctl(&["list-jobs", "--no-legend"]).await?;
		if jobs.success() {
			if let Some(job) = jobs.stdout.lines().find(|line| job_is_for(line, unit)) {
				debug!(unit, job, "tunnel unit has a queued job");
				return Ok(true);
			}
		}
		let wg_quick = self.runner.run("pgrep", &["-x", "wg-quick"]).await?;
		Ok(wg_quick.success())
	}
}

/// Observed state of the tunnel unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
	/// Running without auto-start, or not yet observed.
	Unknown,
	Disabled,
	EnabledStopped,
	EnabledRunning,
}

impl ServiceState {
	pub fn from_flags(enabled: bool, active: bool) -> Self {
		match (enabled, active) {
			(true, true) => Self::EnabledRunning,
			(true, false) => Self::EnabledStopped,
			(false, false) => Self::Disabled,
			(false, true) => Self::Unknown,
		}
	}
}

impl fmt::Display for ServiceState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Unknown => "unknown",
			Self::Disabled => "disabled",
			Self::EnabledStopped => "enabled, stopped",
			Self::EnabledRunning => "enabled, running",
		})
	}
}

/// Poll budgets for state confirmation and for waiting on a busy manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
	pub attempts: u32,
	pub interval: Duration,
	pub busy_attempts: u32,
}

impl Default for PollPolicy {
	fn default() -> Self {
		Self {
			attempts: 30,
			interval: Duration::from_secs(1),
			busy_attempts: 120,
		}
	}
}

impl From<&ServiceSettings> for PollPolicy {
	fn from(settings: &ServiceSettings) -> Self {
		Self {
			attempts: settings.poll_attempts,
			interval: settings.poll_interval,
			busy_attempts: settings.busy_attempts,
		}
	}
}

pub struct TunnelServiceController {
	manager: Arc<dyn ServiceManager>,
	unit: String,
	poll: PollPolicy,
}

impl TunnelServiceController {
	pub fn new(manager: Arc<dyn ServiceManager>, unit: impl Into<String>, poll: PollPolicy) -> Self {
		Self {
			manager,
			unit: unit.into(),
			poll,
		}
	}

	pub fn unit(&self) -> &str {
		&self.unit
	}

	pub async fn state(&self) -> Result<ServiceState, ServiceError> {
		let enabled = self.manager.is_enabled(&self.unit).await?;
		let active = self.manager.is_active(&self.unit).await?;
		Ok(ServiceState::from_flags(enabled, active))
	}

	/// Disables auto-start and stops the unit, then waits for it to go
	/// inactive. Only queries the manager when already stopped and disabled.
	#[instrument(skip(self), fields(unit = %self.unit))]
	pub async fn stop_tunnel(&self) -> Result<(), ServiceError> {
		self.wait_until_idle().await?;

		if self.manager.is_enabled(&self.unit).await? {
			info!("disabling tunnel auto-start");
			self.manager.disable(&self.unit).await?;
		}
		if self.manager.is_active(&self.unit).await? {
			info!("stopping tunnel");
			self.manager.stop(&self.unit).await?;
		}

		if self.poll_active(false).await? {
			Ok(())
		} else {
			Err(ServiceError::StopTimeout {
				unit: self.unit.clone(),
				attempts: self.poll.attempts,
			})
		}
	}

	/// Enables auto-start and starts the unit, then waits for it to become
	/// active.
	#[instrument(skip(self), fields(unit = %self.unit))]
	pub async fn start_tunnel(&self) -> Result<(), ServiceError> {
		if !self.manager.is_enabled(&self.unit).await? {
			info!("enabling tunnel auto-start");
			self.manager.enable(&self.unit).await?;
		}
		if !self.manager.is_active(&self.unit).await? {
			info!("starting tunnel");
			self.manager.start(&self.unit).await?;
		}

		if self.poll_active(true).await? {
			Ok(())
		} else {
			Err(ServiceError::StartTimeout {
				unit: self.unit.clone(),
				attempts: self.poll.attempts,
			})
		}
	}

	/// Polls `is_active` until it equals `want`. Returns false when the
	/// budget runs out.
	async fn poll_active(&self, want: bool) -> Result<bool, ServiceError> {
		for attempt in 1..=self.poll.attempts {
			if self.manager.is_active(&self.unit).await? == want {
				debug!(attempt, active = want, "tunnel reached wanted state");
				return Ok(true);
			}
			if attempt < self.poll.attempts {
				tokio::time::sleep(self.poll.interval).await;
			}
		}
		warn!(attempts = self.poll.attempts, active = want, "tunnel did not reach wanted state");
		Ok(false)
	}

	async fn wait_until_idle(&self) -> Result<(), ServiceError> {
		for attempt in 1..=self.poll.busy_attempts.max(1) {
			if !self.manager.is_busy(&self.unit).await? {
				return Ok(());
			}
			debug!(attempt, "service manager busy, waiting");
			tokio::time::sleep(self.poll.interval).await;
		}
		Err(ServiceError::ManagerBusy {
			attempts: self.poll.busy_attempts,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::command::CommandOutput;
	use crate::testing::{MockCommandRunner, MockServiceManager, ServiceCall};
	use tokio::time::Instant;

	const UNIT: &str = "wg-quick@wg0";

	fn controller(manager: &MockServiceManager) -> TunnelServiceController {
		TunnelServiceController::new(Arc::new(manager.clone()), UNIT, PollPolicy::default())
	}

	#[tokio::test(start_paused = true)]
	async fn stop_when_already_stopped_only_queries() {
		let manager = MockServiceManager::new(false, false);
		controller(&manager).stop_tunnel().await.unwrap();

		let calls = manager.calls();
		assert!(calls.iter().all(|c| matches!(
			c,
			ServiceCall::IsBusy | ServiceCall::IsEnabled | ServiceCall::IsActive
		)));
		assert_eq!(controller(&manager).state().await.unwrap(), ServiceState::Disabled);
	}

	#[tokio::test(start_paused = true)]
	async fn stop_twice_is_idempotent() {
		let manager = MockServiceManager::new(true, true);
		let ctl = controller(&manager);
		ctl.stop_tunnel().await.unwrap();
		manager.clear_calls();

		ctl.stop_tunnel().await.unwrap();
		assert!(!manager.calls().contains(&ServiceCall::Disable));
		assert!(!manager.calls().contains(&ServiceCall::Stop));
	}

	#[tokio::test(start_paused = true)]
	async fn stop_disables_then_stops() {
		let manager = MockServiceManager::new(true, true);
		controller(&manager).stop_tunnel().await.unwrap();

		let calls = manager.calls();
		let disable = calls.iter().position(|c| *c == ServiceCall::Disable).unwrap();
		let stop = calls.iter().position(|c| *c == ServiceCall::Stop).unwrap();
		assert!(disable < stop);
		assert_eq!(controller(&manager).state().await.unwrap(), ServiceState::Disabled);
	}

	#[tokio::test(start_paused = true)]
	async fn stop_waits_for_slow_deactivation() {
		let manager = MockServiceManager::new(true, true).with_settle_polls(5);
		let started = Instant::now();
		controller(&manager).stop_tunnel().await.unwrap();
		assert_eq!(started.elapsed(), Duration::from_secs(5));
	}

	#[tokio::test(start_paused = true)]
	async fn stop_times_out_within_budget() {
		let manager = MockServiceManager::new(true, true).stuck();
		let started = Instant::now();
		let err = controller(&manager).stop_tunnel().await.unwrap_err();

		assert!(matches!(err, ServiceError::StopTimeout { attempts: 30, .. }));
		assert!(started.elapsed() <= Duration::from_secs(30));
	}

	#[tokio::test(start_paused = true)]
	async fn start_times_out_within_budget() {
		let manager = MockServiceManager::new(false, false).stuck();
		let started = Instant::now();
		let err = controller(&manager).start_tunnel().await.unwrap_err();

		assert!(matches!(err, ServiceError::StartTimeout { attempts: 30, .. }));
		assert!(started.elapsed() <= Duration::from_secs(30));
	}

	#[tokio::test(start_paused = true)]
	async fn start_enables_and_starts() {
		let manager = MockServiceManager::new(false, false);
		controller(&manager).start_tunnel().await.unwrap();

		let calls = manager.calls();
		assert!(calls.contains(&ServiceCall::Enable));
		assert!(calls.contains(&ServiceCall::Start));
		assert_eq!(
			controller(&manager).state().await.unwrap(),
			ServiceState::EnabledRunning
		);
	}

	#[tokio::test(start_paused = true)]
	async fn start_when_running_only_queries() {
		let manager = MockServiceManager::new(true, true);
		controller(&manager).start_tunnel().await.unwrap();
		assert!(!manager.calls().contains(&ServiceCall::Enable));
		assert!(!manager.calls().contains(&ServiceCall::Start));
	}

	#[tokio::test(start_paused = true)]
	async fn stop_waits_for_busy_manager() {
		let manager = MockServiceManager::new(true, true).with_busy_polls(3);
		let started = Instant::now();
		controller(&manager).stop_tunnel().await.unwrap();

		let busy = manager.calls().iter().filter(|c| **c == ServiceCall::IsBusy).count();
		assert_eq!(busy, 4);
		assert!(started.elapsed() >= Duration::from_secs(3));
	}

	#[tokio::test(start_paused = true)]
	async fn busy_wait_is_bounded() {
		let manager = MockServiceManager::new(true, true).with_busy_polls(u32::MAX);
		let poll = PollPolicy {
			busy_attempts: 5,
			..PollPolicy::default()
		};
		let ctl = TunnelServiceController::new(Arc::new(manager.clone()), UNIT, poll);
		let err = ctl.stop_tunnel().await.unwrap_err();
		assert!(matches!(err, ServiceError::ManagerBusy { attempts: 5 }));
		assert!(!manager.calls().contains(&ServiceCall::Stop));
	}

	#[tokio::test(start_paused = true)]
	async fn failed_mutation_is_reported() {
		let manager = MockServiceManager::new(true, true).failing("stop");
		let err = controller(&manager).stop_tunnel().await.unwrap_err();
		assert!(matches!(err, ServiceError::CommandFailed { action: "stop", .. }));
	}

	#[test]
	fn state_from_flags() {
		assert_eq!(ServiceState::from_flags(true, true), ServiceState::EnabledRunning);
		assert_eq!(ServiceState::from_flags(true, false), ServiceState::EnabledStopped);
		assert_eq!(ServiceState::from_flags(false, false), ServiceState::Disabled);
		assert_eq!(ServiceState::from_flags(false, true), ServiceState::Unknown);
	}

	#[tokio::test]
	async fn systemd_maps_exit_codes() {
		let runner = MockCommandRunner::new()
			.with_output("systemctl is-enabled", CommandOutput::failed(1, ""))
			.with_output("systemctl is-active", CommandOutput::ok(""))
			.with_output("systemctl stop", CommandOutput::failed(5, "Unit not loaded"));
		let systemd = SystemdServiceManager::new(Arc::new(runner.clone()));

		assert!(!systemd.is_enabled(UNIT).await.unwrap());
		assert!(systemd.is_active(UNIT).await.unwrap());
		match systemd.stop(UNIT).await {
			Err(ServiceError::CommandFailed { action, stderr, .. }) => {
				assert_eq!(action, "stop");
				assert_eq!(stderr, "Unit not loaded");
			}
			other => panic!("unexpected: {other:?}"),
		}
		assert!(runner
			.calls()
			.contains(&"systemctl is-enabled --quiet wg-quick@wg0".to_string()));
	}

	#[tokio::test]
	async fn systemd_busy_checks_jobs_then_wg_quick() {
		let runner = MockCommandRunner::new().with_output(
			"systemctl list-jobs",
			CommandOutput::ok("42 wg-quick@wg0.service start running"),
		);
		let systemd = SystemdServiceManager::new(Arc::new(runner));
		assert!(systemd.is_busy(UNIT).await.unwrap());

		let runner = MockCommandRunner::new()
			.with_output("systemctl list-jobs", CommandOutput::ok(""))
			.with_output("pgrep", CommandOutput::ok("1234"));
		let systemd = SystemdServiceManager::new(Arc::new(runner));
		assert!(systemd.is_busy(UNIT).await.unwrap());

		let runner = MockCommandRunner::new()
			.with_output("systemctl list-jobs", CommandOutput::ok(""))
			.with_output("pgrep", CommandOutput::failed(1, ""));
		let systemd = SystemdServiceManager::new(Arc::new(runner));
		assert!(!systemd.is_busy(UNIT).await.unwrap());
	}

	#[tokio::test]
	async fn jobs_for_other_units_are_not_busy() {
		let runner = MockCommandRunner::new()
			.with_output(
				"systemctl list-jobs",
				CommandOutput::ok(
					"17 cloud-final.service start running\n\
					 18 wg-quick@wg1.service start waiting\n",
				),
			)
			.with_output("pgrep", CommandOutput::failed(1, ""));
		let systemd = SystemdServiceManager::new(Arc::new(runner));
		assert!(!systemd.is_busy(UNIT).await.unwrap());

		let runner = MockCommandRunner::new().with_output(
			"systemctl list-jobs",
			CommandOutput::ok(
				"17 cloud-final.service start running\n\
				 19 wg-quick@wg0.service stop waiting\n",
			),
		);
		let systemd = SystemdServiceManager::new(Arc::new(runner));
		assert!(systemd.is_busy(UNIT).await.unwrap());
	}

	#[tokio::test(start_paused = true)]
	async fn first_boot_jobs_do_not_block_stop() {
		let runner = MockCommandRunner::new()
			.with_output(
				"systemctl list-jobs",
				CommandOutput::ok("17 cloud-final.service start running\n"),
			)
			.with_output("systemctl is-enabled", CommandOutput::failed(1, ""))
			.with_output("systemctl is-active", CommandOutput::failed(3, ""))
			.with_output("pgrep", CommandOutput::failed(1, ""));
		let systemd = SystemdServiceManager::new(Arc::new(runner.clone()));
		let ctl = TunnelServiceController::new(Arc::new(systemd), UNIT, PollPolicy::default());

		let started = Instant::now();
		ctl.stop_tunnel().await.unwrap();
		assert_eq!(started.elapsed(), Duration::ZERO);
		assert_eq!(
			runner.calls().iter().filter(|c| c.starts_with("systemctl list-jobs")).count(),
			1
		);
	}

	#[tokio::test]
	async fn missing_systemctl_is_a_command_error() {
		let runner = MockCommandRunner::new().with_missing("systemctl");
		let systemd = SystemdServiceManager::new(Arc::new(runner));
		assert!(matches!(
			systemd.is_active(UNIT).await,
			Err(ServiceError::Command(_))
		));
	}
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Recording mocks for the collaborator traits.

use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::command::{CommandOutput, CommandRunner};
use crate::error::{CommandError, ConnectivityError, ServiceError, StepError};
use crate::oracle::{EgressIdentity, NetworkProbe};
use crate::service::ServiceManager;
use crate::status::{RunStatus, StatusReporter};
use crate::steps::ProvisionStep;

impl CommandOutput {
	pub fn ok(stdout: &str) -> Self {
		Self {
			code: Some(0),
			stdout: stdout.to_string(),
			stderr: String::new(),
		}
	}

	pub fn failed(code: i32, stderr: &str) -> Self {
		Self {
			code: Some(code),
			stdout: String::new(),
			stderr: stderr.to_string(),
		}
	}
}

#[derive(Clone)]
enum Scripted {
	Output(CommandOutput),
	Missing,
}

/// Answers by command-line prefix; anything unscripted succeeds silently.
#[derive(Clone, Default)]
pub struct MockCommandRunner {
	script: Vec<(String, Scripted)>,
	calls: Arc<Mutex<Vec<String>>>,
}

impl MockCommandRunner {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_output(mut self, prefix: &str, output: CommandOutput) -> Self {
		self.script.push((prefix.to_string(), Scripted::Output(output)));
		self
	}

	pub fn with_missing(mut self, program: &str) -> Self {
		self.script.push((program.to_string(), Scripted::Missing));
		self
	}

	pub fn calls(&self) -> Vec<String> {
		self.calls.lock().unwrap().clone()
	}
}

#[async_trait]
impl CommandRunner for MockCommandRunner {
	async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
		let line = std::iter::once(program)
			.chain(args.iter().copied())
			.collect::<Vec<_>>()
			.join(" ");
		self.calls.lock().unwrap().push(line.clone());

		match self.script.iter().find(|(prefix, _)| line.starts_with(prefix.as_str())) {
			Some((_, Scripted::Output(out))) => Ok(out.clone()),
			Some((_, Scripted::Missing)) => Err(CommandError::NotFound {
				program: program.to_string(),
			}),
			None => Ok(CommandOutput::ok("")),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServiceCall {
	IsEnabled,
	IsActive,
	Enable,
	Disable,
	Start,
	Stop,
	IsBusy,
}

struct ServiceModel {
	enabled: bool,
	active: bool,
	/// Target activity and how many more `is_active` queries report the old
	/// value before it applies.
	pending: Option<(bool, u32)>,
	settle_polls: u32,
	stuck: bool,
	busy_polls: u32,
	failing: Option<&'static str>,
}

/// In-memory unit with configurable lag, hangs and failures.
#[derive(Clone)]
pub struct MockServiceManager {
	model: Arc<Mutex<ServiceModel>>,
	calls: Arc<Mutex<Vec<ServiceCall>>>,
}

impl MockServiceManager {
	pub fn new(enabled: bool, active: bool) -> Self {
		Self {
			model: Arc::new(Mutex::new(ServiceModel {
				enabled,
				active,
				pending: None,
				settle_polls: 0,
				stuck: false,
				busy_polls: 0,
				failing: None,
			})),
			calls: Arc::new(Mutex::new(Vec::new())),
		}
	}

	/// Activity changes only after `polls` further `is_active` queries.
	pub fn with_settle_polls(self, polls: u32) -> Self {
		self.model.lock().unwrap().settle_polls = polls;
		self
	}

	/// `start`/`stop` succeed but never change activity.
	pub fn stuck(self) -> Self {
		self.model.lock().unwrap().stuck = true;
		self
	}

	pub fn with_busy_polls(self, polls: u32) -> Self {
		self.model.lock().unwrap().busy_polls = polls;
		self
	}

	pub fn failing(self, action: &'static str) -> Self {
		self.model.lock().unwrap().failing = Some(action);
		self
	}

	pub fn calls(&self) -> Vec<ServiceCall> {
		self.calls.lock().unwrap().clone()
	}

	pub fn count(&self, call: ServiceCall) -> usize {
		self.calls().iter().filter(|c| **c == call).count()
	}

	pub fn clear_calls(&self) {
		self.calls.lock().unwrap().clear();
	}

	pub fn is_up(&self) -> bool {
		let model = self.model.lock().unwrap();
		model.enabled && model.active
	}

	fn record(&self, call: ServiceCall) {
		self.calls.lock().unwrap().push(call);
	}

	fn check(&self, action: &'static str, unit: &str) -> Result<(), ServiceError> {
		if self.model.lock().unwrap().failing == Some(action) {
			return Err(ServiceError::CommandFailed {
				action,
				unit: unit.to_string(),
				stderr: "mock failure".to_string(),
			});
		}
		Ok(())
	}

	fn transition(&self, active: bool) {
		let mut model = self.model.lock().unwrap();
		if model.stuck {
			return;
		}
		if model.settle_polls == 0 {
			model.active = active;
		} else {
			model.pending = Some((active, model.settle_polls));
		}
	}
}

#[async_trait]
impl ServiceManager for MockServiceManager {
	async fn is_enabled(&self, _unit: &str) -> Result<bool, ServiceError> {
		self.record(ServiceCall::IsEnabled);
		Ok(self.model.lock().unwrap().enabled)
	}

	async fn is_active(&self, _unit: &str) -> Result<bool, ServiceError> {
		self.record(ServiceCall::IsActive);
		let mut model = self.model.lock().unwrap();
		match model.pending {
			Some((target, 0)) => {
				model.active = target;
				model.pending = None;
			}
			Some((target, remaining)) => model.pending = Some((target, remaining - 1)),
			None => {}
		}
		Ok(model.active)
	}

	async fn enable(&self, unit: &str) -> Result<(), ServiceError> {
		self.record(ServiceCall::Enable);
		self.check("enable", unit)?;
		self.model.lock().unwrap().enabled = true;
		Ok(())
	}

	async fn disable(&self, unit: &str) -> Result<(), ServiceError> {
		self.record(ServiceCall::Disable);
		self.check("disable", unit)?;
		self.model.lock().unwrap().enabled = false;
		Ok(())
	}

	async fn start(&self, unit: &str) -> Result<(), ServiceError> {
		self.record(ServiceCall::Start);
		self.check("start", unit)?;
		self.transition(true);
		Ok(())
	}

	async fn stop(&self, unit: &str) -> Result<(), ServiceError> {
		self.record(ServiceCall::Stop);
		self.check("stop", unit)?;
		self.transition(false);
		Ok(())
	}

	async fn is_busy(&self, _unit: &str) -> Result<bool, ServiceError> {
		self.record(ServiceCall::IsBusy);
		let mut model = self.model.lock().unwrap();
		if model.busy_polls > 0 {
			model.busy_polls -= 1;
			return Ok(true);
		}
		Ok(false)
	}
}

/// Scripted oracle: each `observe` pops the next queued answer.
#[derive(Clone, Default)]
pub struct MockProbe {
	observations: Arc<Mutex<VecDeque<Result<EgressIdentity, ConnectivityError>>>>,
	dns_fails: bool,
	resolved: Arc<Mutex<Vec<String>>>,
}

impl MockProbe {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn then_observe(self, ip: &str, country: &str) -> Self {
		let identity = EgressIdentity {
			ip: ip.parse::<IpAddr>().unwrap(),
			country: country.to_string(),
		};
		self.observations.lock().unwrap().push_back(Ok(identity));
		self
	}

	pub fn then_fail(self, err: ConnectivityError) -> Self {
		self.observations.lock().unwrap().push_back(Err(err));
		self
	}

	pub fn failing_dns(mut self) -> Self {
		self.dns_fails = true;
		self
	}

	pub fn resolved(&self) -> Vec<String> {
		self.resolved.lock().unwrap().clone()
	}
}

#[async_trait]
impl NetworkProbe for MockProbe {
	async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ConnectivityError> {
		self.resolved.lock().unwrap().push(host.to_string());
		if self.dns_fails {
			return Err(ConnectivityError::Dns {
				host: host.to_string(),
				source: std::io::Error::new(std::io::ErrorKind::Other, "no route to resolver"),
			});
		}
		Ok(vec!["198.51.100.1".parse().unwrap()])
	}

	async fn observe(&self) -> Result<EgressIdentity, ConnectivityError> {
		self.observations
			.lock()
			.unwrap()
			.pop_front()
			.unwrap_or_else(|| Err(ConnectivityError::InvalidResponse("no scripted answer".into())))
	}
}

#[derive(Clone, Default)]
pub struct RecordingReporter {
	reports: Arc<Mutex<Vec<(RunStatus, Option<String>)>>>,
}

impl RecordingReporter {
	pub fn reports(&self) -> Vec<(RunStatus, Option<String>)> {
		self.reports.lock().unwrap().clone()
	}
}

#[async_trait]
impl StatusReporter for RecordingReporter {
	async fn report(&self, status: RunStatus, message: Option<&str>) {
		self.reports
			.lock()
			.unwrap()
			.push((status, message.map(str::to_string)));
	}
}

#[derive(Clone, Copy, Debug)]
pub enum StepBehaviour {
	Succeed,
	Fail,
	Panic,
}

/// Step that counts its runs and then does as told.
#[derive(Clone)]
pub struct ScriptedStep {
	name: String,
	behaviour: StepBehaviour,
	runs: Arc<AtomicUsize>,
}

impl ScriptedStep {
	pub fn new(name: &str, behaviour: StepBehaviour) -> Self {
		Self {
			name: name.to_string(),
			behaviour,
			runs: Arc::new(AtomicUsize::new(0)),
		}
	}

	pub fn runs(&self) -> usize {
		self.runs.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl ProvisionStep for ScriptedStep {
	fn name(&self) -> &str {
		&self.name
	}

	async fn run(&self) -> Result<(), StepError> {
		self.runs.fetch_add(1, Ordering::SeqCst);
		match self.behaviour {
			StepBehaviour::Succeed => Ok(()),
			StepBehaviour::Fail => Err(StepError::Failed {
				name: self.name.clone(),
				code: "1".to_string(),
				stderr: "scripted failure".to_string(),
			}),
			StepBehaviour::Panic => panic!("scripted panic in {}", self.name),
		}
	}
}

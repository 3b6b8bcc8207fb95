// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod check;
pub mod markers;
pub mod provision;
pub mod render;
pub mod tunnel;

use std::sync::Arc;

use burrow_config::ProvisionConfig;
use burrow_provision::{
	CommandRunner, PollPolicy, SystemCommandRunner, SystemdServiceManager, TunnelServiceController,
};

pub use markers::MarkerCommands;
pub use tunnel::TunnelCommands;

pub fn system_runner() -> Arc<dyn CommandRunner> {
	Arc::new(SystemCommandRunner::new())
}

pub fn controller(cfg: &ProvisionConfig, runner: Arc<dyn CommandRunner>) -> TunnelServiceController {
	TunnelServiceController::new(
		Arc::new(SystemdServiceManager::new(runner)),
		cfg.service.unit(),
		PollPolicy::from(&cfg.service),
	)
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tunnel lifecycle and the provisioning state machine.
//!
//! Every host interaction goes through a trait seam ([`CommandRunner`],
//! [`ServiceManager`], [`NetworkProbe`], [`StatusReporter`],
//! [`ProvisionStep`]) so the orchestrator can be driven by mocks in tests.

pub mod command;
pub mod error;
pub mod lock;
pub mod markers;
pub mod notice;
pub mod oracle;
pub mod orchestrator;
pub mod precondition;
pub mod routing;
pub mod service;
pub mod status;
pub mod steps;
pub mod verify;

#[cfg(test)]
mod testing;

pub use command::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use error::{
	CommandError, ConnectivityError, DetectError, LockError, MarkerError, ProvisionError, Result,
	ServiceError, StepError, VerificationError,
};
pub use lock::RunLock;
pub use markers::{Marker, RunMarkers, RunOutcome};
pub use notice::LoginNotice;
pub use oracle::{EgressIdentity, HttpOracle, NetworkProbe};
pub use orchestrator::{ProvisionPlan, Provisioner, RunReport, RunState};
pub use precondition::check_direct_connectivity;
pub use routing::detect_routing;
pub use service::{
	PollPolicy, ServiceManager, ServiceState, SystemdServiceManager, TunnelServiceController,
};
pub use status::{HttpStatusReporter, NoopStatusReporter, RunStatus, StatusReporter};
pub use steps::{CommandStep, ProvisionStep};
pub use verify::verify_tunneled;

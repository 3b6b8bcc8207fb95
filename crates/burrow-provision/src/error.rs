// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::IpAddr;
use std::path::PathBuf;

use burrow_common_http::{is_retryable_status, InsecureUrl, RetryableError};
use burrow_wg::{ConfigRenderError, ConfigWriteError, RoutingError, TableRegistryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
	#[error("{program} is not installed or not in PATH")]
	NotFound { program: String },

	#[error("failed to run {program}: {source}")]
	Io {
		program: String,
		#[source]
		source: std::io::Error,
	},
}

#[derive(Debug, Error)]
pub enum ConnectivityError {
	#[error("cannot resolve {host}: {source}")]
	Dns {
		host: String,
		#[source]
		source: std::io::Error,
	},

	#[error("oracle request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("oracle returned HTTP {status}")]
	OracleStatus { status: reqwest::StatusCode },

	#[error("oracle response is unusable: {0}")]
	InvalidResponse(String),

	#[error(
		"host is not directly connected: expected {expected_ip} ({expected_country}), \
		 observed {observed_ip} ({observed_country})"
	)]
	NotDirect {
		expected_ip: IpAddr,
		observed_ip: IpAddr,
		expected_country: String,
		observed_country: String,
	},

	#[error(transparent)]
	InsecureUrl(#[from] InsecureUrl),
}

impl RetryableError for ConnectivityError {
	fn is_retryable(&self) -> bool {
		match self {
			Self::Http(e) => e.is_retryable(),
			Self::OracleStatus { status } => is_retryable_status(*status),
			_ => false,
		}
	}
}

#[derive(Debug, Error)]
pub enum ServiceError {
	#[error(transparent)]
	Command(#[from] CommandError),

	#[error("systemctl {action} {unit} failed: {stderr}")]
	CommandFailed {
		action: &'static str,
		unit: String,
		stderr: String,
	},

	#[error("{unit} still active after {attempts} checks")]
	StopTimeout { unit: String, attempts: u32 },

	#[error("{unit} not active after {attempts} checks")]
	StartTimeout { unit: String, attempts: u32 },

	#[error("service manager still busy after {attempts} checks")]
	ManagerBusy { attempts: u32 },
}

#[derive(Debug, Error)]
pub enum VerificationError {
	#[error("egress check failed: {0}")]
	Oracle(#[from] ConnectivityError),

	#[error("traffic still leaves directly from {ip}; the tunnel is not carrying egress")]
	StillDirect { ip: IpAddr },

	#[error("egress is still in {country}; the tunnel exits in the host's own region")]
	SameRegion { country: String },
}

#[derive(Debug, Error)]
pub enum DetectError {
	#[error(transparent)]
	Command(#[from] CommandError),

	#[error("ip route failed: {stderr}")]
	Failed { stderr: String },

	#[error(transparent)]
	Parse(#[from] RoutingError),
}

#[derive(Debug, Error)]
pub enum StepError {
	#[error(transparent)]
	Command(#[from] CommandError),

	#[error("step {name} exited with {code}: {stderr}")]
	Failed {
		name: String,
		code: String,
		stderr: String,
	},
}

#[derive(Debug, Error)]
pub enum MarkerError {
	#[error("marker {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

#[derive(Debug, Error)]
pub enum LockError {
	#[error("another provisioning run holds {path}")]
	AlreadyHeld { path: PathBuf },

	#[error("lock {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

#[derive(Debug, Error)]
pub enum ProvisionError {
	#[error(transparent)]
	Connectivity(#[from] ConnectivityError),

	#[error(transparent)]
	Service(#[from] ServiceError),

	#[error(transparent)]
	Routing(#[from] DetectError),

	#[error(transparent)]
	TableRegistry(#[from] TableRegistryError),

	#[error(transparent)]
	Render(#[from] ConfigRenderError),

	#[error(transparent)]
	Write(#[from] ConfigWriteError),

	#[error(transparent)]
	Step(#[from] StepError),

	#[error(transparent)]
	Verification(#[from] VerificationError),

	#[error(transparent)]
	Marker(#[from] MarkerError),

	#[error(transparent)]
	Lock(#[from] LockError),

	#[error("provisioning panicked: {0}")]
	Panicked(String),
}

pub type Result<T> = std::result::Result<T, ProvisionError>;

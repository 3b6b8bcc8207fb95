// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for burrow provisioning runs.
//!
//! Layers, lowest precedence first:
//! - built-in defaults
//! - `/etc/burrow/config.toml`
//! - the file passed with `--config` / `BURROW_CONFIG`
//! - `BURROW_*` environment variables (secrets also as `*_FILE`)
//! - command-line flags
//!
//! The merged result is parsed into typed values and validated for the
//! command being run.

pub mod defaults;
pub mod env;
pub mod error;
pub mod layer;
pub mod registry;
pub mod runtime;
pub mod sources;
pub mod validation;

use std::path::PathBuf;

pub use env::{load_secret_env, SecretEnvError};
pub use error::ConfigError;
pub use layer::ConfigLayer;
pub use registry::ConfigRegistry;
pub use runtime::{
	OracleSettings, ProvisionConfig, RunSettings, ServiceSettings, StatusSettings, StepSettings,
};
pub use sources::{CliOverrides, ConfigSource, Precedence};
pub use validation::{validate_config, ValidationScope};

/// Load configuration from every source with the standard precedence.
pub fn load_config(
	config_file: Option<PathBuf>,
	cli: CliOverrides,
	scope: ValidationScope,
) -> Result<ProvisionConfig, ConfigError> {
	let mut registry = ConfigRegistry::new();

	registry.register(Box::new(sources::DefaultsSource));
	registry.register(Box::new(sources::FileSource::system()));
	if let Some(path) = config_file {
		registry.register(Box::new(sources::FileSource::explicit(path)));
	}
	registry.register(Box::new(sources::EnvSource::from_process()));
	registry.register(Box::new(sources::CliSource::new(cli)));

	registry.load(scope)
}

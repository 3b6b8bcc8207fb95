// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: files, environment, CLI, defaults.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, trace};

use crate::defaults::SYSTEM_CONFIG_FILE;
use crate::env::load_secret_with;
use crate::layer::*;
use crate::ConfigError;

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	SystemFile = 20,
	ExplicitFile = 30,
	Environment = 50,
	Cli = 60,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	/// Name for logging
	fn name(&self) -> &'static str;

	fn precedence(&self) -> Precedence;

	fn load(&self) -> Result<ConfigLayer, ConfigError>;
}

/// Built-in defaults source. Defaults are applied during finalization, so
/// this contributes an empty layer.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ConfigLayer::default())
	}
}

/// File-based configuration source (TOML).
pub struct FileSource {
	path: PathBuf,
	precedence: Precedence,
	name: &'static str,
	required: bool,
}

impl FileSource {
	/// System config: /etc/burrow/config.toml. Optional.
	pub fn system() -> Self {
		Self {
			path: PathBuf::from(SYSTEM_CONFIG_FILE),
			precedence: Precedence::SystemFile,
			name: "system-config",
			required: false,
		}
	}

	/// File named on the command line or in `BURROW_CONFIG`. Must exist.
	pub fn explicit(path: PathBuf) -> Self {
		Self {
			path,
			precedence: Precedence::ExplicitFile,
			name: "explicit-config",
			required: true,
		}
	}

	/// Custom file path with specified precedence
	pub fn custom(path: PathBuf, precedence: Precedence, name: &'static str) -> Self {
		Self {
			path,
			precedence,
			name,
			required: false,
		}
	}
}

impl ConfigSource for FileSource {
	fn name(&self) -> &'static str {
		self.name
	}
	fn precedence(&self) -> Precedence {
		self.precedence
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		if !self.required && !self.path.exists() {
			debug!(path = %self.path.display(), source = self.name, "config file not found, skipping");
			return Ok(ConfigLayer::default());
		}

		debug!(path = %self.path.display(), source = self.name, "loading config file");

		let content = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
			path: self.path.clone(),
			source,
		})?;
		let layer: ConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!(source = self.name, "parsed config layer");
		Ok(layer)
	}
}

/// `BURROW_*` environment variables. List values are comma separated.
pub struct EnvSource {
	vars: HashMap<String, String>,
}

impl EnvSource {
	/// Snapshot of the process environment.
	pub fn from_process() -> Self {
		Self::from_vars(std::env::vars())
	}

	pub fn from_vars<I, K, V>(vars: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			vars: vars
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		}
	}

	fn get(&self, key: &str) -> Option<String> {
		self.vars
			.get(key)
			.map(|v| v.trim().to_string())
			.filter(|v| !v.is_empty())
	}
}

fn split_list(value: &str) -> Vec<String> {
	value
		.split(',')
		.map(str::trim)
		.filter(|v| !v.is_empty())
		.map(str::to_string)
		.collect()
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
	value
		.parse()
		.map_err(|_| ConfigError::invalid_value(key, format!("{value:?} is not a valid number")))
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading environment variables");
		let mut layer = ConfigLayer::default();
		let lookup = |name: &str| self.vars.get(name).cloned();

		if let Some(secret) = load_secret_with("BURROW_WG_PRIVATE_KEY", lookup)? {
			trace!("loaded WireGuard private key from environment");
			layer
				.interface
				.get_or_insert_with(InterfaceLayer::default)
				.private_key = Some(secret);
		}
		if let Some(secret) = load_secret_with("BURROW_STATUS_TOKEN", lookup)? {
			trace!("loaded status token from environment");
			layer.status.get_or_insert_with(StatusLayer::default).token = Some(secret);
		}

		let mut keys: Vec<&String> = self.vars.keys().filter(|k| k.starts_with("BURROW_")).collect();
		keys.sort();
		for key in keys {
			let Some(value) = self.get(key) else {
				continue;
			};
			trace!(key = %key, "processing env var");

			match key.as_str() {
				"BURROW_WG_ADDRESSES" => {
					layer.interface.get_or_insert_with(InterfaceLayer::default).addresses =
						Some(split_list(&value));
				}
				"BURROW_WG_DNS" => {
					layer.interface.get_or_insert_with(InterfaceLayer::default).dns =
						Some(split_list(&value));
				}
				"BURROW_WG_MTU" => {
					layer.interface.get_or_insert_with(InterfaceLayer::default).mtu =
						Some(parse_number(key, &value)?);
				}
				"BURROW_WG_INTERFACE" => {
					layer.interface.get_or_insert_with(InterfaceLayer::default).name = Some(value);
				}
				"BURROW_PEER_PUBLIC_KEY" => {
					layer.peer.get_or_insert_with(PeerLayer::default).public_key = Some(value);
				}
				"BURROW_PEER_ENDPOINT" => {
					layer.peer.get_or_insert_with(PeerLayer::default).endpoint = Some(value);
				}
				"BURROW_EXPECTED_IP" => {
					layer.oracle.get_or_insert_with(OracleLayer::default).expected_ip = Some(value);
				}
				"BURROW_EXPECTED_COUNTRY" => {
					layer.oracle.get_or_insert_with(OracleLayer::default).expected_country =
						Some(value);
				}
				"BURROW_ORACLE_URL" => {
					layer.oracle.get_or_insert_with(OracleLayer::default).url = Some(value);
				}
				"BURROW_STATUS_URL" => {
					layer.status.get_or_insert_with(StatusLayer::default).url = Some(value);
				}
				"BURROW_HOST_NAME" => {
					layer.status.get_or_insert_with(StatusLayer::default).host = Some(value);
				}
				"BURROW_MARKER_DIR" => {
					layer.run.get_or_insert_with(RunLayer::default).marker_dir =
						Some(PathBuf::from(value));
				}
				"BURROW_LOG_FILE" => {
					layer.run.get_or_insert_with(RunLayer::default).log_file =
						Some(PathBuf::from(value));
				}
				_ => {}
			}
		}

		Ok(layer)
	}
}

/// Values given as command-line flags.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
	pub interface: Option<String>,
	pub expected_ip: Option<String>,
	pub expected_country: Option<String>,
	pub oracle_url: Option<String>,
	pub marker_dir: Option<PathBuf>,
	pub lock_file: Option<PathBuf>,
	pub log_file: Option<PathBuf>,
}

pub struct CliSource {
	overrides: CliOverrides,
}

impl CliSource {
	pub fn new(overrides: CliOverrides) -> Self {
		Self { overrides }
	}
}

impl ConfigSource for CliSource {
	fn name(&self) -> &'static str {
		"cli"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Cli
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading CLI overrides");
		let cli = self.overrides.clone();
		let mut layer = ConfigLayer::default();

		if cli.interface.is_some() {
			layer.interface = Some(InterfaceLayer {
				name: cli.interface,
				..Default::default()
			});
		}
		if cli.expected_ip.is_some() || cli.expected_country.is_some() || cli.oracle_url.is_some() {
			layer.oracle = Some(OracleLayer {
				url: cli.oracle_url,
				expected_ip: cli.expected_ip,
				expected_country: cli.expected_country,
				..Default::default()
			});
		}
		if cli.marker_dir.is_some() || cli.lock_file.is_some() || cli.log_file.is_some() {
			layer.run = Some(RunLayer {
				marker_dir: cli.marker_dir,
				lock_file: cli.lock_file,
				log_file: cli.log_file,
				..Default::default()
			});
		}

		Ok(layer)
	}
}

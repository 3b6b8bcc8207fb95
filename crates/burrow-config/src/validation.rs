// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration validation rules.

use burrow_common_http::require_https;
use burrow_wg::{check_key, is_safe_name, MAX_INTERFACE_NAME_LEN};
use tracing::warn;

use crate::runtime::ProvisionConfig;
use crate::ConfigError;

/// How much of the configuration a command needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationScope {
	/// Local service and marker operations: structural limits only.
	Local,
	/// Oracle checks: also the host's expected direct identity.
	Identity,
	/// Rendering the tunnel config: also the interface and peer.
	Tunnel,
	/// A full provisioning run: everything.
	Provision,
}

impl ValidationScope {
	fn needs_identity(self) -> bool {
		matches!(self, Self::Identity | Self::Provision)
	}

	fn needs_tunnel(self) -> bool {
		matches!(self, Self::Tunnel | Self::Provision)
	}
}

/// Validate the configuration for the given scope.
pub fn validate_config(config: &ProvisionConfig, scope: ValidationScope) -> Result<(), ConfigError> {
	validate_limits(config)?;
	validate_urls(config)?;
	validate_steps(config)?;

	if scope.needs_identity() {
		validate_identity(config)?;
	}
	if scope.needs_tunnel() {
		validate_tunnel(config)?;
	}

	Ok(())
}

fn validate_limits(config: &ProvisionConfig) -> Result<(), ConfigError> {
	if config.service.poll_attempts == 0 {
		return Err(ConfigError::invalid_value(
			"service.poll_attempts",
			"must be at least 1",
		));
	}
	let interface = &config.service.interface;
	if !is_safe_name(interface) {
		return Err(ConfigError::invalid_value(
			"interface.name",
			format!("{interface:?} may only contain letters, digits, '_', '.' and '-'"),
		));
	}
	if interface.len() > MAX_INTERFACE_NAME_LEN {
		return Err(ConfigError::invalid_value(
			"interface.name",
			format!("{interface:?} is longer than {MAX_INTERFACE_NAME_LEN} characters"),
		));
	}

	let routing = &config.tunnel.routing;
	if routing.fwmark == 0 {
		return Err(ConfigError::invalid_value("routing.fwmark", "must be at least 1"));
	}
	// 253-255 are the kernel's default, main and local tables.
	if !(1..=252).contains(&routing.table_id) {
		return Err(ConfigError::invalid_value(
			"routing.table_id",
			format!("{} is outside 1..=252", routing.table_id),
		));
	}
	if !is_safe_name(&routing.table_name) {
		return Err(ConfigError::invalid_value(
			"routing.table_name",
			format!(
				"{:?} may only contain letters, digits, '_', '.' and '-'",
				routing.table_name
			),
		));
	}
	if config.tunnel.mtu < 576 {
		warn!(mtu = config.tunnel.mtu, "MTU below 576 will break most IPv4 paths");
	}
	Ok(())
}

fn validate_urls(config: &ProvisionConfig) -> Result<(), ConfigError> {
	require_https(&config.oracle.url)
		.map_err(|e| ConfigError::invalid_value("oracle.url", e.to_string()))?;
	if let Some(status) = &config.status {
		require_https(&status.url)
			.map_err(|e| ConfigError::invalid_value("status.url", e.to_string()))?;
	}
	Ok(())
}

fn validate_steps(config: &ProvisionConfig) -> Result<(), ConfigError> {
	for (i, step) in config.steps.iter().enumerate() {
		if step.name.trim().is_empty() {
			return Err(ConfigError::invalid_value(
				format!("steps[{i}].name"),
				"cannot be empty",
			));
		}
		if step.command.first().map_or(true, |p| p.trim().is_empty()) {
			return Err(ConfigError::invalid_value(
				format!("steps[{i}].command"),
				format!("step {:?} has no program", step.name),
			));
		}
	}
	Ok(())
}

fn validate_identity(config: &ProvisionConfig) -> Result<(), ConfigError> {
	if config.oracle.expected_ip.is_none() {
		return Err(ConfigError::missing_field("oracle.expected_ip"));
	}
	if config.oracle.expected_country.is_none() {
		return Err(ConfigError::missing_field("oracle.expected_country"));
	}
	Ok(())
}

fn validate_tunnel(config: &ProvisionConfig) -> Result<(), ConfigError> {
	let tunnel = &config.tunnel;
	if tunnel.private_key.is_blank() {
		return Err(ConfigError::missing_field("interface.private_key"));
	}
	if tunnel.local_addresses.is_empty() {
		return Err(ConfigError::missing_field("interface.addresses"));
	}
	if tunnel.peer_public_key.is_empty() {
		return Err(ConfigError::missing_field("peer.public_key"));
	}
	if tunnel.peer_endpoint.is_none() {
		return Err(ConfigError::missing_field("peer.endpoint"));
	}
	check_key(tunnel.private_key.expose())
		.map_err(|e| ConfigError::invalid_value("interface.private_key", e.to_string()))?;
	check_key(&tunnel.peer_public_key)
		.map_err(|e| ConfigError::invalid_value("peer.public_key", e.to_string()))?;
	Ok(())
}

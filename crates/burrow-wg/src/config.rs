// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::endpoint::Endpoint;
use burrow_common_secret::SecretString;
use ipnet::IpNet;
use std::net::IpAddr;

/// Small enough to survive WireGuard encapsulation over most paths.
pub const DEFAULT_MTU: u16 = 1280;

pub const DEFAULT_KEEPALIVE_SECS: u16 = 25;

/// Kernel limit on interface names, excluding the NUL.
pub const MAX_INTERFACE_NAME_LEN: usize = 15;

/// True when `name` is non-empty and only uses `[A-Za-z0-9_.-]`. Table and
/// interface names end up in shell hook lines, so nothing else is allowed.
pub fn is_safe_name(name: &str) -> bool {
	!name.is_empty()
		&& name
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Parameters of the SSH carve-out: outbound TCP from `ssh_port` is marked
/// with `fwmark` and routed through `table_name` (id `table_id`), which keeps
/// the pre-tunnel default route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingPolicy {
	pub table_id: u32,
	pub table_name: String,
	pub fwmark: u32,
	pub ssh_port: u16,
}

impl Default for RoutingPolicy {
	fn default() -> Self {
		Self {
			table_id: 2,
			table_name: "ssh".to_string(),
			fwmark: 2,
			ssh_port: 22,
		}
	}
}

/// Everything needed to render `wg0.conf` apart from the live routing
/// snapshot. Built fresh on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelConfig {
	pub private_key: SecretString,
	pub local_addresses: Vec<IpNet>,
	pub dns_servers: Vec<IpAddr>,
	pub peer_public_key: String,
	pub peer_endpoint: Option<Endpoint>,
	pub mtu: u16,
	pub keepalive_seconds: u16,
	pub routing: RoutingPolicy,
}

impl TunnelConfig {
	pub fn new(private_key: SecretString, peer_public_key: impl Into<String>) -> Self {
		Self {
			private_key,
			local_addresses: Vec::new(),
			dns_servers: Vec::new(),
			peer_public_key: peer_public_key.into(),
			peer_endpoint: None,
			mtu: DEFAULT_MTU,
			keepalive_seconds: DEFAULT_KEEPALIVE_SECS,
			routing: RoutingPolicy::default(),
		}
	}

	pub fn with_address(mut self, address: IpNet) -> Self {
		self.local_addresses.push(address);
		self
	}

	pub fn with_dns(mut self, server: IpAddr) -> Self {
		self.dns_servers.push(server);
		self
	}

	pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
		self.peer_endpoint = Some(endpoint);
		self
	}

	pub fn with_routing(mut self, routing: RoutingPolicy) -> Self {
		self.routing = routing;
		self
	}
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::RoutingError;
use std::net::IpAddr;

/// The host's pre-tunnel default route. Recomputed on every run, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingSnapshot {
	pub default_gateway: IpAddr,
	pub egress_interface: String,
}

impl RoutingSnapshot {
	pub fn new(default_gateway: IpAddr, egress_interface: impl Into<String>) -> Self {
		Self {
			default_gateway,
			egress_interface: egress_interface.into(),
		}
	}

	/// Parses `ip route show default` output. Routes without a gateway
	/// (`default dev wg0 ...`) are skipped; among the rest the lowest metric
	/// wins, with a missing metric counting as 0.
	pub fn from_route_output(output: &str) -> Result<Self, RoutingError> {
		let mut best: Option<(u32, RoutingSnapshot)> = None;

		for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
			let mut tokens = line.split_whitespace();
			if tokens.next() != Some("default") {
				continue;
			}

			let mut gateway = None;
			let mut device = None;
			let mut metric = 0u32;
			let rest: Vec<&str> = tokens.collect();
			let mut i = 0;
			while i < rest.len() {
				let value = rest.get(i + 1).copied();
				match rest[i] {
					"via" => {
						let raw = value.ok_or_else(|| RoutingError::Malformed(line.to_string()))?;
						gateway = Some(
							raw.parse::<IpAddr>()
								.map_err(|_| RoutingError::Malformed(line.to_string()))?,
						);
						i += 2;
					}
					"dev" => {
						device = Some(
							value
								.ok_or_else(|| RoutingError::Malformed(line.to_string()))?
								.to_string(),
						);
						i += 2;
					}
					"metric" => {
						metric = value
							.and_then(|v| v.parse().ok())
							.ok_or_else(|| RoutingError::Malformed(line.to_string()))?;
						i += 2;
					}
					_ => i += 1,
				}
			}

			let (Some(gateway), Some(device)) = (gateway, device) else {
				continue;
			};
			if best.as_ref().map_or(true, |(m, _)| metric < *m) {
				best = Some((metric, RoutingSnapshot::new(gateway, device)));
			}
		}

		best.map(|(_, s)| s).ok_or(RoutingError::NoDefaultRoute)
	}
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use burrow_wg::{RoutingError, RoutingSnapshot};
use tracing::{debug, instrument};

use crate::command::CommandRunner;
use crate::error::DetectError;

/// Reads the host's default route from the main table. Run while the tunnel
/// is down so the snapshot is the direct path. IPv4 first, IPv6 as fallback.
#[instrument(skip(runner))]
pub async fn detect_routing(runner: &dyn CommandRunner) -> Result<RoutingSnapshot, DetectError> {
	let mut last = RoutingError::NoDefaultRoute;
	for family in ["-4", "-6"] {
		let out = runner.run("ip", &[family, "route", "show", "default"]).await?;
		if !out.success() {
			return Err(DetectError::Failed { stderr: out.stderr });
		}
		match RoutingSnapshot::from_route_output(&out.stdout) {
			Ok(snapshot) => {
				debug!(
					gateway = %snapshot.default_gateway,
					interface = %snapshot.egress_interface,
					"detected default route"
				);
				return Ok(snapshot);
			}
			Err(RoutingError::NoDefaultRoute) => continue,
			Err(e) => last = e,
		}
	}
	Err(last.into())
}

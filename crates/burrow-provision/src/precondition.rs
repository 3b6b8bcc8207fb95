// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::IpAddr;

use tracing::{info, instrument};

use crate::error::ConnectivityError;
use crate::oracle::NetworkProbe;

/// Confirms the host reaches the internet directly with its own public
/// identity. Must pass before the tunnel is touched: if the host is already
/// tunneled or unreachable, changing routes could strand it.
#[instrument(skip(probe))]
pub async fn check_direct_connectivity(
	probe: &dyn NetworkProbe,
	probe_host: &str,
	expected_ip: IpAddr,
	expected_country: &str,
) -> Result<(), ConnectivityError> {
	probe.resolve(probe_host).await?;

	let observed = probe.observe().await?;
	if observed.ip != expected_ip || !observed.in_country(expected_country) {
		return Err(ConnectivityError::NotDirect {
			expected_ip,
			observed_ip: observed.ip,
			expected_country: expected_country.to_string(),
			observed_country: observed.country,
		});
	}

	info!(observed_ip = %observed.ip, observed_country = %observed.country, "direct connectivity confirmed");
	Ok(())
}
